//! Normalized animatable values
//!
//! Every quantity the engine interpolates is stored as an integer scaled by
//! [`VALUE_SCALE`]. Units and the origin kind ride along untouched and only
//! matter when a value is committed back to a target.

use std::fmt;

/// Fixed decimal scaling applied to all numeric work (five decimal places)
pub const VALUE_SCALE: i64 = 100_000;

/// Whether a value was declared as a bare number or as a unit string
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OriginType {
    #[default]
    Number,
    String,
}

/// The atomic representation of an animatable quantity
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Value {
    /// Scaled number (`real * VALUE_SCALE`)
    pub number: i64,
    /// Unit suffix, e.g. `px` or `deg`
    pub unit: Option<String>,
    /// How the value was originally declared
    pub origin: OriginType,
}

impl Value {
    /// Create a unitless value from a real number
    pub fn from_f64(number: f64) -> Self {
        Self {
            number: scale(number),
            unit: None,
            origin: OriginType::Number,
        }
    }

    /// Create a value carrying a unit (origin is a unit string)
    pub fn with_unit(number: f64, unit: impl Into<String>) -> Self {
        Self {
            number: scale(number),
            unit: Some(unit.into()),
            origin: OriginType::String,
        }
    }

    /// Create a value from an already-scaled number
    pub fn from_scaled(number: i64, unit: Option<String>, origin: OriginType) -> Self {
        Self {
            number,
            unit,
            origin,
        }
    }

    /// Scale the number back down to a real value
    ///
    /// Call this at the write boundary only.
    pub fn to_f64(&self) -> f64 {
        unscale(self.number)
    }

    /// Builder: replace the unit
    pub fn unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit;
        self
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}{}", self.to_f64(), unit),
            None => write!(f, "{}", self.to_f64()),
        }
    }
}

/// Scale a real number into the integer domain
#[inline]
pub fn scale(number: f64) -> i64 {
    (number * VALUE_SCALE as f64).round() as i64
}

/// Scale an integer-domain number back to a real number
#[inline]
pub fn unscale(number: i64) -> f64 {
    number as f64 / VALUE_SCALE as f64
}
