//! Animatable inputs and value normalization
//!
//! User-facing inputs ([`RawValue`], [`Param`]) are converted into the
//! integer-scaled [`Value`] shape before any arithmetic happens.

use cadence_core::value::scale;
use cadence_core::{OriginType, Value};
use regex::Regex;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// A value as declared by the user
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    /// A bare number; takes the unit of the other endpoint, if any
    Number(f64),
    /// A number with a unit suffix, e.g. `"120px"` or `"-45deg"`
    Text(String),
    /// An already-normalized value
    Value(Value),
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<f32> for RawValue {
    fn from(n: f32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<Value> for RawValue {
    fn from(v: Value) -> Self {
        RawValue::Value(v)
    }
}

fn numeric_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(.*?)\s*$")
            .expect("numeric prefix pattern is valid")
    })
}

/// Normalize a raw input into a scaled [`Value`]
///
/// `fallback_unit` is the unit of the opposite endpoint; bare numbers adopt
/// it. Text without a numeric prefix normalizes to `None`.
pub fn normalize(raw: &RawValue, fallback_unit: Option<&str>) -> Option<Value> {
    match raw {
        RawValue::Number(n) => Some(Value::from_scaled(
            scale(*n),
            fallback_unit.map(str::to_string),
            OriginType::Number,
        )),
        RawValue::Text(text) => {
            let caps = numeric_prefix().captures(text)?;
            let number: f64 = caps[1].parse().ok()?;
            let unit = match &caps[2] {
                "" => fallback_unit.map(str::to_string),
                unit => Some(unit.to_string()),
            };
            Some(Value::from_scaled(scale(number), unit, OriginType::String))
        }
        RawValue::Value(value) => Some(value.clone()),
    }
}

/// Resolver signature: `(target, target_index, target_count) -> V`
pub type Resolver<V, T> = Rc<dyn Fn(&T, usize, usize) -> V>;

/// A definition field that is either a literal or computed per target
pub enum Param<V, T> {
    Literal(V),
    Resolver(Resolver<V, T>),
}

impl<V: Clone, T> Param<V, T> {
    /// Wrap a resolver function
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&T, usize, usize) -> V + 'static,
    {
        Param::Resolver(Rc::new(f))
    }

    /// Produce the value for one target
    ///
    /// Callers memoize the result; a resolver is invoked once per tween.
    pub fn resolve(&self, target: &T, index: usize, count: usize) -> V {
        match self {
            Param::Literal(v) => v.clone(),
            Param::Resolver(f) => f(target, index, count),
        }
    }
}

impl<T> Param<f64, T> {
    /// A delay that grows by `step_ms` with each target index
    pub fn stagger(step_ms: f64) -> Self {
        Param::Resolver(Rc::new(move |_, index, _| index as f64 * step_ms))
    }
}

impl<V: Clone, T> Clone for Param<V, T> {
    fn clone(&self) -> Self {
        match self {
            Param::Literal(v) => Param::Literal(v.clone()),
            Param::Resolver(f) => Param::Resolver(Rc::clone(f)),
        }
    }
}

impl<V: fmt::Debug, T> fmt::Debug for Param<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Param::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl<V, T> From<V> for Param<V, T> {
    fn from(v: V) -> Self {
        Param::Literal(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_number_takes_fallback_unit() {
        let v = normalize(&RawValue::Number(12.5), Some("px")).unwrap();
        assert_eq!(v.number, 1_250_000);
        assert_eq!(v.unit.as_deref(), Some("px"));
        assert_eq!(v.origin, OriginType::Number);
    }

    #[test]
    fn test_text_splits_numeric_prefix() {
        let v = normalize(&"-45.5deg".into(), None).unwrap();
        assert_eq!(v.to_f64(), -45.5);
        assert_eq!(v.unit.as_deref(), Some("deg"));
        assert_eq!(v.origin, OriginType::String);

        let v = normalize(&" 1e2 % ".into(), None).unwrap();
        assert_eq!(v.to_f64(), 100.0);
        assert_eq!(v.unit.as_deref(), Some("%"));

        let v = normalize(&".5".into(), Some("em")).unwrap();
        assert_eq!(v.to_f64(), 0.5);
        assert_eq!(v.unit.as_deref(), Some("em"));
    }

    #[test]
    fn test_non_numeric_text_is_rejected() {
        assert_eq!(normalize(&"auto".into(), None), None);
        assert_eq!(normalize(&"".into(), None), None);
    }

    #[test]
    fn test_resolver_receives_index_and_count() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let param: Param<f64, &str> = Param::resolver(move |_, i, n| {
            calls_clone.set(calls_clone.get() + 1);
            (i * 10 + n) as f64
        });
        assert_eq!(param.resolve(&"a", 2, 3), 23.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_stagger() {
        let param: Param<f64, &str> = Param::stagger(50.0);
        assert_eq!(param.resolve(&"a", 0, 4), 0.0);
        assert_eq!(param.resolve(&"a", 3, 4), 150.0);
    }
}
