//! Entry offsets
//!
//! An offset positions a timeline entry against the composition cursor:
//! chained directly after the previous entry, at a fixed point from the
//! level's anchor, or `+=`/`-=` relative to the cursor.

use crate::error::{AnimationError, Result};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Declared positioning of a timeline entry
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Offset {
    /// Start where the previous non-absolute entry ended
    #[default]
    Chained,
    /// Start at `anchor + ms`; does not push the relative cursor
    Absolute(f64),
    /// Start at `cursor + ms` (`ms` may be negative)
    Relative(f64),
}

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([+-])=(\d+(?:\.\d+)?)$").expect("offset pattern is valid")
    })
}

impl Offset {
    /// Parse `"+=N"` / `"-=N"`; an empty string means chained
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.trim().is_empty() {
            return Ok(Offset::Chained);
        }
        let caps = relative_pattern()
            .captures(spec)
            .ok_or_else(|| AnimationError::MalformedOffset(spec.to_string()))?;
        let amount: f64 = caps[2]
            .parse()
            .map_err(|_| AnimationError::MalformedOffset(spec.to_string()))?;
        Ok(match &caps[1] {
            "-" => Offset::Relative(-amount),
            _ => Offset::Relative(amount),
        })
    }

    /// Absolute offsets float over the timeline without moving the cursor
    pub fn is_absolute(&self) -> bool {
        matches!(self, Offset::Absolute(_))
    }
}

impl FromStr for Offset {
    type Err = AnimationError;

    fn from_str(spec: &str) -> Result<Self> {
        Offset::parse(spec)
    }
}

impl From<f64> for Offset {
    fn from(ms: f64) -> Self {
        Offset::Absolute(ms)
    }
}

impl From<u32> for Offset {
    fn from(ms: u32) -> Self {
        Offset::Absolute(ms as f64)
    }
}

impl From<i32> for Offset {
    fn from(ms: i32) -> Self {
        Offset::Absolute(ms as f64)
    }
}

/// A resolved execution start
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub start: f64,
    pub absolute: bool,
}

/// Resolve an entry's execution start
///
/// `relative_end` is the cursor reached by non-absolute entries so far and
/// `anchor` the point absolute offsets are measured from. `delay` is added
/// after the offset; the result never goes below zero.
pub fn resolve_start(relative_end: f64, anchor: f64, offset: Offset, delay: f64) -> Placement {
    let (start, absolute) = match offset {
        Offset::Chained => (relative_end, false),
        Offset::Absolute(ms) => (anchor + ms, true),
        Offset::Relative(ms) => (relative_end + ms, false),
    };
    Placement {
        start: (start + delay).max(0.0),
        absolute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(cursor: f64, anchor: f64, offset: &str) -> f64 {
        resolve_start(cursor, anchor, offset.parse().unwrap(), 0.0).start
    }

    #[test]
    fn test_parse_relative_offsets() {
        assert_eq!(Offset::parse("+=250"), Ok(Offset::Relative(250.0)));
        assert_eq!(Offset::parse("-=100"), Ok(Offset::Relative(-100.0)));
        assert_eq!(Offset::parse("+=12.5"), Ok(Offset::Relative(12.5)));
        assert_eq!(Offset::parse(""), Ok(Offset::Chained));
    }

    #[test]
    fn test_malformed_offsets_fail_fast() {
        for bad in ["100", "+100", "=+100", "+=abc", "*=2", "+=100ms", "+= 12.5", " -=5"] {
            assert_eq!(
                Offset::parse(bad),
                Err(AnimationError::MalformedOffset(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_relative_laws() {
        for cursor in [0.0, 10.0, 250.0, 1000.0] {
            for n in [0.0, 5.0, 300.0, 2000.0] {
                assert_eq!(start(cursor, 0.0, &format!("+={n}")), cursor + n);
                assert_eq!(
                    start(cursor, 0.0, &format!("-={n}")),
                    (cursor - n).max(0.0)
                );
            }
        }
    }

    #[test]
    fn test_absolute_ignores_cursor() {
        for cursor in [0.0, 400.0, 9000.0] {
            let placement = resolve_start(cursor, 100.0, Offset::from(250.0), 0.0);
            assert_eq!(placement.start, 350.0);
            assert!(placement.absolute);
        }
    }

    #[test]
    fn test_chained_and_delay() {
        let placement = resolve_start(500.0, 0.0, Offset::Chained, 50.0);
        assert_eq!(placement.start, 550.0);
        assert!(!placement.absolute);

        // Negative results clamp after the delay is applied
        let placement = resolve_start(100.0, 0.0, Offset::Relative(-300.0), 50.0);
        assert_eq!(placement.start, 0.0);
    }
}
