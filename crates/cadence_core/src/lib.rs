//! Cadence Core
//!
//! The narrow contracts the animation engine talks through:
//!
//! - **Values**: the normalized `{number, unit}` shape, integer-scaled to avoid
//!   floating-point drift across many small per-frame increments
//! - **Targets**: reading, writing and resolving the things being animated
//! - **Clocks**: requesting and cancelling the recurring frame callback
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{MemoryHost, TargetHost, Targets, Value};
//!
//! let host = MemoryHost::new();
//! host.insert("box", "opacity", Value::from_f64(0.5));
//!
//! let targets = host.resolve_targets(&Targets::One("box"));
//! assert_eq!(targets, vec!["box"]);
//! assert_eq!(host.get("box", "opacity").map(|v| v.to_f64()), Some(0.5));
//! ```

pub mod clock;
pub mod target;
pub mod value;

pub use clock::{FrameCallback, FrameClock, ManualClock, TickHandle};
pub use target::{MemoryHost, PropertyBatch, TargetHost, Targets};
pub use value::{OriginType, Value, VALUE_SCALE};
