//! Cadence Animation System
//!
//! Tween timelines with offsets, keyframes and easing, evaluated frame by
//! frame against any [`TargetHost`](cadence_core::TargetHost).
//!
//! # Features
//!
//! - **Timelines**: chained, absolute (`250.0`) and relative (`"+=100"`,
//!   `"-=50"`) offsets, concurrent groups and nested sequences
//! - **Keyframes**: per-property keyframe lists sharing one continuous
//!   easing curve, or running their own
//! - **Per-target parameters**: delay, duration, easing and values can be
//!   computed from the target and its index (staggering)
//! - **Scheduling**: play, pause, stop, seek, looping and alternating
//!   playback on an external frame clock
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{AnimationDefinition, Easing, Scheduler, TimelineConfig};
//! use cadence_core::{ManualClock, MemoryHost, Value};
//!
//! let host = MemoryHost::new();
//! host.insert("box", "x", Value::from_f64(0.0));
//! let clock = ManualClock::new();
//! let scheduler = Scheduler::new(host.clone(), clock.clone());
//!
//! let timeline = scheduler.create_timeline(TimelineConfig::new());
//! timeline
//!     .add(AnimationDefinition::new("box").duration(100.0).animate("x", 50.0))
//!     .add(
//!         AnimationDefinition::new("box")
//!             .duration(100.0)
//!             .easing(Easing::EaseOutCubic)
//!             .animate("x", 0.0),
//!     );
//!
//! let done = timeline.play().unwrap();
//! let mut now = 0.0;
//! while !done.is_complete() {
//!     clock.advance_to(now);
//!     now += 16.0;
//! }
//! assert_eq!(host.number("box", "x"), Some(0.0));
//! ```

pub mod config;
pub mod definition;
pub mod easing;
pub mod error;
pub mod handle;
pub mod keyframe;
pub mod offset;
mod runtime;
pub mod scheduler;
pub mod timeline;
pub mod values;

pub use config::{PlayDirection, TimelineConfig, TimelineEvent};
pub use definition::{
    AnimationDefinition, AnimationEvent, Callback, Entry, Sequence, TweenDefaults,
    TweenDefinition, TweenSpec,
};
pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use handle::{Completion, TimelineHandle};
pub use keyframe::{build_animation, PreparedAnimation, Track, Tween, Window};
pub use offset::{resolve_start, Offset, Placement};
pub use scheduler::{FrameListenerId, PlayState, Scheduler, SchedulerHandle, TimelineId};
pub use timeline::{compose, Composition, PositionedAnimation};
pub use values::{normalize, Param, RawValue, Resolver};
