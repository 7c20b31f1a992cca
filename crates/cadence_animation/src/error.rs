//! Animation error types

use thiserror::Error;

/// Errors raised while declaring or driving timelines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// A relative offset string did not match `+=N` / `-=N`
    #[error("Malformed offset {0:?}: expected a number, \"+=N\" or \"-=N\"")]
    MalformedOffset(String),

    /// An easing name could not be parsed
    #[error("Unknown easing function: {0}")]
    UnknownEasing(String),

    /// The scheduler backing a handle has been dropped
    #[error("Animation scheduler has been dropped")]
    SchedulerDropped,

    /// The timeline is no longer registered with the scheduler
    #[error("Timeline is not registered with the scheduler")]
    TimelineNotFound,
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
