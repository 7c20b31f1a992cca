//! Timeline configuration

use crate::definition::{Callback, TweenDefaults};
use crate::scheduler::TimelineId;
use std::rc::Rc;

/// Playback direction for timelines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayDirection {
    /// Play forward (0 -> end)
    #[default]
    Forward,
    /// Play in reverse (end -> 0)
    Reverse,
    /// Alternate between forward and reverse each iteration
    Alternate,
}

/// Lifecycle event for a whole timeline
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineEvent {
    pub id: TimelineId,
    /// Timeline time in milliseconds
    pub time_ms: f64,
    /// Progress through the current iteration (0.0 to 1.0)
    pub progress: f64,
    /// Zero-based iteration
    pub iteration: i32,
}

/// Settings a timeline is created with
///
/// # Example
///
/// ```ignore
/// let config = TimelineConfig::new()
///     .ping_pong()
///     .loop_count(4)
///     .defaults(TweenDefaults::new().duration(300.0))
///     .on_complete(|event| println!("done after {} loops", event.iteration));
/// ```
pub struct TimelineConfig<T> {
    pub direction: PlayDirection,
    /// Number of iterations (-1 for infinite)
    pub iterations: i32,
    /// Multiplier applied to elapsed frame time
    pub playback_rate: f64,
    /// Fallback keyframe settings for every animation on the timeline
    pub defaults: TweenDefaults<T>,
    pub on_start: Option<Callback<TimelineEvent>>,
    pub on_update: Option<Callback<TimelineEvent>>,
    pub on_loop: Option<Callback<TimelineEvent>>,
    pub on_complete: Option<Callback<TimelineEvent>>,
}

impl<T> TimelineConfig<T> {
    pub fn new() -> Self {
        Self {
            direction: PlayDirection::Forward,
            iterations: 1,
            playback_rate: 1.0,
            defaults: TweenDefaults::new(),
            on_start: None,
            on_update: None,
            on_loop: None,
            on_complete: None,
        }
    }

    /// Repeat forever
    pub fn looping() -> Self {
        Self::new().loop_infinite()
    }

    /// Play forward then backward, forever
    pub fn alternating() -> Self {
        Self::new().ping_pong().loop_infinite()
    }

    pub fn direction(mut self, direction: PlayDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Alternate between forward and reverse each iteration
    pub fn ping_pong(mut self) -> Self {
        self.direction = PlayDirection::Alternate;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.direction = PlayDirection::Reverse;
        self
    }

    /// Set the number of iterations
    pub fn loop_count(mut self, count: i32) -> Self {
        self.iterations = count;
        self
    }

    pub fn loop_infinite(mut self) -> Self {
        self.iterations = -1;
        self
    }

    /// Speed multiplier; non-positive rates play at normal speed
    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn defaults(mut self, defaults: TweenDefaults<T>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Called once per run, on the first frame
    pub fn on_start(mut self, f: impl Fn(&TimelineEvent) + 'static) -> Self {
        self.on_start = Some(Rc::new(f));
        self
    }

    /// Called on every evaluated frame
    pub fn on_update(mut self, f: impl Fn(&TimelineEvent) + 'static) -> Self {
        self.on_update = Some(Rc::new(f));
        self
    }

    /// Called when an iteration ends and another begins
    pub fn on_loop(mut self, f: impl Fn(&TimelineEvent) + 'static) -> Self {
        self.on_loop = Some(Rc::new(f));
        self
    }

    /// Called when the last iteration ends
    pub fn on_complete(mut self, f: impl Fn(&TimelineEvent) + 'static) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub(crate) fn effective_rate(&self) -> f64 {
        if self.playback_rate > 0.0 && self.playback_rate.is_finite() {
            self.playback_rate
        } else {
            1.0
        }
    }

    /// Whether another iteration follows iteration `finished` (zero-based)
    pub(crate) fn repeats_after(&self, finished: i32) -> bool {
        self.iterations < 0 || finished + 1 < self.iterations
    }
}

impl<T> Default for TimelineConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TimelineConfig<T> {
    fn clone(&self) -> Self {
        Self {
            direction: self.direction,
            iterations: self.iterations,
            playback_rate: self.playback_rate,
            defaults: self.defaults.clone(),
            on_start: self.on_start.clone(),
            on_update: self.on_update.clone(),
            on_loop: self.on_loop.clone(),
            on_complete: self.on_complete.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimelineConfig::<&str>::new();
        assert_eq!(config.direction, PlayDirection::Forward);
        assert_eq!(config.iterations, 1);
        assert!(!config.repeats_after(0));
    }

    #[test]
    fn test_presets() {
        let looping = TimelineConfig::<&str>::looping();
        assert_eq!(looping.iterations, -1);
        assert!(looping.repeats_after(1_000));

        let alternating = TimelineConfig::<&str>::alternating();
        assert_eq!(alternating.direction, PlayDirection::Alternate);
        assert_eq!(alternating.iterations, -1);
    }

    #[test]
    fn test_loop_count() {
        let config = TimelineConfig::<&str>::new().loop_count(3);
        assert!(config.repeats_after(0));
        assert!(config.repeats_after(1));
        assert!(!config.repeats_after(2));
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        assert_eq!(TimelineConfig::<&str>::new().playback_rate(0.0).effective_rate(), 1.0);
        assert_eq!(TimelineConfig::<&str>::new().playback_rate(2.0).effective_rate(), 2.0);
    }
}
