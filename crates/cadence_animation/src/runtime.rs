//! Per-timeline runtime state
//!
//! Holds the declared entries, their composition and the prepared tracks of
//! every positioned animation. Evaluation never touches the host directly:
//! writes are merged into a per-frame batch and callbacks are queued as
//! [`Effect`]s, both drained by the scheduler after it releases its borrow.

use crate::config::TimelineEvent;
use crate::definition::{AnimationEvent, Callback, Entry, TweenDefaults};
use crate::handle::Completion;
use crate::keyframe::{build_animation, EvalMode, PreparedAnimation, Sample};
use crate::timeline::{Composition, PositionedAnimation};
use cadence_core::{PropertyBatch, TargetHost};
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash};

/// Merged writes of one frame, keyed by target in first-write order
pub(crate) type FrameWrites<T> = IndexMap<T, PropertyBatch, BuildHasherDefault<FxHasher>>;

/// Deferred side effect of a frame
pub(crate) enum Effect {
    Animation(Callback<AnimationEvent>, AnimationEvent),
    Timeline(Callback<TimelineEvent>, TimelineEvent),
    Resolve(Completion),
}

impl Effect {
    pub(crate) fn run(self) {
        match self {
            Effect::Animation(callback, event) => callback(&event),
            Effect::Timeline(callback, event) => callback(&event),
            Effect::Resolve(completion) => completion.resolve(),
        }
    }
}

struct AnimationRuntime<T> {
    positioned: PositionedAnimation<T>,
    prepared: PreparedAnimation<T>,
    began: bool,
    completed: bool,
}

impl<T> AnimationRuntime<T> {
    fn event(&self, t: f64) -> AnimationEvent {
        let span = self.positioned.span();
        let progress = if span > 0.0 {
            ((t - self.positioned.execution_start) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        AnimationEvent {
            index: self.positioned.index,
            time_ms: t,
            progress,
        }
    }
}

/// Entries, composition and tracks of one timeline
pub(crate) struct TimelineRuntime<T> {
    entries: Vec<Entry<T>>,
    /// Number of entries already merged into the composition
    composed: usize,
    composition: Composition<T>,
    animations: Vec<AnimationRuntime<T>>,
}

impl<T> TimelineRuntime<T>
where
    T: Clone + Eq + Hash + fmt::Debug + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            composed: 0,
            composition: Composition::default(),
            animations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, entry: Entry<T>) {
        self.entries.push(entry);
    }

    pub(crate) fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.composed < self.entries.len()
    }

    /// Compose entries added since the last call and build their tracks
    pub(crate) fn sync<H>(&mut self, host: &H, defaults: &TweenDefaults<T>)
    where
        H: TargetHost<Target = T>,
    {
        if !self.has_pending() {
            return;
        }
        let first_new = self.composition.len();
        let mut prepared = Vec::new();
        self.composition
            .extend(&self.entries[self.composed..], |definition| {
                let targets = host.resolve_targets(&definition.targets);
                let animation = build_animation(definition, &targets, defaults);
                let span = animation.span;
                prepared.push(animation);
                span
            });
        self.composed = self.entries.len();

        for (positioned, mut animation) in self.composition.queue[first_new..]
            .iter()
            .zip(prepared)
        {
            animation.position(positioned.execution_start);
            self.animations.push(AnimationRuntime {
                positioned: positioned.clone(),
                prepared: animation,
                began: false,
                completed: false,
            });
        }
        tracing::trace!(
            "TimelineRuntime: composed {} animations, end {}ms",
            self.animations.len(),
            self.composition.execution_end
        );
    }

    /// Timeline length: the latest execution end of any animation
    pub(crate) fn end_time(&self) -> f64 {
        self.composition.execution_end
    }

    /// Evaluate every track at timeline time `t`
    ///
    /// In tick mode per-animation callbacks are queued onto `effects`; a
    /// seek only updates lifecycle flags.
    pub(crate) fn evaluate<H>(
        &mut self,
        t: f64,
        mode: EvalMode,
        host: &H,
        writes: &mut FrameWrites<T>,
        effects: &mut Vec<Effect>,
    ) where
        H: TargetHost<Target = T>,
    {
        for animation in &mut self.animations {
            for track in &mut animation.prepared.tracks {
                let value = track.evaluate(t, mode, &mut |target: &T, property: &str| {
                    // Values committed earlier in this frame win over the host
                    writes
                        .get(target)
                        .and_then(|batch| batch.get(property))
                        .cloned()
                        .or_else(|| host.read_value(target, property))
                });
                match value {
                    Some(Sample::Live(value)) => {
                        writes
                            .entry(track.target().clone())
                            .or_default()
                            .insert(track.property().to_string(), value);
                    }
                    // A live value from another animation owns the property
                    Some(Sample::Restore(value)) => {
                        writes
                            .entry(track.target().clone())
                            .or_default()
                            .entry(track.property().to_string())
                            .or_insert(value);
                    }
                    None => {}
                }
            }

            let start = animation.positioned.execution_start;
            let end = animation.positioned.execution_end;
            match mode {
                EvalMode::Tick => {
                    let definition = &animation.positioned.definition;
                    if !animation.began && t >= start {
                        animation.began = true;
                        if let Some(callback) = &definition.on_start {
                            effects.push(Effect::Animation(callback.clone(), animation.event(t)));
                        }
                    }
                    if animation.began && !animation.completed {
                        if let Some(callback) = &definition.on_update {
                            effects.push(Effect::Animation(callback.clone(), animation.event(t)));
                        }
                        if t >= end {
                            animation.completed = true;
                            if let Some(callback) = &definition.on_complete {
                                effects
                                    .push(Effect::Animation(callback.clone(), animation.event(t)));
                            }
                        }
                    }
                }
                EvalMode::Seek => {
                    animation.began = t >= start;
                    animation.completed = t >= end;
                }
            }
        }
    }

    /// Mark every animation complete, queueing the callbacks not yet fired
    pub(crate) fn complete_all(&mut self, t: f64, effects: &mut Vec<Effect>) {
        for animation in &mut self.animations {
            animation.began = true;
            if animation.completed {
                continue;
            }
            animation.completed = true;
            if let Some(callback) = &animation.positioned.definition.on_complete {
                effects.push(Effect::Animation(callback.clone(), animation.event(t)));
            }
        }
    }

    /// Back to the state right after composition
    ///
    /// Resolved values and completion flags are dropped; host snapshots and
    /// resolver outputs are kept.
    pub(crate) fn reset(&mut self) {
        for animation in &mut self.animations {
            animation.prepared.reset();
            animation.began = false;
            animation.completed = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn animation_count(&self) -> usize {
        self.animations.len()
    }
}
