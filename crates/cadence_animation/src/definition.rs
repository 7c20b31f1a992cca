//! Declarative animation definitions
//!
//! These types describe *what* to animate. Nothing here is resolved against
//! targets or time; that happens when a timeline is first activated.

use crate::easing::Easing;
use crate::offset::Offset;
use crate::values::{Param, RawValue};
use cadence_core::{Targets, Value};
use indexmap::IndexMap;
use std::rc::Rc;

/// Callback invoked with a lifecycle event
pub type Callback<E> = Rc<dyn Fn(&E)>;

/// Lifecycle event for a single animation entry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationEvent {
    /// Position of the entry in the timeline's flat queue
    pub index: usize,
    /// Timeline time in milliseconds
    pub time_ms: f64,
    /// Progress through the entry's execution window (0.0 to 1.0)
    pub progress: f64,
}

/// Per-property tween settings shared by keyframes that don't set their own
pub struct TweenDefaults<T> {
    pub delay: Option<Param<f64, T>>,
    pub duration: Option<Param<f64, T>>,
    pub easing: Option<Param<Easing, T>>,
}

impl<T> TweenDefaults<T> {
    pub fn new() -> Self {
        Self {
            delay: None,
            duration: None,
            easing: None,
        }
    }

    /// Builder: default keyframe delay
    pub fn delay(mut self, delay: impl Into<Param<f64, T>>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    /// Builder: default keyframe duration
    pub fn duration(mut self, duration: impl Into<Param<f64, T>>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Builder: default easing
    pub fn easing(mut self, easing: impl Into<Param<Easing, T>>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Fill unset fields from `fallback`
    pub(crate) fn merged_with(&self, fallback: &TweenDefaults<T>) -> TweenDefaults<T> {
        TweenDefaults {
            delay: self.delay.clone().or_else(|| fallback.delay.clone()),
            duration: self.duration.clone().or_else(|| fallback.duration.clone()),
            easing: self.easing.clone().or_else(|| fallback.easing.clone()),
        }
    }
}

impl<T> Default for TweenDefaults<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TweenDefaults<T> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay.clone(),
            duration: self.duration.clone(),
            easing: self.easing.clone(),
        }
    }
}

/// One keyframe of a property
///
/// `delay` is the gap after the previous keyframe ends. A keyframe with its
/// own `easing` runs an independent curve; without one it follows the
/// property's shared curve.
pub struct TweenDefinition<T> {
    pub delay: Option<Param<f64, T>>,
    pub duration: Option<Param<f64, T>>,
    pub easing: Option<Param<Easing, T>>,
    pub from: Option<Param<RawValue, T>>,
    pub to: Option<Param<Option<RawValue>, T>>,
}

impl<T> TweenDefinition<T> {
    pub fn new() -> Self {
        Self {
            delay: None,
            duration: None,
            easing: None,
            from: None,
            to: None,
        }
    }

    /// Keyframe heading to `value`
    pub fn to(value: impl Into<RawValue>) -> Self {
        Self::new().target(value)
    }

    /// Builder: destination value
    pub fn target(mut self, value: impl Into<RawValue>) -> Self {
        self.to = Some(Param::Literal(Some(value.into())));
        self
    }

    /// Builder: destination computed per target; `None` leaves the keyframe inert
    pub fn target_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, usize, usize) -> Option<RawValue> + 'static,
    {
        self.to = Some(Param::resolver(f));
        self
    }

    /// Builder: explicit start value
    pub fn from(mut self, value: impl Into<RawValue>) -> Self {
        self.from = Some(Param::Literal(value.into()));
        self
    }

    /// Builder: start value computed per target
    pub fn from_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, usize, usize) -> RawValue + 'static,
    {
        self.from = Some(Param::resolver(f));
        self
    }

    /// Builder: gap after the previous keyframe
    pub fn delay(mut self, delay: impl Into<Param<f64, T>>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    /// Builder: keyframe duration
    pub fn duration(mut self, duration: impl Into<Param<f64, T>>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Builder: independent easing for this keyframe
    pub fn easing(mut self, easing: impl Into<Param<Easing, T>>) -> Self {
        self.easing = Some(easing.into());
        self
    }
}

impl<T> Default for TweenDefinition<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TweenDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay.clone(),
            duration: self.duration.clone(),
            easing: self.easing.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

/// How a property is animated
pub enum TweenSpec<T> {
    /// Animate to a value with the animation's own timing
    Literal(RawValue),
    /// A single explicit keyframe
    Single(TweenDefinition<T>),
    /// Keyframes played back to back
    Keyframes(Vec<TweenDefinition<T>>),
}

impl<T> TweenSpec<T> {
    /// Expand into an ordered keyframe list
    pub(crate) fn keyframes(&self) -> Vec<TweenDefinition<T>> {
        match self {
            TweenSpec::Literal(value) => vec![TweenDefinition::to(value.clone())],
            TweenSpec::Single(definition) => vec![definition.clone()],
            TweenSpec::Keyframes(keyframes) => keyframes.clone(),
        }
    }
}

impl<T> Clone for TweenSpec<T> {
    fn clone(&self) -> Self {
        match self {
            TweenSpec::Literal(v) => TweenSpec::Literal(v.clone()),
            TweenSpec::Single(d) => TweenSpec::Single(d.clone()),
            TweenSpec::Keyframes(k) => TweenSpec::Keyframes(k.clone()),
        }
    }
}

impl<T> From<f64> for TweenSpec<T> {
    fn from(v: f64) -> Self {
        TweenSpec::Literal(v.into())
    }
}

impl<T> From<i32> for TweenSpec<T> {
    fn from(v: i32) -> Self {
        TweenSpec::Literal(v.into())
    }
}

impl<T> From<&str> for TweenSpec<T> {
    fn from(v: &str) -> Self {
        TweenSpec::Literal(v.into())
    }
}

impl<T> From<Value> for TweenSpec<T> {
    fn from(v: Value) -> Self {
        TweenSpec::Literal(v.into())
    }
}

impl<T> From<RawValue> for TweenSpec<T> {
    fn from(v: RawValue) -> Self {
        TweenSpec::Literal(v)
    }
}

impl<T> From<TweenDefinition<T>> for TweenSpec<T> {
    fn from(d: TweenDefinition<T>) -> Self {
        TweenSpec::Single(d)
    }
}

impl<T> From<Vec<TweenDefinition<T>>> for TweenSpec<T> {
    fn from(k: Vec<TweenDefinition<T>>) -> Self {
        TweenSpec::Keyframes(k)
    }
}

/// One timeline entry: a set of property tweens applied to some targets
pub struct AnimationDefinition<T> {
    pub targets: Targets<T>,
    pub properties: IndexMap<String, TweenSpec<T>>,
    pub offset: Offset,
    /// Added on top of the resolved offset
    pub delay: f64,
    /// Duration of the first keyframe of each property, and a floor on the span
    pub duration: Option<f64>,
    /// Shared easing curve for keyframes without their own
    pub easing: Option<Param<Easing, T>>,
    pub defaults: TweenDefaults<T>,
    pub on_start: Option<Callback<AnimationEvent>>,
    pub on_update: Option<Callback<AnimationEvent>>,
    pub on_complete: Option<Callback<AnimationEvent>>,
}

impl<T> AnimationDefinition<T> {
    pub fn new(targets: impl Into<Targets<T>>) -> Self {
        Self {
            targets: targets.into(),
            properties: IndexMap::new(),
            offset: Offset::Chained,
            delay: 0.0,
            duration: None,
            easing: None,
            defaults: TweenDefaults::new(),
            on_start: None,
            on_update: None,
            on_complete: None,
        }
    }

    /// An entry with no targets; occupies time only
    pub fn idle() -> Self {
        Self::new(Targets::Many(Vec::new()))
    }

    /// Builder: animate `property` according to `spec`
    pub fn animate(mut self, property: impl Into<String>, spec: impl Into<TweenSpec<T>>) -> Self {
        self.properties.insert(property.into(), spec.into());
        self
    }

    pub fn offset(mut self, offset: impl Into<Offset>) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay = delay_ms;
        self
    }

    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn easing(mut self, easing: impl Into<Param<Easing, T>>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    pub fn defaults(mut self, defaults: TweenDefaults<T>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn on_start(mut self, f: impl Fn(&AnimationEvent) + 'static) -> Self {
        self.on_start = Some(Rc::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(&AnimationEvent) + 'static) -> Self {
        self.on_update = Some(Rc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&AnimationEvent) + 'static) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }
}

impl<T: Clone> Clone for AnimationDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            targets: self.targets.clone(),
            properties: self.properties.clone(),
            offset: self.offset,
            delay: self.delay,
            duration: self.duration,
            easing: self.easing.clone(),
            defaults: self.defaults.clone(),
            on_start: self.on_start.clone(),
            on_update: self.on_update.clone(),
            on_complete: self.on_complete.clone(),
        }
    }
}

/// A previously declared list of entries, replayed inside another timeline
pub struct Sequence<T> {
    pub entries: Vec<Entry<T>>,
    pub offset: Offset,
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            offset: Offset::Chained,
        }
    }

    /// Builder: append an entry
    pub fn then(mut self, entry: impl Into<Entry<T>>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// Builder: position of the whole sequence in its parent
    pub fn offset(mut self, offset: impl Into<Offset>) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            offset: self.offset,
        }
    }
}

/// A timeline entry
pub enum Entry<T> {
    Animation(Rc<AnimationDefinition<T>>),
    /// Members all start from the same cursor
    Group(Vec<Entry<T>>),
    /// A nested timeline
    Sequence(Sequence<T>),
}

impl<T> Entry<T> {
    /// Build a concurrent group
    pub fn group<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry<T>>,
    {
        Entry::Group(entries.into_iter().map(Into::into).collect())
    }
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        match self {
            Entry::Animation(def) => Entry::Animation(Rc::clone(def)),
            Entry::Group(entries) => Entry::Group(entries.clone()),
            Entry::Sequence(seq) => Entry::Sequence(seq.clone()),
        }
    }
}

impl<T> From<AnimationDefinition<T>> for Entry<T> {
    fn from(def: AnimationDefinition<T>) -> Self {
        Entry::Animation(Rc::new(def))
    }
}

impl<T> From<Rc<AnimationDefinition<T>>> for Entry<T> {
    fn from(def: Rc<AnimationDefinition<T>>) -> Self {
        Entry::Animation(def)
    }
}

impl<T> From<Sequence<T>> for Entry<T> {
    fn from(seq: Sequence<T>) -> Self {
        Entry::Sequence(seq)
    }
}

impl<T> From<Vec<Entry<T>>> for Entry<T> {
    fn from(entries: Vec<Entry<T>>) -> Self {
        Entry::Group(entries)
    }
}
