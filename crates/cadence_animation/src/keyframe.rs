//! Keyframe tracks
//!
//! A [`Track`] holds every keyframe tween of one `(target, property)` pair
//! inside one positioned animation. Timing is laid out when the timeline is
//! first activated; start and end values resolve lazily the first time
//! evaluation reaches a keyframe.
//!
//! Keyframes without their own easing share one curve across the whole
//! track. Each of them samples a *buffered* slice of that curve, so the
//! motion stays continuous at keyframe boundaries instead of restarting the
//! easing at 0 for every keyframe.

use crate::definition::{AnimationDefinition, TweenDefaults, TweenSpec};
use crate::easing::Easing;
use crate::values::{normalize, RawValue};
use cadence_core::{OriginType, Value};
use smallvec::SmallVec;
use std::fmt;

/// Keyframe duration when nothing else sets one
pub const DEFAULT_DURATION_MS: f64 = 1000.0;

/// Below this the buffered slice is considered flat
const DEGENERATE_SLICE: f64 = 1e-9;

/// A time window in milliseconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn shifted(self, by: f64) -> Window {
        Window {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// Virtual start and delta of the shared track curve
#[derive(Clone, Copy, Debug, PartialEq)]
struct Buffer {
    from: f64,
    diff: f64,
    /// Distance from the track curve's start to this keyframe's start
    lead: f64,
    /// Length of the track curve
    span: f64,
}

/// How a track reacts to being evaluated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EvalMode {
    /// Natural frame: only live keyframes write
    Tick,
    /// Scrub: write whatever the track shows at `t`, completed or not
    Seek,
}

/// What a track shows at one point in time
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Sample {
    /// Value of the keyframe live at that time
    Live(Value),
    /// Start value shown after scrubbing back before the first keyframe
    ///
    /// Yields to a live value written for the same property in the same
    /// pass, since an earlier animation may own the property at that time.
    Restore(Value),
}

impl Sample {
    #[cfg(test)]
    pub(crate) fn into_value(self) -> Value {
        match self {
            Sample::Live(value) | Sample::Restore(value) => value,
        }
    }
}

/// One keyframe bound to one `(target, property)` pair
#[derive(Clone, Debug)]
pub struct Tween {
    /// Window relative to the animation's execution start
    local: Window,
    /// Timeline window, assigned once the animation is positioned
    window: Option<Window>,
    easing: Easing,
    buffered: bool,
    raw_from: Option<RawValue>,
    raw_to: Option<RawValue>,
    from: Option<Value>,
    to: Option<Value>,
    diff: f64,
    buffer: Option<Buffer>,
    resolved: bool,
    inert: bool,
    complete: bool,
}

impl Tween {
    pub fn local_window(&self) -> Window {
        self.local
    }

    /// Timeline window
    ///
    /// # Panics
    ///
    /// If the owning animation has not been positioned yet.
    pub fn window(&self) -> Window {
        self.window
            .expect("tween evaluated before its animation was positioned")
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Whether this keyframe samples the shared track curve
    pub fn is_buffered(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Resolved start value
    pub fn from(&self) -> Option<&Value> {
        self.from.as_ref()
    }

    /// Resolved end value
    pub fn to(&self) -> Option<&Value> {
        self.to.as_ref()
    }

    fn reset(&mut self) {
        self.from = None;
        self.to = None;
        self.diff = 0.0;
        self.buffer = None;
        self.resolved = false;
        self.complete = false;
    }

    /// Scaled value at timeline time `t`, before rounding
    fn curve(&self, t: f64) -> f64 {
        let window = self.window();
        match self.buffer {
            Some(buffer) => {
                self.easing
                    .ease(t - window.start + buffer.lead, buffer.from, buffer.diff, buffer.span)
            }
            None => {
                let from = self.from.as_ref().map_or(0.0, |v| v.number as f64);
                self.easing
                    .ease(t - window.start, from, self.diff, window.duration())
            }
        }
    }

    fn value_at(&self, t: f64) -> Option<Value> {
        let to = self.to.clone()?;
        if t >= self.window().end {
            return Some(to);
        }
        Some(Value::from_scaled(
            self.curve(t).round() as i64,
            to.unit,
            to.origin,
        ))
    }
}

/// All keyframes of one property on one target
#[derive(Clone, Debug)]
pub struct Track<T> {
    target: T,
    property: String,
    tweens: SmallVec<[Tween; 2]>,
    /// Local window covered by the buffered keyframes
    curve_window: Option<Window>,
    /// Host value read the first time an implicit start is needed
    snapshot: Option<Option<Value>>,
    /// Set once the track has shown anything other than its initial state
    touched: bool,
}

impl<T: Clone + fmt::Debug> Track<T> {
    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    /// Local end of the last keyframe
    pub fn end(&self) -> f64 {
        self.tweens
            .iter()
            .map(|tween| tween.local.end)
            .fold(0.0, f64::max)
    }

    fn position(&mut self, execution_start: f64) {
        for tween in &mut self.tweens {
            tween.window = Some(tween.local.shifted(execution_start));
        }
    }

    /// Forget resolved values and completion; the host snapshot and the
    /// memoized resolver outputs survive
    pub(crate) fn reset(&mut self) {
        for tween in &mut self.tweens {
            tween.reset();
        }
        self.touched = false;
    }

    /// Evaluate the track at timeline time `t`
    ///
    /// Returns the value to commit, if any. `read` supplies the current
    /// value of the property when a keyframe has no explicit or chained
    /// start.
    pub(crate) fn evaluate<R>(&mut self, t: f64, mode: EvalMode, read: &mut R) -> Option<Sample>
    where
        R: FnMut(&T, &str) -> Option<Value>,
    {
        let active = self
            .tweens
            .iter()
            .rposition(|tween| !tween.inert && tween.window().start <= t);

        let Some(k) = active else {
            // Scrubbing back before the first keyframe restores the start
            // value, but only on a track that has already moved
            if mode == EvalMode::Seek && self.touched {
                let first = self.tweens.iter().position(|tween| !tween.inert)?;
                self.resolve_through(first, read);
                for tween in &mut self.tweens {
                    tween.complete = false;
                }
                self.touched = false;
                return self.tweens[first].from.clone().map(Sample::Restore);
            }
            return None;
        };

        self.resolve_through(k, read);

        if mode == EvalMode::Tick && self.tweens[k].complete {
            return None;
        }

        for (i, tween) in self.tweens.iter_mut().enumerate() {
            tween.complete = match mode {
                EvalMode::Tick if i < k => true,
                EvalMode::Tick if i > k => tween.complete,
                _ => !tween.inert && t >= tween.window().end,
            };
        }
        self.touched = true;
        self.tweens[k].value_at(t).map(Sample::Live)
    }

    /// Resolve start and end values of every keyframe up to `k`
    fn resolve_through<R>(&mut self, k: usize, read: &mut R)
    where
        R: FnMut(&T, &str) -> Option<Value>,
    {
        for i in 0..=k {
            if self.tweens[i].resolved || self.tweens[i].inert {
                continue;
            }

            let Some(mut to) = self.tweens[i]
                .raw_to
                .as_ref()
                .and_then(|raw| normalize(raw, None))
            else {
                self.tweens[i].inert = true;
                continue;
            };

            let explicit = self.tweens[i]
                .raw_from
                .as_ref()
                .and_then(|raw| normalize(raw, to.unit.as_deref()));
            let chained = self.tweens[..i]
                .iter()
                .rev()
                .find(|tween| !tween.inert)
                .and_then(|tween| tween.to.clone());
            let from = match explicit.or(chained) {
                Some(from) => from,
                None => self
                    .snapshot(read)
                    .unwrap_or_else(|| Value::from_scaled(0, to.unit.clone(), OriginType::Number)),
            };

            // A bare destination takes the unit it is heading away from
            if to.unit.is_none() && to.origin == OriginType::Number {
                to.unit = from.unit.clone();
            }
            if let (Some(from_unit), Some(to_unit)) = (&from.unit, &to.unit) {
                if from_unit != to_unit {
                    tracing::warn!(
                        "Track {:?}.{}: unit mismatch {} -> {}, using {}",
                        self.target,
                        self.property,
                        from_unit,
                        to_unit,
                        to_unit
                    );
                }
            }

            let diff = (to.number - from.number) as f64;
            let curve_window = self.curve_window;
            let tween = &mut self.tweens[i];
            tween.buffer = if tween.buffered {
                curve_window.and_then(|curve| buffer_for(tween, curve, from.number as f64, diff))
            } else {
                None
            };
            tween.diff = diff;
            tween.from = Some(from);
            tween.to = Some(to);
            tween.resolved = true;
        }
    }

    fn snapshot<R>(&mut self, read: &mut R) -> Option<Value>
    where
        R: FnMut(&T, &str) -> Option<Value>,
    {
        if self.snapshot.is_none() {
            self.snapshot = Some(read(&self.target, &self.property));
        }
        self.snapshot.clone().flatten()
    }
}

/// Virtual curve that passes through `from` at the keyframe's start and
/// `from + diff` at its end while following the shared track curve
fn buffer_for(tween: &Tween, curve: Window, from: f64, diff: f64) -> Option<Buffer> {
    let span = curve.duration();
    if span <= 0.0 {
        return None;
    }
    let lead = tween.local.start - curve.start;
    let p0 = tween.easing.apply(lead / span);
    let p1 = tween.easing.apply((tween.local.end - curve.start) / span);
    if (p1 - p0).abs() < DEGENERATE_SLICE {
        return None;
    }
    let virtual_diff = diff / (p1 - p0);
    Some(Buffer {
        from: from - virtual_diff * p0,
        diff: virtual_diff,
        lead,
        span,
    })
}

/// Tracks of one animation for its resolved targets
#[derive(Clone, Debug)]
pub struct PreparedAnimation<T> {
    pub tracks: Vec<Track<T>>,
    /// Length of the animation's execution window
    pub span: f64,
}

impl<T: Clone + fmt::Debug> PreparedAnimation<T> {
    /// Anchor every keyframe at the animation's execution start
    pub fn position(&mut self, execution_start: f64) {
        for track in &mut self.tracks {
            track.position(execution_start);
        }
    }

    pub(crate) fn reset(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
    }
}

/// Expand `definition` into one track per target and property
///
/// `fallback` holds the timeline-wide defaults. Every resolver is invoked
/// here, once per target, and never again.
pub fn build_animation<T: Clone + fmt::Debug>(
    definition: &AnimationDefinition<T>,
    targets: &[T],
    fallback: &TweenDefaults<T>,
) -> PreparedAnimation<T> {
    let defaults = definition.defaults.merged_with(fallback);
    let count = targets.len();
    let mut span = definition.duration.unwrap_or(0.0).max(0.0);
    let mut tracks = Vec::with_capacity(count * definition.properties.len());

    for (index, target) in targets.iter().enumerate() {
        let shared_easing = definition
            .easing
            .as_ref()
            .or(defaults.easing.as_ref())
            .map_or(Easing::Linear, |easing| easing.resolve(target, index, count));

        for (property, spec) in &definition.properties {
            let track = build_track(
                definition,
                &defaults,
                spec,
                TrackSlot {
                    target,
                    index,
                    count,
                    property,
                    shared_easing,
                },
            );
            span = span.max(track.end());
            tracks.push(track);
        }
    }

    PreparedAnimation { tracks, span }
}

struct TrackSlot<'a, T> {
    target: &'a T,
    index: usize,
    count: usize,
    property: &'a str,
    shared_easing: Easing,
}

fn build_track<T: Clone + fmt::Debug>(
    definition: &AnimationDefinition<T>,
    defaults: &TweenDefaults<T>,
    spec: &TweenSpec<T>,
    slot: TrackSlot<'_, T>,
) -> Track<T> {
    let TrackSlot {
        target,
        index,
        count,
        property,
        shared_easing,
    } = slot;

    let mut cursor = 0.0_f64;
    let mut tweens: SmallVec<[Tween; 2]> = SmallVec::new();

    for (k, keyframe) in spec.keyframes().iter().enumerate() {
        let first = k == 0;

        let delay = keyframe
            .delay
            .as_ref()
            .or(if first { defaults.delay.as_ref() } else { None })
            .map_or(0.0, |delay| delay.resolve(target, index, count));

        let duration = match (&keyframe.duration, definition.duration) {
            (Some(duration), _) => duration.resolve(target, index, count),
            (None, Some(duration)) if first => duration,
            _ => defaults
                .duration
                .as_ref()
                .map_or(DEFAULT_DURATION_MS, |duration| {
                    duration.resolve(target, index, count)
                }),
        }
        .max(0.0);

        let (easing, buffered) = match &keyframe.easing {
            Some(easing) => (easing.resolve(target, index, count), false),
            None => (shared_easing, true),
        };

        let raw_to = keyframe
            .to
            .as_ref()
            .and_then(|to| to.resolve(target, index, count));
        let raw_from = keyframe
            .from
            .as_ref()
            .map(|from| from.resolve(target, index, count));

        let inert = match &raw_to {
            None => true,
            Some(raw) if normalize(raw, None).is_none() => {
                tracing::warn!(
                    "Track {:?}.{}: keyframe {} destination {:?} is not numeric, skipping",
                    target,
                    property,
                    k,
                    raw
                );
                true
            }
            Some(_) => false,
        };

        let start = (cursor + delay).max(0.0);
        let local = Window {
            start,
            end: start + duration,
        };
        cursor = local.end;

        tweens.push(Tween {
            local,
            window: None,
            easing,
            buffered,
            raw_from,
            raw_to,
            from: None,
            to: None,
            diff: 0.0,
            buffer: None,
            resolved: false,
            inert,
            complete: false,
        });
    }

    let curve_window = tweens
        .iter()
        .filter(|tween| tween.buffered && !tween.inert)
        .map(|tween| tween.local)
        .reduce(|a, b| Window {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        });

    Track {
        target: target.clone(),
        property: property.to_string(),
        tweens,
        curve_window,
        snapshot: None,
        touched: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TweenDefinition;
    use crate::values::Param;
    use cadence_core::VALUE_SCALE;
    use std::cell::Cell;
    use std::rc::Rc;

    type Def = AnimationDefinition<&'static str>;
    type Kf = TweenDefinition<&'static str>;

    fn zero_host(_: &&'static str, _: &str) -> Option<Value> {
        Some(Value::from_f64(0.0))
    }

    fn prepare(def: &Def, targets: &[&'static str]) -> PreparedAnimation<&'static str> {
        let mut prepared = build_animation(def, targets, &TweenDefaults::new());
        prepared.position(0.0);
        prepared
    }

    fn windows(track: &Track<&'static str>) -> Vec<(f64, f64)> {
        track
            .tweens()
            .iter()
            .map(|tween| (tween.local.start, tween.local.end))
            .collect()
    }

    #[test]
    fn test_keyframes_chain_with_delay_and_duration_fallbacks() {
        let def = Def::new("box").duration(500.0).animate(
            "x",
            vec![
                Kf::to(10.0),
                Kf::to(20.0).delay(100.0).duration(200.0),
                Kf::to(30.0),
            ],
        );
        let prepared = prepare(&def, &["box"]);
        assert_eq!(
            windows(&prepared.tracks[0]),
            vec![(0.0, 500.0), (600.0, 800.0), (800.0, 1800.0)]
        );
        assert_eq!(prepared.span, 1800.0);
    }

    #[test]
    fn test_defaults_fill_missing_timing() {
        let def = Def::new("box")
            .defaults(TweenDefaults::new().duration(250.0).delay(40.0))
            .animate("x", vec![Kf::to(1.0), Kf::to(2.0)]);
        let prepared = prepare(&def, &["box"]);
        // The default delay only offsets the first keyframe
        assert_eq!(
            windows(&prepared.tracks[0]),
            vec![(40.0, 290.0), (290.0, 540.0)]
        );
    }

    #[test]
    fn test_definition_duration_floors_span() {
        let def = Def::new("box")
            .duration(2000.0)
            .animate("x", Kf::to(5.0).duration(100.0));
        let prepared = prepare(&def, &["box"]);
        assert_eq!(prepared.span, 2000.0);

        let def = Def::new("box").animate("x", 5.0);
        assert_eq!(prepare(&def, &["box"]).span, DEFAULT_DURATION_MS);
    }

    #[test]
    fn test_one_track_per_target_and_property() {
        let def = Def::new(vec!["a", "b"]).animate("x", 1.0).animate("y", 2.0);
        let prepared = prepare(&def, &["a", "b"]);
        let keys: Vec<_> = prepared
            .tracks
            .iter()
            .map(|track| (*track.target(), track.property().to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a", "x".to_string()),
                ("a", "y".to_string()),
                ("b", "x".to_string()),
                ("b", "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_linear_single_keyframe() {
        let def = Def::new("box")
            .duration(1000.0)
            .animate("x", Kf::to(100.0).from(0.0));
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];

        let v = track.evaluate(250.0, EvalMode::Tick, &mut zero_host).unwrap().into_value();
        assert_eq!(v.to_f64(), 25.0);
        let v = track.evaluate(1000.0, EvalMode::Tick, &mut zero_host).unwrap().into_value();
        assert_eq!(v.to_f64(), 100.0);
        assert!(track.tweens()[0].is_complete());
    }

    #[test]
    fn test_buffered_keyframes_are_continuous_at_boundary() {
        let def = Def::new("box").easing(Easing::EaseInOutQuad).animate(
            "x",
            vec![
                Kf::to(100.0).from(0.0).duration(500.0),
                Kf::to(300.0).duration(500.0),
            ],
        );
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        track.resolve_through(1, &mut zero_host);

        let first = &track.tweens()[0];
        let second = &track.tweens()[1];
        assert!(first.is_buffered());
        assert!(second.is_buffered());

        let boundary = 500.0;
        let left = first.curve(boundary);
        let right = second.curve(boundary);
        assert!((left - right).abs() < 1e-6, "{left} vs {right}");
        assert!((left - 100.0 * VALUE_SCALE as f64).abs() < 1e-6);

        // Approaching from the left lands on the same value
        let near = first.curve(boundary - 1e-3);
        assert!((near - left).abs() < 1.0 * VALUE_SCALE as f64);
    }

    #[test]
    fn test_buffered_slice_differs_from_restarted_curve() {
        let def = Def::new("box").easing(Easing::EaseInQuad).animate(
            "x",
            vec![Kf::to(100.0).from(0.0).duration(500.0), Kf::to(200.0).duration(500.0)],
        );
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        let v = track.evaluate(750.0, EvalMode::Tick, &mut zero_host).unwrap().into_value();

        // Restarting ease-in-quad at the boundary would give 100 + 100 * 0.25
        let restarted = 125.0;
        assert!((v.to_f64() - restarted).abs() > 1.0);
        assert!(v.to_f64() > 100.0 && v.to_f64() < 200.0);
    }

    #[test]
    fn test_explicit_easing_runs_its_own_curve() {
        let def = Def::new("box").easing(Easing::EaseInQuad).animate(
            "x",
            vec![
                Kf::to(100.0).from(0.0).duration(500.0),
                Kf::to(200.0).duration(500.0).easing(Easing::Linear),
            ],
        );
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        let v = track.evaluate(750.0, EvalMode::Tick, &mut zero_host).unwrap().into_value();
        assert_eq!(v.to_f64(), 150.0);
        assert!(!track.tweens()[1].is_buffered());
    }

    #[test]
    fn test_inert_keyframe_is_skipped() {
        let def = Def::new("box").animate(
            "x",
            vec![
                Kf::to(10.0).from(0.0).duration(100.0),
                Kf::new().duration(100.0),
                Kf::to("auto").duration(100.0),
                Kf::to(40.0).duration(100.0),
            ],
        );
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        assert!(track.tweens()[1].is_inert());
        assert!(track.tweens()[2].is_inert());

        // Inside the inert windows nothing new is written
        assert_eq!(
            track
                .evaluate(100.0, EvalMode::Tick, &mut zero_host)
                .map(|sample| sample.into_value().to_f64()),
            Some(10.0)
        );
        assert_eq!(track.evaluate(150.0, EvalMode::Tick, &mut zero_host), None);

        // The next live keyframe chains from the last live destination
        let v = track.evaluate(350.0, EvalMode::Tick, &mut zero_host).unwrap().into_value();
        assert_eq!(track.tweens()[3].from().map(|v| v.to_f64()), Some(10.0));
        assert_eq!(v.to_f64(), 25.0);
    }

    #[test]
    fn test_implicit_start_reads_host_once() {
        let reads = Cell::new(0);
        let mut read = |_: &&'static str, _: &str| {
            reads.set(reads.get() + 1);
            Some(Value::with_unit(50.0, "px"))
        };

        let def = Def::new("box").duration(100.0).animate("left", 150.0);
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];

        let v = track.evaluate(50.0, EvalMode::Tick, &mut read).unwrap().into_value();
        assert_eq!(v.to_f64(), 100.0);
        assert_eq!(v.unit.as_deref(), Some("px"));

        track.reset();
        track.evaluate(50.0, EvalMode::Tick, &mut read);
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn test_bare_number_inherits_unit() {
        let def = Def::new("box")
            .duration(100.0)
            .animate("width", Kf::to(50.0).from("10px"));
        let mut prepared = prepare(&def, &["box"]);
        let v = prepared.tracks[0]
            .evaluate(100.0, EvalMode::Tick, &mut zero_host)
            .unwrap()
            .into_value();
        assert_eq!(v.unit.as_deref(), Some("px"));
        assert_eq!(v.to_f64(), 50.0);
    }

    #[test]
    fn test_completed_track_writes_once_in_tick_mode() {
        let def = Def::new("box").duration(100.0).animate("x", Kf::to(1.0).from(0.0));
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        assert!(track.evaluate(120.0, EvalMode::Tick, &mut zero_host).is_some());
        assert!(track.evaluate(140.0, EvalMode::Tick, &mut zero_host).is_none());
        // Seeking always shows the value at that time
        assert!(track.evaluate(140.0, EvalMode::Seek, &mut zero_host).is_some());
    }

    #[test]
    fn test_nothing_written_before_start() {
        let def = Def::new("box").animate("x", Kf::to(1.0).delay(100.0));
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        assert_eq!(track.evaluate(50.0, EvalMode::Tick, &mut zero_host), None);
        assert_eq!(track.evaluate(50.0, EvalMode::Seek, &mut zero_host), None);
    }

    #[test]
    fn test_seeking_back_restores_start_value() {
        let def = Def::new("box").animate("x", Kf::to(10.0).from(4.0).delay(100.0).duration(100.0));
        let mut prepared = prepare(&def, &["box"]);
        let track = &mut prepared.tracks[0];
        track.evaluate(150.0, EvalMode::Seek, &mut zero_host);
        let sample = track.evaluate(20.0, EvalMode::Seek, &mut zero_host);
        assert_eq!(sample, Some(Sample::Restore(Value::from_f64(4.0))));
        assert!(!track.tweens()[0].is_complete());
    }

    #[test]
    fn test_resolvers_run_once_per_target() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let def = Def::new(vec!["a", "b", "c"]).duration(100.0).animate(
            "x",
            Kf::new().target_with(move |_, index, count| {
                counter.set(counter.get() + 1);
                Some(RawValue::Number((index * 10 + count) as f64))
            }),
        );
        let mut prepared = prepare(&def, &["a", "b", "c"]);
        assert_eq!(calls.get(), 3);

        for track in &mut prepared.tracks {
            track.evaluate(100.0, EvalMode::Tick, &mut zero_host);
            track.reset();
            track.evaluate(100.0, EvalMode::Tick, &mut zero_host);
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(
            prepared.tracks[2].tweens()[0].to().map(|v| v.to_f64()),
            Some(23.0)
        );
    }

    #[test]
    fn test_stagger_delay_per_target() {
        let def = Def::new(vec!["a", "b", "c"])
            .defaults(TweenDefaults::new().delay(Param::stagger(100.0)))
            .duration(200.0)
            .animate("x", 1.0);
        let prepared = prepare(&def, &["a", "b", "c"]);
        let starts: Vec<_> = prepared
            .tracks
            .iter()
            .map(|track| track.tweens()[0].local_window().start)
            .collect();
        assert_eq!(starts, vec![0.0, 100.0, 200.0]);
        assert_eq!(prepared.span, 400.0);
    }
}
