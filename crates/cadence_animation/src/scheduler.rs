//! Frame scheduler
//!
//! Owns every timeline and the set of active ones. On each frame of the
//! [`FrameClock`] it advances all active timelines, commits the merged
//! property writes through the [`TargetHost`], then runs lifecycle callbacks
//! and frame listeners.
//!
//! The scheduler is single-threaded: state lives behind `Rc<RefCell<..>>`
//! and [`SchedulerHandle`] holds a weak reference, so handles outliving the
//! scheduler become no-ops. No borrow is held while user callbacks run,
//! which lets callbacks drive timelines themselves.
//!
//! # Example
//!
//! ```ignore
//! let clock = ManualClock::new();
//! let scheduler = Scheduler::new(MemoryHost::new(), clock.clone());
//! let timeline = scheduler.create_timeline(TimelineConfig::new());
//! timeline.add(AnimationDefinition::new("box").animate("x", 100.0));
//! let done = timeline.play()?;
//! while !done.is_complete() {
//!     clock.advance_by(16.0);
//! }
//! ```

use crate::config::{PlayDirection, TimelineConfig, TimelineEvent};
use crate::definition::{Entry, Sequence};
use crate::error::{AnimationError, Result};
use crate::handle::{Completion, TimelineHandle};
use crate::keyframe::EvalMode;
use crate::runtime::{Effect, FrameWrites, TimelineRuntime};
use cadence_core::{FrameClock, TargetHost, TickHandle};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    pub struct TimelineId;
    pub struct FrameListenerId;
}

/// Playback state of a timeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    /// Created, never played
    #[default]
    Idle,
    Running,
    /// Registered but frozen; frames shift its start time
    Paused,
    /// Deregistered; progress is kept
    Stopped,
    /// Last iteration finished
    Complete,
}

type FrameListener = Rc<dyn Fn(f64)>;

struct TimelineState<T> {
    config: TimelineConfig<T>,
    runtime: TimelineRuntime<T>,
    state: PlayState,
    /// Frame timestamp that maps to elapsed 0; `None` re-bases on the next frame
    start_time: Option<f64>,
    last_frame: Option<f64>,
    /// Time into the current iteration, playback rate applied
    elapsed: f64,
    iteration: i32,
    reversed: bool,
    /// Whether the composition has been built
    initialized: bool,
    /// Whether `on_start` fired for the current run
    started: bool,
    completion: Completion,
}

impl<T> TimelineState<T>
where
    T: Clone + Eq + std::hash::Hash + std::fmt::Debug + 'static,
{
    fn new(config: TimelineConfig<T>) -> Self {
        let reversed = config.direction == PlayDirection::Reverse;
        Self {
            config,
            runtime: TimelineRuntime::new(),
            state: PlayState::Idle,
            start_time: None,
            last_frame: None,
            elapsed: 0.0,
            iteration: 0,
            reversed,
            initialized: false,
            started: false,
            completion: Completion::new(),
        }
    }

    fn sync<H: TargetHost<Target = T>>(&mut self, host: &H) {
        self.runtime.sync(host, &self.config.defaults);
        self.initialized = true;
    }

    fn end_time(&self) -> f64 {
        self.runtime.end_time()
    }

    /// Timeline time shown at the current elapsed time
    fn local_time(&self) -> f64 {
        let end = self.end_time().max(0.0);
        let t = if self.reversed {
            end - self.elapsed
        } else {
            self.elapsed
        };
        t.clamp(0.0, end)
    }

    fn progress(&self) -> f64 {
        let end = self.end_time();
        if end <= 0.0 {
            return if self.state == PlayState::Complete { 1.0 } else { 0.0 };
        }
        (self.elapsed / end).clamp(0.0, 1.0)
    }

    fn event(&self, id: TimelineId) -> TimelineEvent {
        TimelineEvent {
            id,
            time_ms: self.local_time(),
            progress: self.progress(),
            iteration: self.iteration,
        }
    }

    fn push_event(
        &self,
        id: TimelineId,
        callback: &Option<crate::definition::Callback<TimelineEvent>>,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(callback) = callback {
            effects.push(Effect::Timeline(callback.clone(), self.event(id)));
        }
    }

    /// Full reset for a replay after completion
    fn restart(&mut self) {
        self.runtime.reset();
        self.state = PlayState::Idle;
        self.start_time = None;
        self.last_frame = None;
        self.elapsed = 0.0;
        self.iteration = 0;
        self.reversed = self.config.direction == PlayDirection::Reverse;
        self.started = false;
        self.completion = Completion::new();
    }

    /// Complete a timeline that has nothing to wait for
    fn finish_immediately<H: TargetHost<Target = T>>(
        &mut self,
        id: TimelineId,
        host: &H,
        writes: &mut FrameWrites<T>,
        effects: &mut Vec<Effect>,
    ) {
        let end = self.end_time().max(0.0);
        self.runtime.evaluate(end, EvalMode::Seek, host, writes, effects);
        self.runtime.complete_all(end, effects);
        self.elapsed = end;
        self.state = PlayState::Complete;
        self.push_event(id, &self.config.on_complete, effects);
        effects.push(Effect::Resolve(self.completion.clone()));
    }

    /// Advance by one frame; returns `false` once the timeline leaves the
    /// active set
    fn advance<H: TargetHost<Target = T>>(
        &mut self,
        id: TimelineId,
        timestamp: f64,
        host: &H,
        writes: &mut FrameWrites<T>,
        effects: &mut Vec<Effect>,
    ) -> bool {
        match self.state {
            PlayState::Running => {}
            PlayState::Paused => {
                if let (Some(last), Some(start)) = (self.last_frame, self.start_time.as_mut()) {
                    *start += timestamp - last;
                }
                self.last_frame = Some(timestamp);
                return true;
            }
            _ => return false,
        }

        let rate = self.config.effective_rate();
        let elapsed = self.elapsed;
        let start = *self.start_time.get_or_insert(timestamp - elapsed / rate);
        self.last_frame = Some(timestamp);
        self.elapsed = ((timestamp - start) * rate).max(0.0);

        if !self.started {
            self.started = true;
            self.push_event(id, &self.config.on_start, effects);
        }

        let mode = if self.reversed {
            EvalMode::Seek
        } else {
            EvalMode::Tick
        };
        let t = self.local_time();
        self.runtime.evaluate(t, mode, host, writes, effects);
        self.push_event(id, &self.config.on_update, effects);

        let end = self.end_time();
        if self.elapsed < end {
            return true;
        }

        if !self.completion.is_complete() {
            effects.push(Effect::Resolve(self.completion.clone()));
        }

        if end > 0.0 && self.config.repeats_after(self.iteration) {
            self.push_event(id, &self.config.on_loop, effects);
            self.iteration += 1;
            if self.config.direction == PlayDirection::Alternate {
                self.reversed = !self.reversed;
            }
            self.runtime.reset();
            self.elapsed -= end;
            self.start_time = Some(start + end / rate);
            tracing::debug!(
                "Scheduler: timeline {:?} looped (iteration {})",
                id,
                self.iteration
            );
            true
        } else {
            self.state = PlayState::Complete;
            self.push_event(id, &self.config.on_complete, effects);
            tracing::debug!("Scheduler: timeline {:?} complete", id);
            false
        }
    }
}

pub(crate) struct SchedulerInner<H: TargetHost> {
    host: Rc<H>,
    clock: Box<dyn FrameClock>,
    timelines: SlotMap<TimelineId, TimelineState<H::Target>>,
    /// Timelines evaluated each frame, in activation order
    active: Vec<TimelineId>,
    listeners: SlotMap<FrameListenerId, FrameListener>,
    tick_handle: Option<TickHandle>,
}

type Shared<H> = Rc<RefCell<SchedulerInner<H>>>;

/// The frame scheduler
///
/// Cloning is cheap and shares the same state.
pub struct Scheduler<H: TargetHost + 'static> {
    inner: Shared<H>,
}

impl<H: TargetHost + 'static> Scheduler<H> {
    pub fn new(host: H, clock: impl FrameClock + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                host: Rc::new(host),
                clock: Box::new(clock),
                timelines: SlotMap::with_key(),
                active: Vec::new(),
                listeners: SlotMap::with_key(),
                tick_handle: None,
            })),
        }
    }

    /// Get a weak handle to this scheduler
    pub fn handle(&self) -> SchedulerHandle<H> {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The host values are read from and written to
    pub fn host(&self) -> Rc<H> {
        Rc::clone(&self.inner.borrow().host)
    }

    /// Create an empty timeline
    ///
    /// The timeline lives until its handle is dropped.
    pub fn create_timeline(&self, config: TimelineConfig<H::Target>) -> TimelineHandle<H> {
        let id = self
            .inner
            .borrow_mut()
            .timelines
            .insert(TimelineState::new(config));
        tracing::debug!("Scheduler: created timeline {:?}", id);
        TimelineHandle::new(id, self.handle())
    }

    /// Evaluate one frame at `timestamp` (ms)
    ///
    /// Normally called by the clock; exposed for hosts that drive frames
    /// themselves.
    pub fn tick(&self, timestamp: f64) {
        run_frame(&self.inner, timestamp);
    }

    /// Register a callback invoked with each frame's timestamp after all
    /// timelines were evaluated
    ///
    /// Listeners do not keep the frame loop running on their own.
    pub fn add_frame_listener(&self, f: impl Fn(f64) + 'static) -> FrameListenerId {
        self.inner.borrow_mut().listeners.insert(Rc::new(f))
    }

    pub fn remove_frame_listener(&self, id: FrameListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id).is_some()
    }

    /// Remove a timeline regardless of its state
    pub fn remove_timeline(&self, id: TimelineId) -> bool {
        remove_timeline(&self.inner, id)
    }

    pub fn timeline_count(&self) -> usize {
        self.inner.borrow().timelines.len()
    }

    /// Number of timelines evaluated each frame (running or paused)
    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    pub fn has_active_timelines(&self) -> bool {
        !self.inner.borrow().active.is_empty()
    }

    /// Whether a frame is currently requested from the clock
    pub fn is_armed(&self) -> bool {
        self.inner.borrow().tick_handle.is_some()
    }
}

impl<H: TargetHost + 'static> Clone for Scheduler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Weak handle to a [`Scheduler`]
///
/// Operations on a dropped scheduler are no-ops, or fail with
/// [`AnimationError::SchedulerDropped`] where a result is expected.
pub struct SchedulerHandle<H: TargetHost + 'static> {
    inner: Weak<RefCell<SchedulerInner<H>>>,
}

impl<H: TargetHost + 'static> Clone for SchedulerHandle<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<H: TargetHost + 'static> SchedulerHandle<H> {
    fn upgrade(&self) -> Result<Shared<H>> {
        self.inner.upgrade().ok_or(AnimationError::SchedulerDropped)
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Append an entry to a timeline
    ///
    /// Entries added after the timeline was first activated are merged into
    /// its running composition right away.
    pub fn add_entry(&self, id: TimelineId, entry: Entry<H::Target>) -> Result<()> {
        let shared = self.upgrade()?;
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        let timeline = inner
            .timelines
            .get_mut(id)
            .ok_or(AnimationError::TimelineNotFound)?;
        timeline.runtime.push(entry);
        if timeline.initialized {
            timeline.sync(&*inner.host);
        }
        Ok(())
    }

    /// Start or resume a timeline
    pub fn play(&self, id: TimelineId) -> Result<Completion> {
        let shared = self.upgrade()?;
        play(&shared, id)
    }

    pub fn pause(&self, id: TimelineId) -> Result<()> {
        let shared = self.upgrade()?;
        let mut inner = shared.borrow_mut();
        let timeline = inner
            .timelines
            .get_mut(id)
            .ok_or(AnimationError::TimelineNotFound)?;
        if timeline.state == PlayState::Running {
            timeline.state = PlayState::Paused;
            tracing::debug!("Scheduler: timeline {:?} paused", id);
        }
        Ok(())
    }

    /// Deregister a timeline, keeping its progress
    pub fn stop(&self, id: TimelineId) -> Result<()> {
        let shared = self.upgrade()?;
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        let timeline = inner
            .timelines
            .get_mut(id)
            .ok_or(AnimationError::TimelineNotFound)?;
        if matches!(timeline.state, PlayState::Running | PlayState::Paused) {
            timeline.state = PlayState::Stopped;
            timeline.start_time = None;
            timeline.last_frame = None;
            inner.active.retain(|active| *active != id);
            disarm_if_idle(inner);
            tracing::debug!("Scheduler: timeline {:?} stopped", id);
        }
        Ok(())
    }

    /// Jump to `percent` (0 to 100) of the timeline's length
    pub fn seek(&self, id: TimelineId, percent: f64) -> Result<()> {
        let shared = self.upgrade()?;
        seek(&shared, id, |end| end * percent.clamp(0.0, 100.0) / 100.0)
    }

    /// Jump to `time_ms` on the timeline
    pub fn seek_time(&self, id: TimelineId, time_ms: f64) -> Result<()> {
        let shared = self.upgrade()?;
        seek(&shared, id, |_| time_ms)
    }

    pub fn state(&self, id: TimelineId) -> Option<PlayState> {
        let shared = self.inner.upgrade()?;
        let inner = shared.borrow();
        inner.timelines.get(id).map(|timeline| timeline.state)
    }

    /// Progress through the current iteration (0.0 to 1.0)
    pub fn progress(&self, id: TimelineId) -> Option<f64> {
        let shared = self.inner.upgrade()?;
        let inner = shared.borrow();
        inner.timelines.get(id).map(|timeline| timeline.progress())
    }

    /// Timeline length in milliseconds
    ///
    /// Composes pending entries first, which resolves their targets.
    pub fn duration(&self, id: TimelineId) -> Option<f64> {
        let shared = self.inner.upgrade()?;
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        let timeline = inner.timelines.get_mut(id)?;
        timeline.sync(&*inner.host);
        Some(timeline.end_time())
    }

    /// The timeline's entries, ready to nest inside another timeline
    pub fn definitions(&self, id: TimelineId) -> Option<Sequence<H::Target>> {
        let shared = self.inner.upgrade()?;
        let inner = shared.borrow();
        let timeline = inner.timelines.get(id)?;
        Some(Sequence {
            entries: timeline.runtime.entries().to_vec(),
            ..Sequence::new()
        })
    }

    pub fn remove_timeline(&self, id: TimelineId) -> bool {
        match self.inner.upgrade() {
            Some(shared) => remove_timeline(&shared, id),
            None => false,
        }
    }
}

fn play<H: TargetHost + 'static>(shared: &Shared<H>, id: TimelineId) -> Result<Completion> {
    let mut writes = FrameWrites::default();
    let mut effects = Vec::new();

    let (host, completion) = {
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        let host = Rc::clone(&inner.host);
        let timeline = inner
            .timelines
            .get_mut(id)
            .ok_or(AnimationError::TimelineNotFound)?;

        match timeline.state {
            PlayState::Running => return Ok(timeline.completion.clone()),
            PlayState::Paused => {
                tracing::debug!("Scheduler: timeline {:?} resumed", id);
            }
            PlayState::Stopped => {
                timeline.start_time = None;
                timeline.last_frame = None;
                tracing::debug!("Scheduler: timeline {:?} restarted from stop", id);
            }
            PlayState::Complete => {
                timeline.restart();
                tracing::debug!("Scheduler: timeline {:?} replaying", id);
            }
            PlayState::Idle => {}
        }

        timeline.sync(&*host);
        timeline.state = PlayState::Running;
        let completion = timeline.completion.clone();

        if timeline.end_time() <= 0.0 {
            timeline.finish_immediately(id, &*host, &mut writes, &mut effects);
            inner.active.retain(|active| *active != id);
            disarm_if_idle(inner);
            tracing::debug!("Scheduler: timeline {:?} has no duration, completed", id);
        } else {
            if !inner.active.contains(&id) {
                inner.active.push(id);
            }
            tracing::debug!(
                "Scheduler: timeline {:?} playing ({}ms)",
                id,
                timeline.end_time()
            );
            arm(shared, inner);
        }
        (host, completion)
    };

    commit(&*host, writes, effects);
    Ok(completion)
}

fn seek<H, F>(shared: &Shared<H>, id: TimelineId, at: F) -> Result<()>
where
    H: TargetHost + 'static,
    F: FnOnce(f64) -> f64,
{
    let mut writes = FrameWrites::default();
    let mut effects = Vec::new();

    let host = {
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        let host = Rc::clone(&inner.host);
        let timeline = inner
            .timelines
            .get_mut(id)
            .ok_or(AnimationError::TimelineNotFound)?;
        timeline.sync(&*host);

        let end = timeline.end_time().max(0.0);
        let t = at(end).clamp(0.0, end);
        timeline.elapsed = if timeline.reversed { end - t } else { t };
        timeline.start_time = None;
        timeline.last_frame = None;
        timeline
            .runtime
            .evaluate(t, EvalMode::Seek, &*host, &mut writes, &mut effects);
        tracing::debug!("Scheduler: timeline {:?} seeked to {}ms", id, t);
        host
    };

    commit(&*host, writes, effects);
    Ok(())
}

fn remove_timeline<H: TargetHost + 'static>(shared: &Shared<H>, id: TimelineId) -> bool {
    // A handle captured by a callback can be dropped while a frame holds the borrow
    let Ok(mut guard) = shared.try_borrow_mut() else {
        tracing::warn!("Scheduler: timeline {:?} dropped during a frame, ignoring", id);
        return false;
    };
    let inner = &mut *guard;
    let removed = inner.timelines.remove(id);
    if removed.is_some() {
        inner.active.retain(|active| *active != id);
        disarm_if_idle(inner);
        tracing::debug!("Scheduler: removed timeline {:?}", id);
    }
    // Release the borrow before the removed state drops; its callbacks may own handles
    drop(guard);
    removed.is_some()
}

/// Request the next frame unless one is already requested
fn arm<H: TargetHost + 'static>(shared: &Shared<H>, inner: &mut SchedulerInner<H>) {
    if inner.tick_handle.is_some() || inner.active.is_empty() {
        return;
    }
    let weak = Rc::downgrade(shared);
    let handle = inner.clock.schedule_next_tick(Box::new(move |timestamp| {
        if let Some(shared) = weak.upgrade() {
            run_frame(&shared, timestamp);
        }
    }));
    inner.tick_handle = Some(handle);
}

fn disarm_if_idle<H: TargetHost>(inner: &mut SchedulerInner<H>) {
    if inner.active.is_empty() {
        if let Some(handle) = inner.tick_handle.take() {
            inner.clock.cancel_tick(handle);
        }
    }
}

fn run_frame<H: TargetHost + 'static>(shared: &Shared<H>, timestamp: f64) {
    let mut writes = FrameWrites::default();
    let mut effects = Vec::new();

    let (host, listeners) = {
        let mut guard = shared.borrow_mut();
        let inner = &mut *guard;
        if let Some(handle) = inner.tick_handle.take() {
            // A manual tick replaces the pending clock frame
            inner.clock.cancel_tick(handle);
        }
        let host = Rc::clone(&inner.host);

        let active = inner.active.clone();
        let mut finished: SmallVec<[TimelineId; 4]> = SmallVec::new();
        for id in active {
            let keep = match inner.timelines.get_mut(id) {
                Some(timeline) => timeline.advance(id, timestamp, &*host, &mut writes, &mut effects),
                None => false,
            };
            if !keep {
                finished.push(id);
            }
        }
        inner.active.retain(|id| !finished.contains(id));

        // Re-arm before any callback runs
        arm(shared, inner);

        tracing::trace!(
            "Scheduler: frame {} evaluated {} timelines, {} targets written",
            timestamp,
            inner.active.len() + finished.len(),
            writes.len()
        );

        let listeners: SmallVec<[FrameListener; 4]> = inner.listeners.values().cloned().collect();
        (host, listeners)
    };

    commit(&*host, writes, effects);
    for listener in listeners {
        listener(timestamp);
    }
}

/// Apply merged writes, resolve completion signals, then run callbacks
///
/// Every signal of the frame resolves before any user callback runs, so a
/// panicking callback cannot strand a timeline that already completed.
fn commit<H: TargetHost>(host: &H, writes: FrameWrites<H::Target>, effects: Vec<Effect>) {
    for (target, batch) in &writes {
        host.write_values(target, batch);
    }
    let (resolves, callbacks): (Vec<_>, Vec<_>) = effects
        .into_iter()
        .partition(|effect| matches!(effect, Effect::Resolve(_)));
    for effect in resolves.into_iter().chain(callbacks) {
        effect.run();
    }
}
