//! Timeline handles and completion signals

use crate::definition::{Entry, Sequence};
use crate::error::Result;
use crate::scheduler::{PlayState, SchedulerHandle, TimelineId};
use cadence_core::TargetHost;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct CompletionState {
    done: bool,
    wakers: Vec<Waker>,
}

/// Resolves when a timeline run first reaches its end
///
/// Awaitable, or pollable through [`Completion::is_complete`]. A replay after
/// completion hands out a fresh signal.
#[derive(Clone)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(CompletionState {
                done: false,
                wakers: Vec::new(),
            })),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().done
    }

    pub(crate) fn resolve(&self) {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.done {
                return;
            }
            state.done = true;
            std::mem::take(&mut state.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("done", &self.is_complete())
            .finish()
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.borrow_mut();
        if state.done {
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// Owner of one timeline
///
/// Dropping the handle removes the timeline from its scheduler.
pub struct TimelineHandle<H: TargetHost + 'static> {
    id: TimelineId,
    scheduler: SchedulerHandle<H>,
}

impl<H: TargetHost + 'static> TimelineHandle<H> {
    pub(crate) fn new(id: TimelineId, scheduler: SchedulerHandle<H>) -> Self {
        Self { id, scheduler }
    }

    pub fn id(&self) -> TimelineId {
        self.id
    }

    /// Append an entry: an animation, a group, or a nested sequence
    pub fn add(&self, entry: impl Into<Entry<H::Target>>) -> &Self {
        if let Err(err) = self.scheduler.add_entry(self.id, entry.into()) {
            tracing::debug!("TimelineHandle {:?}: add ignored: {}", self.id, err);
        }
        self
    }

    /// Append several entries in order
    pub fn add_all<I, E>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry<H::Target>>,
    {
        for entry in entries {
            self.add(entry);
        }
        self
    }

    /// Start, resume or replay
    ///
    /// Returns the signal of the current run; calling `play` on a running
    /// timeline returns the same signal and changes nothing.
    pub fn play(&self) -> Result<Completion> {
        self.scheduler.play(self.id)
    }

    /// Freeze in place; the timeline stays registered
    pub fn pause(&self) {
        if let Err(err) = self.scheduler.pause(self.id) {
            tracing::debug!("TimelineHandle {:?}: pause ignored: {}", self.id, err);
        }
    }

    /// Deregister, keeping progress; a later `play` continues from here
    pub fn stop(&self) {
        if let Err(err) = self.scheduler.stop(self.id) {
            tracing::debug!("TimelineHandle {:?}: stop ignored: {}", self.id, err);
        }
    }

    /// Show the timeline at `percent` (0 to 100) of its length
    pub fn seek(&self, percent: f64) {
        if let Err(err) = self.scheduler.seek(self.id, percent) {
            tracing::debug!("TimelineHandle {:?}: seek ignored: {}", self.id, err);
        }
    }

    /// Show the timeline at `time_ms`
    pub fn seek_time(&self, time_ms: f64) {
        if let Err(err) = self.scheduler.seek_time(self.id, time_ms) {
            tracing::debug!("TimelineHandle {:?}: seek ignored: {}", self.id, err);
        }
    }

    pub fn progress(&self) -> Option<f64> {
        self.scheduler.progress(self.id)
    }

    pub fn duration(&self) -> Option<f64> {
        self.scheduler.duration(self.id)
    }

    pub fn state(&self) -> Option<PlayState> {
        self.scheduler.state(self.id)
    }

    pub fn is_playing(&self) -> bool {
        self.state() == Some(PlayState::Running)
    }

    /// This timeline's entries, for nesting inside another timeline
    pub fn definitions(&self) -> Sequence<H::Target> {
        self.scheduler.definitions(self.id).unwrap_or_default()
    }
}

impl<H: TargetHost + 'static> Drop for TimelineHandle<H> {
    fn drop(&mut self) {
        self.scheduler.remove_timeline(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_resolves_once() {
        let completion = Completion::new();
        let observer = completion.clone();
        assert!(!observer.is_complete());
        completion.resolve();
        completion.resolve();
        assert!(observer.is_complete());
        pollster::block_on(observer);
    }
}
