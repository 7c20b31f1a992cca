//! Frame clocks
//!
//! The engine does not own a timer. It asks a [`FrameClock`] for the next
//! frame callback and receives an opaque, increasing timestamp (ms) when it
//! fires. A platform implements this on top of its display-refresh callback;
//! [`ManualClock`] lets callers drive frames by hand.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle to a pending frame request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// One-shot frame callback, invoked with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// The driving clock contract
pub trait FrameClock {
    /// Request `callback` to run on the next frame
    fn schedule_next_tick(&self, callback: FrameCallback) -> TickHandle;

    /// Cancel a pending request; unknown handles are ignored
    fn cancel_tick(&self, handle: TickHandle);
}

struct ManualClockInner {
    now: f64,
    next_id: u64,
    pending: Vec<(TickHandle, FrameCallback)>,
}

/// A clock advanced explicitly by the caller
///
/// Clones share the same pending queue.
#[derive(Clone)]
pub struct ManualClock {
    inner: Rc<RefCell<ManualClockInner>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ManualClockInner {
                now: 0.0,
                next_id: 0,
                pending: Vec::new(),
            })),
        }
    }

    /// Current timestamp
    pub fn now(&self) -> f64 {
        self.inner.borrow().now
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Fire a frame at `timestamp`
    ///
    /// Runs every callback pending at the time of the call. Callbacks
    /// scheduled while firing wait for the next frame. Returns the number
    /// of callbacks run.
    pub fn advance_to(&self, timestamp: f64) -> usize {
        let due = {
            let mut inner = self.inner.borrow_mut();
            inner.now = timestamp;
            std::mem::take(&mut inner.pending)
        };
        let count = due.len();
        for (_, callback) in due {
            callback(timestamp);
        }
        count
    }

    /// Fire a frame `dt_ms` after the current timestamp
    pub fn advance_by(&self, dt_ms: f64) -> usize {
        let next = self.now() + dt_ms;
        self.advance_to(next)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualClock {
    fn schedule_next_tick(&self, callback: FrameCallback) -> TickHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = TickHandle(inner.next_id);
        inner.next_id += 1;
        inner.pending.push((handle, callback));
        handle
    }

    fn cancel_tick(&self, handle: TickHandle) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|(pending, _)| *pending != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_advance_runs_pending_callbacks_once() {
        let clock = ManualClock::new();
        let seen = Rc::new(Cell::new(0.0));
        let seen_clone = Rc::clone(&seen);
        clock.schedule_next_tick(Box::new(move |ts| seen_clone.set(ts)));

        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.advance_to(16.0), 1);
        assert_eq!(seen.get(), 16.0);
        assert_eq!(clock.advance_to(32.0), 0);
    }

    #[test]
    fn test_cancel_removes_request() {
        let clock = ManualClock::new();
        let handle = clock.schedule_next_tick(Box::new(|_| panic!("cancelled tick fired")));
        clock.cancel_tick(handle);
        assert_eq!(clock.advance_by(16.0), 0);
    }

    #[test]
    fn test_rescheduling_waits_for_next_frame() {
        let clock = ManualClock::new();
        let inner_clock = clock.clone();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        clock.schedule_next_tick(Box::new(move |_| {
            count_clone.set(count_clone.get() + 1);
            let count_again = Rc::clone(&count_clone);
            inner_clock.schedule_next_tick(Box::new(move |_| {
                count_again.set(count_again.get() + 1)
            }));
        }));

        clock.advance_by(16.0);
        assert_eq!(count.get(), 1);
        clock.advance_by(16.0);
        assert_eq!(count.get(), 2);
    }
}
