// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic stand-ins for the host clock and refresh loop.
//!
//! [`ManualClock`] only moves when told to, and [`ManualScheduler`] only
//! delivers a refresh notification when [`fire`](ManualScheduler::fire) is
//! called. Both are cheap handles over shared state: keep one clone in the
//! test and hand another to the code under test.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::clock::Clock;
use crate::scheduler::{FrameCallback, FrameRequestId, FrameScheduler};
use crate::time::{Duration, HostTime, Timebase};

/// A [`Clock`] that advances only on request.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<HostTime>>,
    timebase: Timebase,
}

impl ManualClock {
    /// Creates a millisecond clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timebase(Timebase::MILLIS)
    }

    /// Creates a clock reading zero with the given timebase.
    #[must_use]
    pub fn with_timebase(timebase: Timebase) -> Self {
        Self {
            now: Rc::new(Cell::new(HostTime(0))),
            timebase,
        }
    }

    /// Jumps to `t`. Going backwards is allowed.
    pub fn set(&self, t: HostTime) {
        self.now.set(t);
    }

    /// Moves the clock forward by `d`, saturating at `u64::MAX`.
    pub fn advance(&self, d: Duration) {
        let now = self.now.get();
        self.now
            .set(now.checked_add(d).unwrap_or(HostTime(u64::MAX)));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        self.now.get()
    }

    fn timebase(&self) -> Timebase {
        self.timebase
    }
}

struct SchedulerInner {
    queue: RefCell<VecDeque<FrameCallback>>,
    next_id: Cell<u64>,
    notifications: Cell<u64>,
}

/// A [`FrameScheduler`] whose refresh notifications are delivered by hand.
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Rc<SchedulerInner>,
}

impl ManualScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
                next_id: Cell::new(0),
                notifications: Cell::new(0),
            }),
        }
    }

    /// Delivers one refresh notification.
    ///
    /// Every callback that was pending when `fire` was called runs exactly
    /// once, in request order. Callbacks requested while these run are kept
    /// for the next notification. Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        self.inner
            .notifications
            .set(self.inner.notifications.get() + 1);
        // Drain before running: callbacks re-enter `request_frame`.
        let batch = core::mem::take(&mut *self.inner.queue.borrow_mut());
        let ran = batch.len();
        for callback in batch {
            callback();
        }
        ran
    }

    /// Returns the number of callbacks waiting for the next notification.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Returns the total number of requests made so far.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.inner.next_id.get()
    }

    /// Returns the number of notifications delivered so far.
    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.inner.notifications.get()
    }

    /// Drops every pending callback without running it.
    pub fn clear(&self) {
        // Take first so the callbacks' destructors run without the borrow held.
        let dropped = core::mem::take(&mut *self.inner.queue.borrow_mut());
        drop(dropped);
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.queue.borrow_mut().push_back(callback);
        FrameRequestId(id)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .field("requested", &self.requested())
            .field("notifications", &self.notifications())
            .finish()
    }
}
