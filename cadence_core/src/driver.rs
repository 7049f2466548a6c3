// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Refresh-driven tick loop.
//!
//! [`AnimationFrame`] runs a [`TimedCallback`] once per host refresh
//! notification until it is disposed. It registers a handler with the
//! [`FrameScheduler`] that, on every notification:
//!
//! 1. checks the [`CancelToken`] and returns if it is set;
//! 2. requests the next notification;
//! 3. runs one tick.
//!
//! The next frame is requested *before* the tick, so a slow or failing
//! callback never breaks the chain. Tick outcomes are traced but otherwise
//! ignored: a callback that fails every frame keeps being scheduled.
//!
//! Disposal (explicit [`dispose`](AnimationFrame::dispose) or dropping the
//! handle) only sets the token. The request already queued with the host is
//! not retracted, so at most one more notification wakes the handler, which
//! sees the token and does nothing. That wake-up also releases the last
//! reference the scheduler held to the driver state.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::clock::Clock;
use crate::scheduler::{CancelToken, FrameScheduler};
use crate::timed::{TickResult, TimedCallback, TimedEvent};
use crate::trace::{DisposeEvent, FrameRequestEvent, FrameWakeEvent, Tracer};

struct DriverInner<T, C, S> {
    /// Created once per attach; survives callback swaps.
    timed: RefCell<TimedCallback<T, C>>,
    scheduler: S,
    token: CancelToken,
    /// Notifications received, including post-disposal wakes.
    wakes: Cell<u64>,
    /// Notifications that ran a tick.
    frames: Cell<u64>,
    tracer: Tracer,
}

/// Handle to a running refresh-driven tick loop.
///
/// The loop lives as long as the handle: dropping it disposes the loop, the
/// way unmounting a component tears down its effects.
///
/// # Panics
///
/// [`set_callback`](Self::set_callback), [`clear_callback`](Self::clear_callback)
/// and [`with_timed`](Self::with_timed) borrow the wrapper and panic if called
/// from inside the callback while it is running. Use the
/// [`CancelToken`] to stop the loop from inside the callback.
pub struct AnimationFrame<T, C, S>
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    inner: Rc<DriverInner<T, C, S>>,
}

impl<T, C, S> AnimationFrame<T, C, S>
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    /// Wraps `callback` and starts ticking it on every refresh notification.
    ///
    /// The first notification is requested immediately; the first tick runs
    /// when the host delivers it.
    pub fn attach<F, R>(scheduler: S, clock: C, callback: F, initial_user_data: T) -> Self
    where
        F: FnMut(&mut TimedEvent<T>) -> R + 'static,
        R: TickResult,
    {
        Self::attach_traced(scheduler, clock, callback, initial_user_data, Tracer::none())
    }

    /// Like [`attach`](Self::attach), reporting ticks and frame events to
    /// `tracer`.
    pub fn attach_traced<F, R>(
        scheduler: S,
        clock: C,
        callback: F,
        initial_user_data: T,
        tracer: Tracer,
    ) -> Self
    where
        F: FnMut(&mut TimedEvent<T>) -> R + 'static,
        R: TickResult,
    {
        let timed = TimedCallback::new(clock, callback, initial_user_data).with_tracer(tracer);
        Self::from_timed(scheduler, timed)
    }

    /// Starts ticking an existing wrapper. Its tracer is reused for frame
    /// events.
    pub fn from_timed(scheduler: S, timed: TimedCallback<T, C>) -> Self {
        let tracer = timed.tracer().clone();
        let inner = Rc::new(DriverInner {
            timed: RefCell::new(timed),
            scheduler,
            token: CancelToken::new(),
            wakes: Cell::new(0),
            frames: Cell::new(0),
            tracer,
        });
        request_next(&inner);
        Self { inner }
    }

    /// Replaces the callback without resetting timing state.
    pub fn set_callback<F, R>(&self, callback: F)
    where
        F: FnMut(&mut TimedEvent<T>) -> R + 'static,
        R: TickResult,
    {
        self.inner.timed.borrow_mut().set_callback(callback);
    }

    /// Removes the callback. The loop keeps running; ticks become no-ops.
    pub fn clear_callback(&self) {
        self.inner.timed.borrow_mut().clear_callback();
    }

    /// Stops the loop. Idempotent.
    ///
    /// The notification already requested from the host still arrives and is
    /// ignored.
    pub fn dispose(&self) {
        if self.inner.token.cancel() {
            self.inner.tracer.dispose(&DisposeEvent {
                frames: self.inner.frames.get(),
            });
        }
    }

    /// Returns `true` once the loop has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// A clone of the loop's cancellation token.
    ///
    /// Cancelling it stops the loop like [`dispose`](Self::dispose), without
    /// emitting a dispose trace event.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.token.clone()
    }

    /// Refresh notifications that ran a tick.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.inner.frames.get()
    }

    /// Ticks committed by the wrapper.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner.timed.borrow().count()
    }

    /// Runs `f` with shared access to the wrapper.
    pub fn with_timed<U>(&self, f: impl FnOnce(&TimedCallback<T, C>) -> U) -> U {
        f(&self.inner.timed.borrow())
    }
}

fn request_next<T, C, S>(inner: &Rc<DriverInner<T, C, S>>)
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    let next = Rc::clone(inner);
    let request = inner
        .scheduler
        .request_frame(Box::new(move || on_frame(&next)));
    inner.tracer.frame_request(&FrameRequestEvent {
        frame_index: inner.wakes.get(),
        request,
    });
}

fn on_frame<T, C, S>(inner: &Rc<DriverInner<T, C, S>>)
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    let frame_index = inner.wakes.get();
    inner.wakes.set(frame_index + 1);

    let disposed = inner.token.is_cancelled();
    inner.tracer.frame_wake(&FrameWakeEvent {
        frame_index,
        disposed,
    });
    if disposed {
        return;
    }

    request_next(inner);
    inner.frames.set(inner.frames.get() + 1);
    let _ = inner.timed.borrow_mut().tick();
}

impl<T, C, S> Drop for AnimationFrame<T, C, S>
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T, C, S> fmt::Debug for AnimationFrame<T, C, S>
where
    T: Clone + 'static,
    C: Clock + 'static,
    S: FrameScheduler + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationFrame")
            .field("disposed", &self.inner.token.is_cancelled())
            .field("wakes", &self.inner.wakes.get())
            .field("frames", &self.inner.frames.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::manual::{ManualClock, ManualScheduler};
    use crate::time::{Duration, HostTime};

    fn counting(
        sched: &ManualScheduler,
        clock: &ManualClock,
    ) -> (
        AnimationFrame<u32, ManualClock, ManualScheduler>,
        Rc<Cell<u32>>,
    ) {
        let ticks = Rc::new(Cell::new(0));
        let t = Rc::clone(&ticks);
        let driver = AnimationFrame::attach(
            sched.clone(),
            clock.clone(),
            move |e: &mut TimedEvent<u32>| {
                t.set(t.get() + 1);
                e.user_data += 1;
            },
            0,
        );
        (driver, ticks)
    }

    #[test]
    fn attach_requests_first_frame_without_ticking() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let (driver, ticks) = counting(&sched, &clock);

        assert_eq!(sched.pending(), 1);
        assert_eq!(ticks.get(), 0);
        assert_eq!(driver.frames(), 0);
    }

    #[test]
    fn ticks_once_per_notification() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let (driver, ticks) = counting(&sched, &clock);

        for frame in 1..=10 {
            clock.advance(Duration(16));
            assert_eq!(sched.fire(), 1);
            assert_eq!(ticks.get(), frame);
            assert_eq!(sched.pending(), 1, "next frame is always queued");
        }
        assert_eq!(driver.frames(), 10);
        assert_eq!(driver.count(), 10);
        assert_eq!(driver.with_timed(|t| *t.user_data()), 10);
    }

    #[test]
    fn next_frame_is_requested_before_the_tick_runs() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let pending_during_tick = Rc::new(RefCell::new(Vec::new()));
        let (s, p) = (sched.clone(), Rc::clone(&pending_during_tick));
        let _driver = AnimationFrame::attach(
            sched.clone(),
            clock,
            move |_: &mut TimedEvent<()>| p.borrow_mut().push(s.pending()),
            (),
        );

        sched.fire();
        sched.fire();
        assert_eq!(*pending_during_tick.borrow(), [1, 1]);
    }

    #[test]
    fn failing_callback_keeps_being_scheduled() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let driver = AnimationFrame::attach(
            sched.clone(),
            clock,
            move |_: &mut TimedEvent<()>| -> Result<(), &'static str> {
                c.set(c.get() + 1);
                Err("always")
            },
            (),
        );

        for _ in 0..4 {
            sched.fire();
        }
        assert_eq!(calls.get(), 4);
        assert_eq!(driver.frames(), 4);
        assert_eq!(driver.count(), 0, "no tick ever committed");
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn dispose_allows_at_most_one_idle_wake() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let (driver, ticks) = counting(&sched, &clock);

        sched.fire();
        sched.fire();
        driver.dispose();
        assert!(driver.is_disposed());
        driver.dispose();

        assert_eq!(sched.pending(), 1, "in-flight request is not retracted");
        assert_eq!(sched.fire(), 1, "one idle wake");
        assert_eq!(ticks.get(), 2, "idle wake runs no tick");
        assert_eq!(sched.pending(), 0, "idle wake does not re-request");
        assert_eq!(sched.fire(), 0);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn dropping_the_handle_disposes_and_frees_state() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let marker = Rc::new(());
        let driver = AnimationFrame::attach(
            sched.clone(),
            clock,
            |_: &mut TimedEvent<Rc<()>>| {},
            Rc::clone(&marker),
        );
        sched.fire();
        assert!(Rc::strong_count(&marker) > 1);

        drop(driver);
        assert!(
            Rc::strong_count(&marker) > 1,
            "queued request still holds the state"
        );
        sched.fire();
        assert_eq!(Rc::strong_count(&marker), 1, "state released after idle wake");
    }

    #[test]
    fn cancel_token_stops_loop_from_inside_the_callback() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let token_slot: Rc<RefCell<Option<CancelToken>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&token_slot);
        let driver = AnimationFrame::attach(
            sched.clone(),
            clock,
            move |e: &mut TimedEvent<()>| {
                if e.count() == 3
                    && let Some(token) = slot.borrow().as_ref()
                {
                    token.cancel();
                }
            },
            (),
        );
        *token_slot.borrow_mut() = Some(driver.cancel_token());

        for _ in 0..6 {
            sched.fire();
        }
        assert_eq!(driver.frames(), 3);
        assert!(driver.is_disposed());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn swapping_callback_keeps_the_wrapper() {
        let sched = ManualScheduler::new();
        let clock = ManualClock::new();
        let (driver, ticks) = counting(&sched, &clock);
        clock.set(HostTime(10));
        sched.fire();
        sched.fire();

        let seen = Rc::new(Cell::new((0, false)));
        let s = Rc::clone(&seen);
        driver.set_callback(move |e: &mut TimedEvent<u32>| s.set((e.count(), e.first())));
        sched.fire();

        assert_eq!(ticks.get(), 2, "old callback no longer runs");
        assert_eq!(seen.get(), (3, false));
        assert_eq!(driver.with_timed(|t| t.start()), HostTime(0));

        driver.clear_callback();
        sched.fire();
        assert_eq!(driver.frames(), 4);
        assert_eq!(driver.count(), 3);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_sees_requests_wakes_and_disposal() {
        use crate::trace::{TickEvent, TraceSink};

        #[derive(Default)]
        struct Sink {
            requests: u32,
            wakes: Vec<(u64, bool)>,
            ticks: u32,
            disposed: Vec<u64>,
        }
        impl TraceSink for Sink {
            fn on_tick(&mut self, _e: &TickEvent) {
                self.ticks += 1;
            }
            fn on_frame_request(&mut self, _e: &FrameRequestEvent) {
                self.requests += 1;
            }
            fn on_frame_wake(&mut self, e: &FrameWakeEvent) {
                self.wakes.push((e.frame_index, e.disposed));
            }
            fn on_dispose(&mut self, e: &DisposeEvent) {
                self.disposed.push(e.frames);
            }
        }

        let sink = Rc::new(RefCell::new(Sink::default()));
        let sched = ManualScheduler::new();
        let driver = AnimationFrame::attach_traced(
            sched.clone(),
            ManualClock::new(),
            |_: &mut TimedEvent<()>| {},
            (),
            Tracer::new(Rc::clone(&sink)),
        );
        sched.fire();
        sched.fire();
        drop(driver);
        sched.fire();

        let sink = sink.borrow();
        assert_eq!(sink.requests, 3);
        assert_eq!(sink.ticks, 2);
        assert_eq!(sink.wakes, [(0, false), (1, false), (2, true)]);
        assert_eq!(sink.disposed, [2]);
    }
}
