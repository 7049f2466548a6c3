// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callbacks that know when, and how often, they run.
//!
//! [`TimedCallback`] wraps a repeating user callback. Each call to
//! [`tick`](TimedCallback::tick) reads the host [`Clock`], hands the callback
//! a [`TimedEvent`] with timing metadata and the user's carried-forward
//! state, and commits that state for the next tick if the callback succeeds.
//!
//! # Failure policy
//!
//! A callback fails by returning `Err`. Failures are swallowed and reported:
//! the tick returns [`TickOutcome::Failed`], the error goes to the
//! [`Tracer`] (if any), and the wrapper's state is left exactly as it was
//! before the tick. Nothing is retried. Panics are not caught.
//!
//! # Example
//!
//! ```
//! use cadence_core::manual::ManualClock;
//! use cadence_core::time::Duration;
//! use cadence_core::timed::TimedCallback;
//!
//! let clock = ManualClock::new();
//! let mut timed = TimedCallback::new(
//!     clock.clone(),
//!     |e| {
//!         e.user_data += e.delta_millis();
//!     },
//!     0_u64,
//! );
//!
//! assert!(timed.tick().is_advanced());
//! clock.advance(Duration(16));
//! assert!(timed.tick().is_advanced());
//! assert_eq!(*timed.user_data(), 16);
//! assert_eq!(timed.count(), 2);
//! ```

use alloc::boxed::Box;
use core::error::Error;
use core::fmt;

use crate::clock::Clock;
use crate::time::{Duration, HostTime, Timebase};
use crate::trace::{TickEvent, TickSkippedEvent, Tracer};

/// The value handed to the user callback on each tick.
///
/// Timing fields are read-only. [`user_data`](Self::user_data) is the
/// caller's slot: whatever the callback leaves there is what the next tick
/// starts from, provided this tick succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimedEvent<T> {
    first: bool,
    count: u64,
    start: HostTime,
    previous: HostTime,
    now: HostTime,
    delta: Duration,
    timebase: Timebase,
    /// Carried-forward user state.
    pub user_data: T,
}

impl<T> TimedEvent<T> {
    /// `true` only on the first tick of the wrapper's lifetime.
    #[must_use]
    pub fn first(&self) -> bool {
        self.first
    }

    /// Ticks delivered so far, including this one. Starts at 1.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Clock reading when the wrapper was created.
    #[must_use]
    pub fn start(&self) -> HostTime {
        self.start
    }

    /// Clock reading at the previous successful tick, or [`start`] on the
    /// first tick.
    ///
    /// [`start`]: Self::start
    #[must_use]
    pub fn previous(&self) -> HostTime {
        self.previous
    }

    /// Clock reading at this tick.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.now
    }

    /// `now - previous` in clock ticks, zero if the clock went backwards.
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// [`delta`](Self::delta) in whole milliseconds.
    #[must_use]
    pub fn delta_millis(&self) -> u64 {
        self.delta.to_millis(self.timebase)
    }

    /// `now - start` in clock ticks.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.now.saturating_duration_since(self.start)
    }

    /// The clock's tick → nanosecond factor.
    #[must_use]
    pub fn timebase(&self) -> Timebase {
        self.timebase
    }
}

/// What a single tick did.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// The callback succeeded and the wrapper state moved forward.
    Advanced,
    /// The callback returned an error; state is unchanged.
    Failed,
    /// No callback was installed; the clock was not read.
    NoCallback,
}

impl TickOutcome {
    /// Returns `true` for [`TickOutcome::Advanced`].
    #[must_use]
    pub const fn is_advanced(self) -> bool {
        matches!(self, Self::Advanced)
    }
}

impl From<TickOutcome> for bool {
    fn from(outcome: TickOutcome) -> Self {
        outcome.is_advanced()
    }
}

/// A failure returned by a user callback.
#[derive(Debug)]
pub struct CallbackError {
    source: Box<dyn Error + 'static>,
}

impl CallbackError {
    /// Wraps an error value, string, or boxed error.
    pub fn new(error: impl Into<Box<dyn Error + 'static>>) -> Self {
        Self {
            source: error.into(),
        }
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn Error + 'static) {
        &*self.source
    }

    /// Consumes `self`, returning the wrapped error.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Error + 'static> {
        self.source
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed callback failed: {}", self.source)
    }
}

impl Error for CallbackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// Return types accepted from a timed callback.
///
/// `()` never fails. `Result<(), E>` fails on `Err`, for any `E` that boxes
/// into a `dyn Error` (error types, `&str`, `String`).
pub trait TickResult {
    /// Normalizes the callback's return value.
    fn into_tick_result(self) -> Result<(), CallbackError>;
}

impl TickResult for () {
    #[inline]
    fn into_tick_result(self) -> Result<(), CallbackError> {
        Ok(())
    }
}

impl<E: Into<Box<dyn Error + 'static>>> TickResult for Result<(), E> {
    #[inline]
    fn into_tick_result(self) -> Result<(), CallbackError> {
        self.map_err(CallbackError::new)
    }
}

type BoxedCallback<T> = Box<dyn FnMut(&mut TimedEvent<T>) -> Result<(), CallbackError>>;

fn boxed<T, F, R>(mut callback: F) -> BoxedCallback<T>
where
    F: FnMut(&mut TimedEvent<T>) -> R + 'static,
    R: TickResult,
{
    Box::new(move |event: &mut TimedEvent<T>| callback(event).into_tick_result())
}

/// Construct-once timing state. Only a successful tick writes to it.
#[derive(Clone, Debug)]
struct TickState<T> {
    start: HostTime,
    previous: HostTime,
    committed: u64,
    user_data: T,
}

impl<T: Clone> TickState<T> {
    fn new(start: HostTime, user_data: T) -> Self {
        Self {
            start,
            previous: start,
            committed: 0,
            user_data,
        }
    }

    fn event(&self, now: HostTime, timebase: Timebase) -> TimedEvent<T> {
        TimedEvent {
            first: self.committed == 0,
            count: self.committed + 1,
            start: self.start,
            previous: self.previous,
            now,
            delta: now.saturating_duration_since(self.previous),
            timebase,
            user_data: self.user_data.clone(),
        }
    }

    fn commit(&mut self, event: TimedEvent<T>) {
        self.user_data = event.user_data;
        self.previous = event.now;
        self.committed = event.count;
    }
}

/// A repeating callback with timing metadata and carried-forward state.
///
/// The timing state is created once, in [`new`](Self::new), and lives as
/// long as the wrapper. The callback lives in a separate slot that
/// [`set_callback`](Self::set_callback) overwrites in place, so swapping
/// the callback keeps `count`, `previous`, and `user_data` intact.
///
/// `T: Clone` because each tick works on a copy of the committed user data;
/// a failed tick drops the copy. Wrap large state in `Rc` to keep the copy
/// cheap.
pub struct TimedCallback<T, C> {
    clock: C,
    timebase: Timebase,
    state: TickState<T>,
    callback: Option<BoxedCallback<T>>,
    tracer: Tracer,
}

impl<T: Clone, C: Clock> TimedCallback<T, C> {
    /// Creates a wrapper, reading `start` from `clock` now.
    ///
    /// `initial_user_data` seeds the user slot once; later calls to
    /// [`set_callback`](Self::set_callback) never reseed it.
    pub fn new<F, R>(clock: C, callback: F, initial_user_data: T) -> Self
    where
        F: FnMut(&mut TimedEvent<T>) -> R + 'static,
        R: TickResult,
    {
        let mut timed = Self::empty(clock, initial_user_data);
        timed.callback = Some(boxed(callback));
        timed
    }

    /// Creates a wrapper with no callback installed. Ticks are no-ops until
    /// [`set_callback`](Self::set_callback) is called.
    pub fn empty(clock: C, initial_user_data: T) -> Self {
        let start = clock.now();
        let timebase = clock.timebase();
        Self {
            clock,
            timebase,
            state: TickState::new(start, initial_user_data),
            callback: None,
            tracer: Tracer::none(),
        }
    }

    /// Reports ticks and callback errors to `tracer`.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Replaces the current callback. Timing state is kept.
    pub fn set_callback<F, R>(&mut self, callback: F)
    where
        F: FnMut(&mut TimedEvent<T>) -> R + 'static,
        R: TickResult,
    {
        self.callback = Some(boxed(callback));
    }

    /// Removes the current callback. Subsequent ticks return
    /// [`TickOutcome::NoCallback`].
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Returns `true` if a callback is installed.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Runs the callback once.
    ///
    /// On success the event's `user_data`, `now`, and `count` become the
    /// wrapper's state. On failure, or with no callback installed, the state
    /// is untouched.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(callback) = self.callback.as_mut() else {
            self.tracer.tick_skipped(&TickSkippedEvent {
                committed: self.state.committed,
            });
            return TickOutcome::NoCallback;
        };

        let now = self.clock.now();
        let mut event = self.state.event(now, self.timebase);
        let (count, delta) = (event.count, event.delta);
        let result = callback(&mut event);
        let finished = if self.tracer.is_enabled() {
            self.clock.now()
        } else {
            now
        };

        let outcome = match result {
            Ok(()) => {
                self.state.commit(event);
                TickOutcome::Advanced
            }
            Err(error) => {
                self.tracer.callback_error(count, now, &error);
                TickOutcome::Failed
            }
        };
        self.tracer.tick(&TickEvent {
            count,
            now,
            delta,
            finished,
            outcome,
        });
        outcome
    }

    /// Turns the wrapper into a plain zero-argument tick function.
    pub fn into_tick_fn(mut self) -> impl FnMut() -> TickOutcome {
        move || self.tick()
    }

    /// Ticks committed so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.committed
    }

    /// Clock reading at creation.
    #[must_use]
    pub fn start(&self) -> HostTime {
        self.state.start
    }

    /// Clock reading at the last successful tick, or [`start`](Self::start).
    #[must_use]
    pub fn previous(&self) -> HostTime {
        self.state.previous
    }

    /// The committed user data.
    #[must_use]
    pub fn user_data(&self) -> &T {
        &self.state.user_data
    }

    /// The clock's tick → nanosecond factor.
    #[must_use]
    pub fn timebase(&self) -> Timebase {
        self.timebase
    }

    /// The tracer ticks report to.
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

impl<T: fmt::Debug, C> fmt::Debug for TimedCallback<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCallback")
            .field("timebase", &self.timebase)
            .field("state", &self.state)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::manual::ManualClock;

    /// Snapshot of what the callback saw, minus user data.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Seen {
        first: bool,
        count: u64,
        previous: HostTime,
        now: HostTime,
        delta: Duration,
    }

    fn seen<T>(e: &TimedEvent<T>) -> Seen {
        Seen {
            first: e.first(),
            count: e.count(),
            previous: e.previous(),
            now: e.now(),
            delta: e.delta(),
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<Seen>>>, impl FnMut(&mut TimedEvent<()>) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |e: &mut TimedEvent<()>| sink.borrow_mut().push(seen(e)))
    }

    #[test]
    fn count_and_first_flag_follow_successful_ticks() {
        let clock = ManualClock::new();
        let (log, callback) = recorder();
        let mut timed = TimedCallback::new(clock.clone(), callback, ());

        for _ in 0..5 {
            clock.advance(Duration(10));
            assert_eq!(timed.tick(), TickOutcome::Advanced);
        }

        let log = log.borrow();
        let counts: Vec<u64> = log.iter().map(|s| s.count).collect();
        assert_eq!(counts, [1, 2, 3, 4, 5]);
        for s in log.iter() {
            assert_eq!(s.first, s.count == 1, "first iff count == 1: {s:?}");
        }
        assert_eq!(timed.count(), 5);
    }

    #[test]
    fn previous_chains_to_prior_now() {
        let clock = ManualClock::new();
        clock.set(HostTime(100));
        let (log, callback) = recorder();
        let mut timed = TimedCallback::new(clock.clone(), callback, ());
        assert_eq!(timed.start(), HostTime(100));

        for step in [16, 17, 0, 33] {
            clock.advance(Duration(step));
            let _ = timed.tick();
        }

        let log = log.borrow();
        assert_eq!(log[0].previous, HostTime(100), "first tick chains to start");
        assert_eq!(log[0].delta, Duration(16));
        for pair in log.windows(2) {
            assert_eq!(pair[1].previous, pair[0].now);
            assert_eq!(pair[1].delta, pair[1].now - pair[0].now);
        }
        assert_eq!(log[2].delta, Duration::ZERO);
        assert_eq!(timed.previous(), HostTime(166));
    }

    #[test]
    fn user_data_increments_across_ticks() {
        let clock = ManualClock::new();
        let before = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&before);
        let mut timed = TimedCallback::new(
            clock.clone(),
            move |e: &mut TimedEvent<i32>| {
                log.borrow_mut().push((e.count(), e.first(), e.user_data));
                e.user_data += 1;
            },
            0,
        );

        assert!(timed.tick().is_advanced());
        assert_eq!(*timed.user_data(), 1);
        clock.advance(Duration(5));
        assert!(timed.tick().is_advanced());
        clock.advance(Duration(5));
        assert!(timed.tick().is_advanced());

        assert_eq!(*before.borrow(), [(1, true, 0), (2, false, 1), (3, false, 2)]);
        assert_eq!(*timed.user_data(), 3);
    }

    #[test]
    fn user_data_carries_the_last_written_value() {
        let clock = ManualClock::new();
        let written: Rc<RefCell<Option<Rc<String>>>> = Rc::new(RefCell::new(None));
        let observed: Rc<RefCell<Vec<Rc<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let (w, o) = (Rc::clone(&written), Rc::clone(&observed));

        let mut timed = TimedCallback::new(
            clock,
            move |e: &mut TimedEvent<Rc<String>>| {
                o.borrow_mut().push(Rc::clone(&e.user_data));
                let next = Rc::new(alloc::format!("tick {}", e.count()));
                *w.borrow_mut() = Some(Rc::clone(&next));
                e.user_data = next;
            },
            Rc::new(String::from("seed")),
        );

        let _ = timed.tick();
        let first_write = written.borrow().clone().unwrap();
        let _ = timed.tick();

        let observed = observed.borrow();
        assert_eq!(observed[0].as_str(), "seed");
        assert!(
            Rc::ptr_eq(&observed[1], &first_write),
            "next tick sees the exact value written by the previous one"
        );
    }

    #[test]
    fn failed_tick_leaves_state_untouched() {
        let clock = ManualClock::new();
        let mut timed = TimedCallback::new(
            clock.clone(),
            |e: &mut TimedEvent<Vec<u64>>| -> Result<(), &'static str> {
                e.user_data.push(e.count());
                if e.count() == 2 {
                    return Err("boom");
                }
                Ok(())
            },
            Vec::new(),
        );

        clock.advance(Duration(10));
        assert_eq!(timed.tick(), TickOutcome::Advanced);
        let (count, previous, data) = (timed.count(), timed.previous(), timed.user_data().clone());

        clock.advance(Duration(10));
        let outcome = timed.tick();
        assert_eq!(outcome, TickOutcome::Failed);
        assert!(!bool::from(outcome));
        assert_eq!(timed.count(), count);
        assert_eq!(timed.previous(), previous);
        assert_eq!(*timed.user_data(), data, "mutation before the error is discarded");
    }

    #[test]
    fn retry_after_failure_reuses_the_same_count() {
        let clock = ManualClock::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&calls);
        let mut timed = TimedCallback::new(
            clock.clone(),
            move |e: &mut TimedEvent<()>| -> Result<(), String> {
                log.borrow_mut().push((e.count(), e.first()));
                if log.borrow().len() == 2 {
                    return Err(String::from("second call fails"));
                }
                Ok(())
            },
            (),
        );

        assert!(timed.tick().is_advanced());
        assert!(!timed.tick().is_advanced());
        assert!(timed.tick().is_advanced());

        assert_eq!(*calls.borrow(), [(1, true), (2, false), (2, false)]);
        assert_eq!(timed.count(), 2);
    }

    #[test]
    fn swapping_the_callback_keeps_timing_state() {
        let clock = ManualClock::new();
        let mut timed = TimedCallback::new(
            clock.clone(),
            |e: &mut TimedEvent<u32>| e.user_data += 1,
            0,
        );
        let _ = timed.tick();
        let _ = timed.tick();

        let seen_count = Rc::new(RefCell::new(0));
        let sc = Rc::clone(&seen_count);
        timed.set_callback(move |e: &mut TimedEvent<u32>| {
            *sc.borrow_mut() = e.count();
            e.user_data += 100;
        });
        clock.advance(Duration(3));
        assert!(timed.tick().is_advanced());

        assert_eq!(*seen_count.borrow(), 3, "count continues across swap");
        assert_eq!(*timed.user_data(), 102);
    }

    #[test]
    fn cleared_callback_is_a_no_op() {
        let clock = ManualClock::new();
        let mut timed = TimedCallback::new(clock.clone(), |_: &mut TimedEvent<()>| {}, ());
        let _ = timed.tick();
        let previous = timed.previous();

        timed.clear_callback();
        assert!(!timed.has_callback());
        clock.advance(Duration(50));
        assert_eq!(timed.tick(), TickOutcome::NoCallback);
        assert_eq!(timed.count(), 1);
        assert_eq!(timed.previous(), previous);

        let mut empty = TimedCallback::empty(clock, 7_u8);
        assert_eq!(empty.tick(), TickOutcome::NoCallback);
        assert_eq!(*empty.user_data(), 7);
    }

    #[test]
    fn delta_reports_milliseconds_for_any_timebase() {
        let clock = ManualClock::with_timebase(Timebase::MICROS);
        let millis = Rc::new(RefCell::new(Vec::new()));
        let m = Rc::clone(&millis);
        let mut timed = TimedCallback::new(
            clock.clone(),
            move |e: &mut TimedEvent<()>| m.borrow_mut().push(e.delta_millis()),
            (),
        );

        clock.advance(Duration(16_667));
        let _ = timed.tick();
        clock.advance(Duration(999));
        let _ = timed.tick();

        assert_eq!(*millis.borrow(), [16, 0]);
        assert_eq!(timed.timebase(), Timebase::MICROS);
    }

    #[test]
    fn backwards_clock_yields_zero_delta() {
        let clock = ManualClock::new();
        clock.set(HostTime(1_000));
        let (log, callback) = recorder();
        let mut timed = TimedCallback::new(clock.clone(), callback, ());

        clock.set(HostTime(900));
        let _ = timed.tick();
        assert_eq!(log.borrow()[0].delta, Duration::ZERO);
    }

    #[test]
    fn tick_fn_is_a_plain_closure() {
        let clock = ManualClock::new();
        let mut tick = TimedCallback::new(clock, |_: &mut TimedEvent<()>| {}, ()).into_tick_fn();
        assert!(tick().is_advanced());
        assert!(tick().is_advanced());
    }

    #[test]
    fn callback_error_exposes_its_source() {
        let err = CallbackError::new("disk on fire");
        assert_eq!(alloc::format!("{err}"), "timed callback failed: disk on fire");
        assert_eq!(alloc::format!("{}", err.get_ref()), "disk on fire");
        assert!(err.source().is_some());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_sees_ticks_and_errors() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Sink {
            ticks: Vec<(u64, TickOutcome)>,
            errors: Vec<String>,
            skipped: u32,
        }
        impl TraceSink for Sink {
            fn on_tick(&mut self, e: &TickEvent) {
                self.ticks.push((e.count, e.outcome));
            }
            fn on_callback_error(&mut self, _count: u64, _now: HostTime, error: &CallbackError) {
                self.errors.push(alloc::format!("{}", error.get_ref()));
            }
            fn on_tick_skipped(&mut self, _e: &TickSkippedEvent) {
                self.skipped += 1;
            }
        }

        let sink = Rc::new(RefCell::new(Sink::default()));
        let clock = ManualClock::new();
        let mut timed = TimedCallback::new(
            clock,
            |e: &mut TimedEvent<()>| -> Result<(), &'static str> {
                if e.count() == 2 { Err("nope") } else { Ok(()) }
            },
            (),
        )
        .with_tracer(Tracer::new(Rc::clone(&sink)));

        let _ = timed.tick();
        let _ = timed.tick();
        timed.clear_callback();
        let _ = timed.tick();

        let sink = sink.borrow();
        assert_eq!(
            sink.ticks,
            [(1, TickOutcome::Advanced), (2, TickOutcome::Failed)]
        );
        assert_eq!(sink.errors, ["nope"]);
        assert_eq!(sink.skipped, 1);
    }
}
