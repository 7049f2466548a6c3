// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for cadence.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafScheduler`]: `requestAnimationFrame` refresh notifications
//! - [`PerformanceClock`]: `performance.now()` in microsecond ticks
//! - [`animation_frame`] / [`timed_callback`]: the two entry points wired to
//!   both

#![no_std]

mod raf;

pub use raf::RafScheduler;

use cadence_core::clock::Clock;
use cadence_core::driver::AnimationFrame;
use cadence_core::time::{HostTime, Timebase};
use cadence_core::timed::{TickResult, TimedCallback, TimedEvent};

/// A refresh-driven tick loop running on the browser's frame clock.
pub type WebAnimationFrame<T> = AnimationFrame<T, PerformanceClock, RafScheduler>;

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks. Use [`timebase`] to
/// convert to nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    millis_to_host_time(raf::performance_now())
}

/// Returns the web [`Timebase`]: 1 tick = 1 µs = 1000 ns.
#[must_use]
pub fn timebase() -> Timebase {
    Timebase::MICROS
}

/// Converts a `DOMHighResTimeStamp` (fractional milliseconds) to microsecond
/// ticks. Negative and NaN inputs map to zero.
#[must_use]
pub fn millis_to_host_time(ms: f64) -> HostTime {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "performance.now() returns small positive f64; µs fits in u64"
    )]
    let us = (ms * 1000.0) as u64;
    HostTime(us)
}

/// A [`Clock`] reading `performance.now()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> HostTime {
        now()
    }

    fn timebase(&self) -> Timebase {
        timebase()
    }
}

/// Ticks `callback` on every animation frame until the returned handle is
/// dropped or disposed.
pub fn animation_frame<T, F, R>(callback: F, initial_user_data: T) -> WebAnimationFrame<T>
where
    T: Clone + 'static,
    F: FnMut(&mut TimedEvent<T>) -> R + 'static,
    R: TickResult,
{
    AnimationFrame::attach(
        RafScheduler::new(),
        PerformanceClock,
        callback,
        initial_user_data,
    )
}

/// Wraps `callback` for manual ticking (e.g. from a `setInterval` handler).
pub fn timed_callback<T, F, R>(callback: F, initial_user_data: T) -> TimedCallback<T, PerformanceClock>
where
    T: Clone,
    F: FnMut(&mut TimedEvent<T>) -> R + 'static,
    R: TickResult,
{
    TimedCallback::new(PerformanceClock, callback, initial_user_data)
}
