// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock abstraction.
//!
//! A [`Clock`] hands out monotonic [`HostTime`] readings together with the
//! [`Timebase`] that turns its ticks into nanoseconds. Backends provide the
//! real clocks (`performance.now()` on the web); [`SystemClock`] covers
//! `std` targets and [`ManualClock`](crate::manual::ManualClock) covers
//! tests.
//!
//! Readings are best-effort. Nothing here corrects drift or promises
//! wall-clock precision.

use alloc::rc::Rc;

use crate::time::{HostTime, Timebase};

/// A source of monotonic host time.
pub trait Clock {
    /// Returns the current host time.
    fn now(&self) -> HostTime;

    /// Returns the ticks → nanoseconds factor for readings of this clock.
    fn timebase(&self) -> Timebase;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> HostTime {
        (**self).now()
    }

    fn timebase(&self) -> Timebase {
        (**self).timebase()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> HostTime {
        (**self).now()
    }

    fn timebase(&self) -> Timebase {
        (**self).timebase()
    }
}

/// A [`Clock`] backed by [`std::time::Instant`], in nanosecond ticks.
///
/// Readings are relative to the moment the clock was created, so the first
/// reading is close to zero.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Creates a clock whose zero is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> HostTime {
        let nanos = self.origin.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn timebase(&self) -> Timebase {
        Timebase::NANOS
    }
}
