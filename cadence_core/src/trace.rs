// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for timed callbacks and frame loops.
//!
//! [`TraceSink`] has one method per event, all defaulting to no-ops, so a
//! sink only overrides what it cares about. Sinks for development live in
//! the `cadence_debug` crate.
//!
//! [`Tracer`] is the handle that instrumented code holds. It is cheap to
//! clone, so a [`TimedCallback`](crate::timed::TimedCallback) and the
//! [`AnimationFrame`](crate::driver::AnimationFrame) driving it can report
//! into the same sink. When the `trace` feature is **off**, `Tracer` is a
//! zero-sized type and every method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::scheduler::FrameRequestId;
use crate::time::{Duration, HostTime};
use crate::timed::{CallbackError, TickOutcome};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after a tick ran the user callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickEvent {
    /// The `count` the callback saw.
    pub count: u64,
    /// Host time the tick started.
    pub now: HostTime,
    /// Time since the previous successful tick.
    pub delta: Duration,
    /// Host time the callback returned.
    pub finished: HostTime,
    /// [`TickOutcome::Advanced`] or [`TickOutcome::Failed`].
    pub outcome: TickOutcome,
}

/// Emitted when a tick finds no callback installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickSkippedEvent {
    /// Ticks committed so far.
    pub committed: u64,
}

/// Emitted when the driver asks the host for the next refresh notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequestEvent {
    /// Number of notifications the driver has received so far.
    pub frame_index: u64,
    /// Host-assigned request id.
    pub request: FrameRequestId,
}

/// Emitted on every refresh notification the driver receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameWakeEvent {
    /// Notification counter, starting at zero.
    pub frame_index: u64,
    /// Whether the driver was already disposed; such a wake runs no tick.
    pub disposed: bool,
}

/// Emitted once when a driver is disposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisposeEvent {
    /// Notifications that ran a tick before disposal.
    pub frames: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from timed callbacks and frame drivers.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called after a tick ran the callback, whatever its outcome.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called when a callback failed. Followed by an [`on_tick`] with
    /// [`TickOutcome::Failed`].
    ///
    /// [`on_tick`]: Self::on_tick
    fn on_callback_error(&mut self, count: u64, now: HostTime, error: &CallbackError) {
        _ = (count, now, error);
    }

    /// Called when a tick found no callback.
    fn on_tick_skipped(&mut self, e: &TickSkippedEvent) {
        _ = e;
    }

    /// Called when the driver requests a refresh notification.
    fn on_frame_request(&mut self, e: &FrameRequestEvent) {
        _ = e;
    }

    /// Called when the driver receives a refresh notification.
    fn on_frame_wake(&mut self, e: &FrameWakeEvent) {
        _ = e;
    }

    /// Called once when [`AnimationFrame::dispose`] flips the token.
    ///
    /// [`AnimationFrame::dispose`]: crate::driver::AnimationFrame::dispose
    fn on_dispose(&mut self, e: &DisposeEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer handle
// ---------------------------------------------------------------------------

/// Shared handle to an optional [`TraceSink`].
#[derive(Clone, Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Rc<RefCell<dyn TraceSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(feature = "trace")]
macro_rules! dispatch {
    ($self:ident, |$s:ident| $body:expr) => {
        if let Some(sink) = &$self.sink {
            let mut $s = sink.borrow_mut();
            $body;
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    ///
    /// Keep a clone of the `Rc` to read the sink back afterwards.
    #[inline]
    #[must_use]
    pub fn new<S: TraceSink + 'static>(sink: Rc<RefCell<S>>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` if events reach a sink.
    ///
    /// Always `false` without the `trace` feature.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_tick(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Reports a callback failure.
    #[inline]
    pub fn callback_error(&self, count: u64, now: HostTime, error: &CallbackError) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_callback_error(count, now, error));
        #[cfg(not(feature = "trace"))]
        {
            _ = (count, now, error);
        }
    }

    /// Emits a [`TickSkippedEvent`].
    #[inline]
    pub fn tick_skipped(&self, e: &TickSkippedEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_tick_skipped(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameRequestEvent`].
    #[inline]
    pub fn frame_request(&self, e: &FrameRequestEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_frame_request(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameWakeEvent`].
    #[inline]
    pub fn frame_wake(&self, e: &FrameWakeEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_frame_wake(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DisposeEvent`].
    #[inline]
    pub fn dispose(&self, e: &DisposeEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_dispose(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
