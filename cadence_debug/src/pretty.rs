// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! and deltas are converted to microseconds using a [`Timebase`].

use std::io::Write;

use cadence_core::time::{HostTime, Timebase};
use cadence_core::timed::{CallbackError, TickOutcome};
use cadence_core::trace::{
    DisposeEvent, FrameRequestEvent, FrameWakeEvent, TickEvent, TickSkippedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

fn outcome_name(outcome: TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Advanced => "ok",
        TickOutcome::Failed => "FAILED",
        TickOutcome::NoCallback => "none",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] count={} now={:.1}µs delta={:.1}µs took={:.1}µs {}",
            e.count,
            self.host_us(e.now),
            self.ticks_to_us(e.delta.ticks()),
            self.ticks_to_us(e.finished.saturating_duration_since(e.now).ticks()),
            outcome_name(e.outcome),
        );
    }

    fn on_callback_error(&mut self, count: u64, now: HostTime, error: &CallbackError) {
        let _ = writeln!(
            self.writer,
            "[error] count={count} at {:.1}µs: {}",
            self.host_us(now),
            error.get_ref(),
        );
    }

    fn on_tick_skipped(&mut self, e: &TickSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] no callback, committed={}",
            e.committed
        );
    }

    fn on_frame_request(&mut self, e: &FrameRequestEvent) {
        let _ = writeln!(
            self.writer,
            "[request] frame={} id={}",
            e.frame_index, e.request.0,
        );
    }

    fn on_frame_wake(&mut self, e: &FrameWakeEvent) {
        let state = if e.disposed { "idle" } else { "live" };
        let _ = writeln!(self.writer, "[wake] frame={} {state}", e.frame_index);
    }

    fn on_dispose(&mut self, e: &DisposeEvent) {
        let _ = writeln!(self.writer, "[dispose] after {} frames", e.frames);
    }
}
