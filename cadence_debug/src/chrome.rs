// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use cadence_core::time::Timebase;
use cadence_core::timed::TickOutcome;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Ticks become complete (`"X"`) slices spanning the callback. Frame and
/// lifecycle events carry no timestamp of their own and are placed at the
/// most recent tick time. Timestamps are converted to microseconds using the
/// provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Tick(e) => {
                last_ts = ticks_to_us(e.now.ticks(), timebase);
                let dur = e.finished.saturating_duration_since(e.now);
                events.push(json!({
                    "ph": "X",
                    "name": "Tick",
                    "cat": "Callback",
                    "ts": last_ts,
                    "dur": ticks_to_us(dur.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "count": e.count,
                        "delta_us": ticks_to_us(e.delta.ticks(), timebase),
                        "outcome": outcome_name(e.outcome),
                    }
                }));
            }
            RecordedEvent::CallbackError {
                count,
                now,
                message,
            } => {
                last_ts = ticks_to_us(now.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "CallbackError",
                    "cat": "Callback",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "count": count,
                        "message": message,
                    }
                }));
            }
            RecordedEvent::TickSkipped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TickSkipped",
                    "cat": "Callback",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "committed": e.committed,
                    }
                }));
            }
            RecordedEvent::FrameRequest(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameRequest",
                    "cat": "Driver",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "request": e.request.0,
                    }
                }));
            }
            RecordedEvent::FrameWake(e) => {
                let name = if e.disposed { "IdleWake" } else { "FrameWake" };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Driver",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Dispose(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dispose",
                    "cat": "Driver",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frames": e.frames,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

fn outcome_name(outcome: TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Advanced => "Advanced",
        TickOutcome::Failed => "Failed",
        TickOutcome::NoCallback => "NoCallback",
    }
}
