// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Callback errors are recorded as their `Display` text.

use cadence_core::scheduler::FrameRequestId;
use cadence_core::time::{Duration, HostTime};
use cadence_core::timed::{CallbackError, TickOutcome};
use cadence_core::trace::{
    DisposeEvent, FrameRequestEvent, FrameWakeEvent, TickEvent, TickSkippedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK: u8 = 1;
const TAG_CALLBACK_ERROR: u8 = 2;
const TAG_TICK_SKIPPED: u8 = 3;
const TAG_FRAME_REQUEST: u8 = 4;
const TAG_FRAME_WAKE: u8 = 5;
const TAG_DISPOSE: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        // Messages longer than u32::MAX bytes are cut at that length.
        let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
        self.write_u32(len);
        self.buf.extend_from_slice(&s.as_bytes()[..len as usize]);
    }

    fn write_outcome(&mut self, o: TickOutcome) {
        self.write_u8(match o {
            TickOutcome::Advanced => 0,
            TickOutcome::Failed => 1,
            TickOutcome::NoCallback => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.count);
        self.write_u64(e.now.ticks());
        self.write_u64(e.delta.ticks());
        self.write_u64(e.finished.ticks());
        self.write_outcome(e.outcome);
    }

    fn on_callback_error(&mut self, count: u64, now: HostTime, error: &CallbackError) {
        self.write_u8(TAG_CALLBACK_ERROR);
        self.write_u64(count);
        self.write_u64(now.ticks());
        self.write_str(&error.get_ref().to_string());
    }

    fn on_tick_skipped(&mut self, e: &TickSkippedEvent) {
        self.write_u8(TAG_TICK_SKIPPED);
        self.write_u64(e.committed);
    }

    fn on_frame_request(&mut self, e: &FrameRequestEvent) {
        self.write_u8(TAG_FRAME_REQUEST);
        self.write_u64(e.frame_index);
        self.write_u64(e.request.0);
    }

    fn on_frame_wake(&mut self, e: &FrameWakeEvent) {
        self.write_u8(TAG_FRAME_WAKE);
        self.write_u64(e.frame_index);
        self.write_u8(u8::from(e.disposed));
    }

    fn on_dispose(&mut self, e: &DisposeEvent) {
        self.write_u8(TAG_DISPOSE);
        self.write_u64(e.frames);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// A callback failure.
    CallbackError {
        /// The `count` the failing callback saw.
        count: u64,
        /// Host time the failing tick started.
        now: HostTime,
        /// The error's `Display` text.
        message: String,
    },
    /// A [`TickSkippedEvent`].
    TickSkipped(TickSkippedEvent),
    /// A [`FrameRequestEvent`].
    FrameRequest(FrameRequestEvent),
    /// A [`FrameWakeEvent`].
    FrameWake(FrameWakeEvent),
    /// A [`DisposeEvent`].
    Dispose(DisposeEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_outcome(&mut self) -> Option<TickOutcome> {
        Some(match self.read_u8()? {
            0 => TickOutcome::Advanced,
            1 => TickOutcome::Failed,
            _ => TickOutcome::NoCallback,
        })
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            count: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            delta: Duration(self.read_u64()?),
            finished: HostTime(self.read_u64()?),
            outcome: self.read_outcome()?,
        }))
    }

    fn decode_callback_error(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CallbackError {
            count: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            message: self.read_string()?,
        })
    }

    fn decode_frame_request(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameRequest(FrameRequestEvent {
            frame_index: self.read_u64()?,
            request: FrameRequestId(self.read_u64()?),
        }))
    }

    fn decode_frame_wake(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameWake(FrameWakeEvent {
            frame_index: self.read_u64()?,
            disposed: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK => self.decode_tick(),
            TAG_CALLBACK_ERROR => self.decode_callback_error(),
            TAG_TICK_SKIPPED => Some(RecordedEvent::TickSkipped(TickSkippedEvent {
                committed: self.read_u64()?,
            })),
            TAG_FRAME_REQUEST => self.decode_frame_request(),
            TAG_FRAME_WAKE => self.decode_frame_wake(),
            TAG_DISPOSE => Some(RecordedEvent::Dispose(DisposeEvent {
                frames: self.read_u64()?,
            })),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
