// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timed callbacks and refresh-driven tick loops for UI hosts.
//!
//! `cadence_core` is `no_std` compatible (with `alloc`). It owns no event
//! loop: the host supplies a clock and a "run this before the next display
//! refresh" primitive, and this crate turns a user callback into a ticking,
//! stateful animation loop on top of them.
//!
//! # Architecture
//!
//! ```text
//!   user callback ──► TimedCallback::new ──► TimedCallback::tick()
//!                          ▲                        │
//!                        Clock                      ▼
//!                                         TimedEvent { count, delta, user_data, .. }
//!
//!   AnimationFrame::attach ──► FrameScheduler::request_frame ──► on refresh:
//!                                     ▲                            cancelled? stop
//!                                     └──────── re-request ◄────── tick()
//! ```
//!
//! **[`timed`]**: [`TimedCallback`](timed::TimedCallback) wraps a callback
//! with timing metadata (first/count/start/previous/now/delta) and
//! carried-forward user data. Failed ticks leave state untouched.
//!
//! **[`driver`]**: [`AnimationFrame`](driver::AnimationFrame) ticks a wrapper
//! on every refresh notification until disposed or dropped.
//!
//! **[`clock`]** and **[`scheduler`]**: the host seams, as the
//! [`Clock`](clock::Clock) and [`FrameScheduler`](scheduler::FrameScheduler)
//! traits, plus the [`CancelToken`](scheduler::CancelToken) the loop checks.
//!
//! **[`manual`]**: deterministic clock and scheduler for tests and headless
//! hosts.
//!
//! **[`time`]**: host time, durations and timebase conversion.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) handle.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables [`SystemClock`](clock::SystemClock).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod driver;
pub mod manual;
pub mod scheduler;
pub mod time;
pub mod timed;
pub mod trace;
