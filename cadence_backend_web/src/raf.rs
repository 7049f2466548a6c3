// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` refresh notifications.
//!
//! [`RafScheduler`] implements [`FrameScheduler`] by handing each callback to
//! the browser's `requestAnimationFrame`. Every request gets its own one-shot
//! JS closure, freed by `wasm-bindgen` after it runs, so nothing has to be
//! stored between frames. The browser passes a [`DOMHighResTimeStamp`][mdn]
//! to the closure; it is ignored here because ticks read their own
//! [`Clock`](cadence_core::clock::Clock).
//!
//! Requests are never cancelled: the driver stops by not re-requesting.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use core::cell::Cell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use cadence_core::scheduler::{FrameCallback, FrameRequestId, FrameScheduler};

// Bound as globals, so no `Window` or `Performance` lookup happens per frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;
}

/// A [`FrameScheduler`] backed by `requestAnimationFrame`.
#[derive(Default)]
pub struct RafScheduler {
    /// The id returned by the most recent `requestAnimationFrame` call.
    last_id: Cell<i32>,
    /// Total requests made through this scheduler.
    requested: Cell<u64>,
}

impl RafScheduler {
    /// Creates a scheduler. Nothing is requested until the first
    /// [`request_frame`](FrameScheduler::request_frame).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of frames requested so far.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested.get()
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let closure = Closure::once_into_js(move |_timestamp_ms: f64| callback());
        let id = request_animation_frame(&closure);
        self.last_id.set(id);
        self.requested.set(self.requested.get() + 1);
        request_id(id)
    }
}

/// Maps a browser request handle to a [`FrameRequestId`].
///
/// Handles are positive `long`s; anything else maps to zero.
pub(crate) fn request_id(raw: i32) -> FrameRequestId {
    FrameRequestId(u64::try_from(raw).unwrap_or_default())
}

impl core::fmt::Debug for RafScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafScheduler")
            .field("last_id", &self.last_id.get())
            .field("requested", &self.requested.get())
            .finish()
    }
}
