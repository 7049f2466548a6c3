// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Refresh-notification scheduling and cooperative cancellation.
//!
//! The host owns the display refresh loop. [`FrameScheduler`] is the one
//! capability we need from it: "run this once before the next display
//! update". The driver in [`crate::driver`] builds a continuous loop by
//! re-requesting from inside each callback, and stops the loop by flipping a
//! [`CancelToken`] that the next callback observes.
//!
//! Requests are never retracted. A request that is already queued when the
//! token is cancelled still fires once; it just sees the flag and returns.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

/// A one-shot callback run on the next refresh notification.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Host-assigned identifier of a pending frame request.
///
/// Opaque to core; backends may use it to correlate with platform ids
/// (e.g. the value returned by `requestAnimationFrame`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameRequestId(pub u64);

impl fmt::Debug for FrameRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameRequestId({})", self.0)
    }
}

/// Host-provided refresh-notification primitive.
///
/// Implementations must run each callback at most once, on a later refresh
/// notification, and must accept new requests made from inside a running
/// callback. Methods take `&self`; implementations use interior mutability
/// since the scheduler is shared with the callbacks it runs.
pub trait FrameScheduler {
    /// Requests that `callback` run on the next refresh notification.
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for &S {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        (**self).request_frame(callback)
    }
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for Rc<S> {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        (**self).request_frame(callback)
    }
}

/// A shared, set-once cancellation flag.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn cancel(&self) -> bool {
        !self.cancelled.replace(true)
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any
    /// clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}
