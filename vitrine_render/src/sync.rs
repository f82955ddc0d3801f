// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame-synchronization hook.
//!
//! A backend that shares buffers with another process (the X server) brackets
//! each frame's GPU submission with a fence:
//!
//! ```text
//!   begin_frame()      trigger the next fence before any window is read
//!   before_paint()     make the GPU wait on it
//!   ... paint ...
//!   end_frame()        advance the ring; report the outcome
//! ```
//!
//! Failures never abort the frame. The backend reports them in
//! [`SyncReport`] and the frame goes out unsynchronized.

use vitrine_core::trace::FenceOutcome;

/// The fence outcome of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Ring slot the frame used.
    pub slot: u8,
    /// How the wait on it ended.
    pub outcome: FenceOutcome,
}

/// Brackets the GPU submission of each frame.
pub trait FrameSync {
    /// Called once damage is known and before anything is painted.
    fn begin_frame(&mut self) {}

    /// Called right before the first window is drawn.
    fn before_paint(&mut self) {}

    /// Called after the frame was submitted. Returns `None` if this frame
    /// was not synchronized at all.
    fn end_frame(&mut self) -> Option<SyncReport> {
        None
    }
}

/// A [`FrameSync`] for backends that need no synchronization.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSync;

impl FrameSync for NoSync {}
