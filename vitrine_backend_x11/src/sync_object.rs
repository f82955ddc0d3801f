// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One fence shared between the X command stream and the GPU.
//!
//! ```text
//!   Ready ──trigger──► TriggerSent ──wait──► Waiting
//!     ▲                     │                   │
//!     │                     └──────finish───────┤
//!     │                                         ▼
//!   Resetting ◄──────────────reset────────────  Done
//!     │
//!     └── finish_resetting (or trigger) ──► Ready
//! ```

use vitrine_core::time::Duration;

use crate::driver::{ClientWait, GpuFences, GpuSync, ResetCookie, X11Fences, XFence};
use crate::error::SyncError;

/// Lifecycle state of a [`SyncObject`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Untriggered and reset; may be triggered.
    Ready,
    /// The trigger request was queued.
    TriggerSent,
    /// A GPU-side wait on the fence was inserted.
    Waiting,
    /// The fence was observed signaled.
    Done,
    /// A reset was sent and its round trip has not been read yet.
    Resetting,
}

/// A fence that lets GPU commands wait for the X server.
///
/// A `SyncObject` owns native handles but not the drivers that made them,
/// so it has to be handed back through [`destroy`](Self::destroy). The
/// [`SyncManager`](crate::SyncManager) does that for its ring.
#[derive(Debug)]
pub struct SyncObject {
    state: SyncState,
    fence: XFence,
    sync: GpuSync,
    reset_cookie: Option<ResetCookie>,
}

impl SyncObject {
    /// Creates a fence on the root window and imports it on the GPU.
    pub fn new(x: &mut impl X11Fences, gpu: &mut impl GpuFences) -> Self {
        let fence = x.create_fence();
        x.flush();
        let sync = gpu.import_fence(fence);
        Self {
            state: SyncState::Ready,
            fence,
            sync,
            reset_cookie: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The X side of the fence.
    #[must_use]
    pub fn fence(&self) -> XFence {
        self.fence
    }

    /// The GPU side of the fence.
    #[must_use]
    pub fn sync(&self) -> GpuSync {
        self.sync
    }

    /// Asks the X server to signal the fence once it has processed
    /// everything sent before.
    ///
    /// Legal from [`Ready`](SyncState::Ready) and
    /// [`Resetting`](SyncState::Resetting); a pending reset is completed
    /// first.
    pub fn trigger(&mut self, x: &mut impl X11Fences) -> Result<(), SyncError> {
        debug_assert!(
            matches!(self.state, SyncState::Ready | SyncState::Resetting),
            "trigger from {:?}",
            self.state
        );
        match self.state {
            SyncState::Ready => {}
            SyncState::Resetting => self.finish_resetting(x)?,
            from => return Err(SyncError::InvalidTransition { from, op: "trigger" }),
        }
        x.trigger_fence(self.fence);
        self.state = SyncState::TriggerSent;
        Ok(())
    }

    /// Inserts a GPU-side wait. Does nothing unless the trigger was sent and
    /// no wait was inserted yet.
    pub fn wait(&mut self, gpu: &mut impl GpuFences) {
        if self.state != SyncState::TriggerSent {
            return;
        }
        gpu.wait_sync(self.sync);
        self.state = SyncState::Waiting;
    }

    /// Makes sure the fence signaled, blocking for at most `timeout`.
    ///
    /// A triggered fence without an inserted wait (every damaged window was
    /// occluded) is finished the same way.
    pub fn finish(
        &mut self,
        gpu: &mut impl GpuFences,
        timeout: Duration,
    ) -> Result<(), SyncError> {
        debug_assert!(
            matches!(
                self.state,
                SyncState::Done | SyncState::TriggerSent | SyncState::Waiting
            ),
            "finish from {:?}",
            self.state
        );
        match self.state {
            SyncState::Done => return Ok(()),
            SyncState::TriggerSent | SyncState::Waiting => {}
            from => return Err(SyncError::InvalidTransition { from, op: "finish" }),
        }
        if !gpu.is_signaled(self.sync) {
            tracing::debug!(fence = self.fence.0, "waiting for X fence to finish");
            match gpu.client_wait(self.sync, timeout) {
                ClientWait::Signaled => {}
                ClientWait::TimedOut => {
                    tracing::warn!(fence = self.fence.0, "timeout while waiting for X fence");
                    return Err(SyncError::Timeout);
                }
                ClientWait::Failed => {
                    tracing::warn!(fence = self.fence.0, "client wait on X fence failed");
                    return Err(SyncError::WaitFailed);
                }
            }
        }
        self.state = SyncState::Done;
        Ok(())
    }

    /// Sends a reset and a round trip that orders it before the next
    /// trigger.
    pub fn reset(&mut self, x: &mut impl X11Fences) -> Result<(), SyncError> {
        debug_assert_eq!(self.state, SyncState::Done, "reset from {:?}", self.state);
        if self.state != SyncState::Done {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                op: "reset",
            });
        }
        self.reset_cookie = Some(x.reset_fence(self.fence));
        self.state = SyncState::Resetting;
        Ok(())
    }

    /// Reads the reset's round trip reply.
    pub fn finish_resetting(&mut self, x: &mut impl X11Fences) -> Result<(), SyncError> {
        debug_assert_eq!(
            self.state,
            SyncState::Resetting,
            "finish_resetting from {:?}",
            self.state
        );
        if self.state != SyncState::Resetting {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                op: "finish_resetting",
            });
        }
        if let Some(cookie) = self.reset_cookie.take() {
            x.await_reply(cookie);
        }
        self.state = SyncState::Ready;
        Ok(())
    }

    /// Releases the native handles.
    ///
    /// An untriggered fence is triggered and flushed first. Deleting the GPU
    /// sync while its X fence can still be unsignaled deadlocks the driver.
    pub fn destroy(mut self, x: &mut impl X11Fences, gpu: &mut impl GpuFences) {
        if matches!(self.state, SyncState::Ready | SyncState::Resetting) {
            if let Some(cookie) = self.reset_cookie.take() {
                x.discard_reply(cookie);
            }
            x.trigger_fence(self.fence);
            x.flush();
        }
        x.destroy_fence(self.fence);
        gpu.delete_sync(self.sync);
    }
}
