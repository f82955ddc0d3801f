// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use vitrine_core::trace::FenceOutcome;
use vitrine_render::{FrameSync, SyncReport};

use crate::config::SyncFailurePolicy;
use crate::driver::{GpuFences, X11Fences};
use crate::error::SyncError;
use crate::sync_manager::SyncManager;

/// Plugs a [`SyncManager`] into the compositor's frame hook.
///
/// Triggers a fence when a frame begins, makes the GPU wait on it before
/// the first window is drawn and updates the ring after submission. Every
/// failure is reported and the frame goes out unsynchronized.
pub struct X11FrameSync<X: X11Fences, G: GpuFences> {
    manager: Option<SyncManager<X, G>>,
    frame: Option<Frame>,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    slot: usize,
    triggered: bool,
}

impl<X: X11Fences, G: GpuFences> fmt::Debug for X11FrameSync<X, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11FrameSync")
            .field("manager", &self.manager)
            .field("frame", &self.frame)
            .finish()
    }
}

impl<X: X11Fences, G: GpuFences> X11FrameSync<X, G> {
    /// Synchronizes every frame through `manager`.
    #[must_use]
    pub fn new(manager: SyncManager<X, G>) -> Self {
        Self {
            manager: Some(manager),
            frame: None,
        }
    }

    /// Does not synchronize at all, e.g. when the GL implementation lacks
    /// X11 sync objects or the user turned them off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            manager: None,
            frame: None,
        }
    }

    /// Whether frames are still being synchronized.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.manager.is_some()
    }

    /// The fence ring, while enabled.
    #[must_use]
    pub fn manager(&self) -> Option<&SyncManager<X, G>> {
        self.manager.as_ref()
    }

    /// Mutable access to the fence ring, while enabled.
    pub fn manager_mut(&mut self) -> Option<&mut SyncManager<X, G>> {
        self.manager.as_mut()
    }
}

impl<X: X11Fences, G: GpuFences> FrameSync for X11FrameSync<X, G> {
    fn begin_frame(&mut self) {
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        let slot = manager.next_fence();
        let triggered = match manager.trigger() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(slot, %err, "cannot trigger fence, frame is unsynchronized");
                false
            }
        };
        self.frame = Some(Frame { slot, triggered });
    }

    fn before_paint(&mut self) {
        if let (Some(manager), Some(Frame { triggered: true, .. })) =
            (self.manager.as_mut(), self.frame)
        {
            manager.insert_wait();
        }
    }

    fn end_frame(&mut self) -> Option<SyncReport> {
        let frame = self.frame.take()?;
        let manager = self.manager.as_mut()?;
        let result = manager.update_fences();
        let outcome = match result {
            Ok(()) if frame.triggered => FenceOutcome::Signaled,
            Ok(()) => FenceOutcome::Failed,
            Err(SyncError::Timeout) => FenceOutcome::TimedOut,
            Err(_) => FenceOutcome::Failed,
        };
        if result.is_err() && manager.config().policy == SyncFailurePolicy::Disable {
            tracing::warn!("disabling explicit synchronization with the X command stream");
            self.manager = None;
        }
        Some(SyncReport {
            slot: u8::try_from(frame.slot).unwrap_or(u8::MAX),
            outcome,
        })
    }
}
