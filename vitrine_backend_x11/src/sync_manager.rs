// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fence ring.
//!
//! Each frame takes the slot under the cursor, triggers it before painting
//! and makes the GPU wait on it. After submission
//! [`update_fences`](SyncManager::update_fences) finishes and resets the
//! slots the cursor reaches next, so the slot a frame takes is always
//! [`Ready`](SyncState::Ready) or at worst
//! [`Resetting`](SyncState::Resetting).

use core::fmt;

use crate::config::{SyncConfig, SyncFailurePolicy};
use crate::driver::{GpuFences, X11Fences};
use crate::error::SyncError;
use crate::sync_object::{SyncObject, SyncState};

/// A ring of [`SyncObject`]s owned together with the drivers that created
/// them.
pub struct SyncManager<X: X11Fences, G: GpuFences> {
    x: X,
    gpu: G,
    config: SyncConfig,
    fences: Vec<SyncObject>,
    next: usize,
    current: Option<usize>,
}

impl<X: X11Fences, G: GpuFences> fmt::Debug for SyncManager<X, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncManager")
            .field("config", &self.config)
            .field("fences", &self.fences)
            .field("next", &self.next)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<X: X11Fences, G: GpuFences> SyncManager<X, G> {
    /// Creates `config.ring_size` fences.
    pub fn new(mut x: X, mut gpu: G, config: SyncConfig) -> Self {
        let config = config.with_ring_size(config.ring_size);
        let fences = (0..config.ring_size)
            .map(|_| SyncObject::new(&mut x, &mut gpu))
            .collect();
        tracing::debug!(
            ring = config.ring_size,
            "initialized fences for synchronization with the X command stream"
        );
        Self {
            x,
            gpu,
            config,
            fences,
            next: 0,
            current: None,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The X driver.
    #[must_use]
    pub fn x11(&self) -> &X {
        &self.x
    }

    /// The GPU driver.
    #[must_use]
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Mutable access to the GPU driver.
    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    /// The fence in `slot`.
    #[must_use]
    pub fn fence(&self, slot: usize) -> Option<&SyncObject> {
        self.fences.get(slot)
    }

    /// Slot taken by the current frame, if any.
    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Takes the slot under the cursor for the current frame and advances
    /// the cursor.
    pub fn next_fence(&mut self) -> usize {
        let slot = self.next;
        self.next = (self.next + 1) % self.fences.len();
        self.current = Some(slot);
        slot
    }

    /// Triggers the current frame's fence.
    pub fn trigger(&mut self) -> Result<(), SyncError> {
        let Some(slot) = self.current else {
            return Ok(());
        };
        self.fences[slot].trigger(&mut self.x)
    }

    /// Makes the GPU wait on the current frame's fence unless it already
    /// does.
    pub fn insert_wait(&mut self) {
        if let Some(slot) = self.current {
            self.fences[slot].wait(&mut self.gpu);
        }
    }

    /// Ends the current frame and brings the slots the cursor reaches next
    /// back towards [`Ready`](SyncState::Ready).
    ///
    /// Stops at the first fence that cannot be finished. Under
    /// [`SyncFailurePolicy::Retry`] that fence is replaced by a fresh one so
    /// the next frame starts clean.
    pub fn update_fences(&mut self) -> Result<(), SyncError> {
        self.current = None;
        let len = self.fences.len();
        for i in 0..self.config.lookahead() {
            let slot = (self.next + i) % len;
            if let Err(err) = self.advance(slot) {
                if self.config.policy == SyncFailurePolicy::Retry {
                    self.replace(slot);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn advance(&mut self, slot: usize) -> Result<(), SyncError> {
        let fence = &mut self.fences[slot];
        match fence.state() {
            SyncState::Ready => Ok(()),
            SyncState::TriggerSent | SyncState::Waiting => {
                fence.finish(&mut self.gpu, self.config.client_wait_timeout)?;
                fence.reset(&mut self.x)
            }
            SyncState::Done => fence.reset(&mut self.x),
            SyncState::Resetting => fence.finish_resetting(&mut self.x),
        }
    }

    fn replace(&mut self, slot: usize) {
        let fresh = SyncObject::new(&mut self.x, &mut self.gpu);
        let stuck = core::mem::replace(&mut self.fences[slot], fresh);
        tracing::debug!(slot, fence = stuck.fence().0, "replacing stuck fence");
        stuck.destroy(&mut self.x, &mut self.gpu);
    }

    /// Number of fences triggered and not yet reset.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.fences
            .iter()
            .filter(|f| {
                matches!(
                    f.state(),
                    SyncState::TriggerSent | SyncState::Waiting | SyncState::Done
                )
            })
            .count()
    }
}

impl<X: X11Fences, G: GpuFences> Drop for SyncManager<X, G> {
    fn drop(&mut self) {
        for fence in self.fences.drain(..) {
            fence.destroy(&mut self.x, &mut self.gpu);
        }
    }
}
