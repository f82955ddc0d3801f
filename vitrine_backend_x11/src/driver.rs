// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native entry points consumed by the fence ring.
//!
//! The platform layer implements these over its X connection (`SYNC`
//! extension requests on the root window) and its GL context
//! (`GL_EXT_x11_sync_object`). Nothing here links against either.

use vitrine_core::time::Duration;

/// An X `SYNC` fence created on the root window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XFence(pub u32);

/// A GPU sync object imported from an [`XFence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpuSync(pub u64);

/// Sequence number of the round trip sent along with a fence reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResetCookie(pub u32);

/// Result of a bounded client-side wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientWait {
    /// The sync signaled within the timeout.
    Signaled,
    /// The timeout expired first.
    TimedOut,
    /// The driver reported an error.
    Failed,
}

/// X server side of the fence.
pub trait X11Fences {
    /// Creates an untriggered fence on the root window.
    fn create_fence(&mut self) -> XFence;

    /// Queues a trigger request.
    fn trigger_fence(&mut self, fence: XFence);

    /// Queues a reset request followed by a round trip and flushes. The
    /// reset is known to be processed once the returned cookie's reply has
    /// arrived.
    fn reset_fence(&mut self, fence: XFence) -> ResetCookie;

    /// Blocks until the reply for `cookie` arrives.
    fn await_reply(&mut self, cookie: ResetCookie);

    /// Drops the reply for `cookie` without waiting for it.
    fn discard_reply(&mut self, cookie: ResetCookie);

    /// Queues destruction of the fence.
    fn destroy_fence(&mut self, fence: XFence);

    /// Sends all queued requests to the server.
    fn flush(&mut self);
}

/// GPU side of the fence.
pub trait GpuFences {
    /// Imports an X fence as a GPU sync object.
    fn import_fence(&mut self, fence: XFence) -> GpuSync;

    /// Makes subsequent GPU commands wait for `sync` without blocking the
    /// CPU.
    fn wait_sync(&mut self, sync: GpuSync);

    /// Polls the sync status.
    fn is_signaled(&mut self, sync: GpuSync) -> bool;

    /// Blocks the CPU until `sync` signals or `timeout` passes.
    fn client_wait(&mut self, sync: GpuSync, timeout: Duration) -> ClientWait;

    /// Deletes the sync object. Deleting one whose X fence was never
    /// triggered deadlocks some drivers.
    fn delete_sync(&mut self, sync: GpuSync);
}
