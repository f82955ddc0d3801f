// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Queued invocations on the compositor event loop.
//!
//! Work that must not run synchronously inside the caller (loading the next
//! queued effect, for example) is posted as a [`DeferredCall`] through an
//! [`Invoker`]. The event loop drains the posted calls one at a time between
//! its other sources, so a burst of requests never grows the call stack and
//! never starves redraw.
//!
//! [`DeferredQueue`] is the plain FIFO implementation used by the event-loop
//! driver and by tests.

use alloc::collections::VecDeque;

/// A unit of work posted back to the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DeferredCall {
    /// Process exactly one entry of the effect load queue.
    DequeueEffectLoad,
}

/// Posts calls to run on a later event-loop iteration.
///
/// Implementations must never run the call before `invoke_later` returns.
pub trait Invoker {
    /// Schedules `call` to run after the current dispatch completes.
    fn invoke_later(&mut self, call: DeferredCall);
}

/// FIFO of posted calls.
#[derive(Clone, Debug, Default)]
pub struct DeferredQueue {
    pending: VecDeque<DeferredCall>,
}

impl DeferredQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Removes and returns the oldest posted call.
    pub fn pop(&mut self) -> Option<DeferredCall> {
        self.pending.pop_front()
    }

    /// Returns the number of calls waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Invoker for DeferredQueue {
    fn invoke_later(&mut self, call: DeferredCall) {
        self.pending.push_back(call);
    }
}
