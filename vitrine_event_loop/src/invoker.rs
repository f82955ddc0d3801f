// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use calloop::ping::Ping;
use vitrine_core::deferred::{DeferredCall, DeferredQueue, Invoker};

/// [`Invoker`] that posts calls to the event loop.
///
/// Posted calls land in a shared [`DeferredQueue`] and wake the loop through
/// a ping source. The ping handler runs one call per dispatch and pings
/// again while calls remain, so the loop regains control between any two.
#[derive(Clone)]
pub struct LoopInvoker {
    queue: Rc<RefCell<DeferredQueue>>,
    ping: Ping,
}

impl fmt::Debug for LoopInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopInvoker")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl LoopInvoker {
    pub(crate) fn new(queue: Rc<RefCell<DeferredQueue>>, ping: Ping) -> Self {
        Self { queue, ping }
    }

    /// Takes the oldest posted call and wakes the loop again if more are
    /// waiting.
    pub(crate) fn next(&self) -> Option<DeferredCall> {
        let mut queue = self.queue.borrow_mut();
        let call = queue.pop()?;
        if !queue.is_empty() {
            self.ping.ping();
        }
        Some(call)
    }

    /// Number of posted calls not run yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Invoker for LoopInvoker {
    fn invoke_later(&mut self, call: DeferredCall) {
        self.queue.borrow_mut().invoke_later(call);
        self.ping.ping();
    }
}
