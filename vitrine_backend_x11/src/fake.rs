// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted drivers for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use vitrine_core::time::Duration;

use crate::driver::{ClientWait, GpuFences, GpuSync, ResetCookie, X11Fences, XFence};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum XCall {
    Create(XFence),
    Trigger(XFence),
    Reset(XFence),
    AwaitReply(ResetCookie),
    DiscardReply(ResetCookie),
    Destroy(XFence),
    Flush,
}

/// Records every request. The X server is modelled as signaling a fence as
/// soon as its trigger is queued.
#[derive(Debug, Default)]
pub(crate) struct FakeX {
    pub(crate) calls: Vec<XCall>,
    pub(crate) triggered: BTreeSet<XFence>,
    next: u32,
}

impl FakeX {
    pub(crate) fn triggers(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, XCall::Trigger(_)))
            .count()
    }
}

impl X11Fences for FakeX {
    fn create_fence(&mut self) -> XFence {
        self.next += 1;
        let fence = XFence(self.next);
        self.calls.push(XCall::Create(fence));
        fence
    }

    fn trigger_fence(&mut self, fence: XFence) {
        self.triggered.insert(fence);
        self.calls.push(XCall::Trigger(fence));
    }

    fn reset_fence(&mut self, fence: XFence) -> ResetCookie {
        self.triggered.remove(&fence);
        self.calls.push(XCall::Reset(fence));
        self.calls.push(XCall::Flush);
        ResetCookie(fence.0 + 1000)
    }

    fn await_reply(&mut self, cookie: ResetCookie) {
        self.calls.push(XCall::AwaitReply(cookie));
    }

    fn discard_reply(&mut self, cookie: ResetCookie) {
        self.calls.push(XCall::DiscardReply(cookie));
    }

    fn destroy_fence(&mut self, fence: XFence) {
        self.calls.push(XCall::Destroy(fence));
    }

    fn flush(&mut self) {
        self.calls.push(XCall::Flush);
    }
}

/// Answers polls from a script, then with `signaled`.
#[derive(Debug)]
pub(crate) struct FakeGpu {
    pub(crate) signaled: bool,
    pub(crate) waits: VecDeque<ClientWait>,
    pub(crate) server_waits: Vec<GpuSync>,
    pub(crate) client_waits: Vec<(GpuSync, Duration)>,
    pub(crate) deleted: Vec<GpuSync>,
}

impl Default for FakeGpu {
    fn default() -> Self {
        Self {
            signaled: true,
            waits: VecDeque::new(),
            server_waits: Vec::new(),
            client_waits: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl GpuFences for FakeGpu {
    fn import_fence(&mut self, fence: XFence) -> GpuSync {
        GpuSync(u64::from(fence.0))
    }

    fn wait_sync(&mut self, sync: GpuSync) {
        self.server_waits.push(sync);
    }

    fn is_signaled(&mut self, _sync: GpuSync) -> bool {
        self.signaled
    }

    fn client_wait(&mut self, sync: GpuSync, timeout: Duration) -> ClientWait {
        self.client_waits.push((sync, timeout));
        self.waits.pop_front().unwrap_or(ClientWait::Signaled)
    }

    fn delete_sync(&mut self, sync: GpuSync) {
        self.deleted.push(sync);
    }
}

impl X11Fences for Rc<RefCell<FakeX>> {
    fn create_fence(&mut self) -> XFence {
        self.borrow_mut().create_fence()
    }

    fn trigger_fence(&mut self, fence: XFence) {
        self.borrow_mut().trigger_fence(fence);
    }

    fn reset_fence(&mut self, fence: XFence) -> ResetCookie {
        self.borrow_mut().reset_fence(fence)
    }

    fn await_reply(&mut self, cookie: ResetCookie) {
        self.borrow_mut().await_reply(cookie);
    }

    fn discard_reply(&mut self, cookie: ResetCookie) {
        self.borrow_mut().discard_reply(cookie);
    }

    fn destroy_fence(&mut self, fence: XFence) {
        self.borrow_mut().destroy_fence(fence);
    }

    fn flush(&mut self) {
        self.borrow_mut().flush();
    }
}
