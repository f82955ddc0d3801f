// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frames composited through the render crate with the fence ring attached.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use kurbo::Rect;
use vitrine_backend_x11::{
    ClientWait, GpuFences, GpuSync, ResetCookie, SyncConfig, SyncFailurePolicy, SyncManager,
    X11Fences, X11FrameSync, XFence,
};
use vitrine_core::output::{OutputId, OutputInfo};
use vitrine_core::time::{Clock, Duration, HostTime, ManualClock};
use vitrine_core::trace::{FenceEvent, FenceOutcome, TraceSink, Tracer};
use vitrine_effects::EffectChain;
use vitrine_effects::headless::HeadlessGpu;
use vitrine_render::{Compositor, RenderConfig};

const OUTPUT: OutputId = OutputId(0);

/// Everything the scripted drivers saw, in order.
#[derive(Debug, Default)]
struct Wire {
    log: Vec<String>,
    next_fence: u32,
    /// Answers for client waits; `Signaled` once exhausted.
    waits: VecDeque<ClientWait>,
    /// Whether polls report the fence signaled.
    signaled: bool,
}

type Shared = Rc<RefCell<Wire>>;

struct ScriptedX(Shared);

impl X11Fences for ScriptedX {
    fn create_fence(&mut self) -> XFence {
        let mut wire = self.0.borrow_mut();
        wire.next_fence += 1;
        let fence = XFence(wire.next_fence);
        wire.log.push(format!("x:create {}", fence.0));
        fence
    }

    fn trigger_fence(&mut self, fence: XFence) {
        self.0.borrow_mut().log.push(format!("x:trigger {}", fence.0));
    }

    fn reset_fence(&mut self, fence: XFence) -> ResetCookie {
        self.0.borrow_mut().log.push(format!("x:reset {}", fence.0));
        ResetCookie(fence.0)
    }

    fn await_reply(&mut self, cookie: ResetCookie) {
        self.0.borrow_mut().log.push(format!("x:reply {}", cookie.0));
    }

    fn discard_reply(&mut self, cookie: ResetCookie) {
        self.0.borrow_mut().log.push(format!("x:discard {}", cookie.0));
    }

    fn destroy_fence(&mut self, fence: XFence) {
        self.0.borrow_mut().log.push(format!("x:destroy {}", fence.0));
    }

    fn flush(&mut self) {}
}

struct ScriptedGl(Shared);

impl GpuFences for ScriptedGl {
    fn import_fence(&mut self, fence: XFence) -> GpuSync {
        GpuSync(u64::from(fence.0))
    }

    fn wait_sync(&mut self, sync: GpuSync) {
        self.0.borrow_mut().log.push(format!("gl:wait {}", sync.0));
    }

    fn is_signaled(&mut self, _sync: GpuSync) -> bool {
        self.0.borrow().signaled
    }

    fn client_wait(&mut self, sync: GpuSync, timeout: Duration) -> ClientWait {
        let mut wire = self.0.borrow_mut();
        wire.log
            .push(format!("gl:client_wait {} {}ms", sync.0, timeout.as_millis_f64()));
        wire.waits.pop_front().unwrap_or(ClientWait::Signaled)
    }

    fn delete_sync(&mut self, sync: GpuSync) {
        self.0.borrow_mut().log.push(format!("gl:delete {}", sync.0));
    }
}

#[derive(Default)]
struct Fences(Vec<FenceEvent>);

impl TraceSink for Fences {
    fn on_fence(&mut self, e: &FenceEvent) {
        self.0.push(*e);
    }
}

struct Rig {
    comp: Compositor,
    clock: Rc<ManualClock>,
    gpu: HeadlessGpu,
    sync: X11FrameSync<ScriptedX, ScriptedGl>,
    wire: Shared,
    fences: Fences,
}

impl Rig {
    fn new(policy: SyncFailurePolicy) -> Self {
        let clock = Rc::new(ManualClock::new(HostTime(0)));
        let mut comp = Compositor::new(
            RenderConfig::new(),
            EffectChain::default(),
            Rc::clone(&clock) as Rc<dyn Clock>,
        );
        comp.add_output(
            OUTPUT,
            OutputInfo::new(Rect::new(0.0, 0.0, 64.0, 64.0), 60_000),
        );
        comp.windows_mut()
            .create_window(Rect::new(0.0, 0.0, 32.0, 32.0));
        let wire = Shared::default();
        wire.borrow_mut().signaled = true;
        let manager = SyncManager::new(
            ScriptedX(Rc::clone(&wire)),
            ScriptedGl(Rc::clone(&wire)),
            SyncConfig::new().with_policy(policy),
        );
        Self {
            comp,
            clock,
            gpu: HeadlessGpu::new(),
            sync: X11FrameSync::new(manager),
            wire,
            fences: Fences::default(),
        }
    }

    /// Damages the output and runs one frame.
    fn frame(&mut self) {
        self.comp.schedule_repaint_full();
        let outcome = self.comp.run_output(
            OUTPUT,
            &mut self.gpu,
            &mut self.sync,
            &mut Tracer::new(&mut self.fences),
        );
        assert!(outcome.painted().is_some(), "frame painted: {outcome:?}");
        self.clock.advance(Duration::from_millis(16));
    }
}

#[test]
fn every_frame_is_fenced_around_the_draw() {
    let mut rig = Rig::new(SyncFailurePolicy::Retry);
    rig.wire.borrow_mut().log.clear();
    rig.frame();

    let log = rig.wire.borrow().log.clone();
    assert_eq!(log, ["x:trigger 1", "gl:wait 1"]);
    assert_eq!(rig.gpu.drawn_windows().len(), 1, "window drawn once");
    assert_eq!(rig.fences.0.len(), 1);
    assert_eq!(rig.fences.0[0].slot, 0);
    assert_eq!(rig.fences.0[0].outcome, FenceOutcome::Signaled);
}

#[test]
fn ring_recycles_fences_across_frames() {
    let mut rig = Rig::new(SyncFailurePolicy::Retry);
    for _ in 0..8 {
        rig.frame();
    }
    let slots: Vec<u8> = rig.fences.0.iter().map(|e| e.slot).collect();
    assert_eq!(slots, [0, 1, 2, 3, 0, 1, 2, 3]);
    assert!(
        rig.fences.0.iter().all(|e| e.outcome == FenceOutcome::Signaled),
        "{:?}",
        rig.fences.0
    );
    let manager = rig.sync.manager().unwrap();
    assert!(manager.in_flight() <= 3, "{} in flight", manager.in_flight());
    let resets = rig
        .wire
        .borrow()
        .log
        .iter()
        .filter(|l| l.starts_with("x:reset"))
        .count();
    assert!(resets >= 4, "finished fences are reset: {resets}");
}

#[test]
fn timed_out_fence_degrades_one_frame_then_recovers() {
    let mut rig = Rig::new(SyncFailurePolicy::Retry);
    for _ in 0..3 {
        rig.frame();
    }
    {
        let mut wire = rig.wire.borrow_mut();
        wire.signaled = false;
        wire.waits.push_back(ClientWait::TimedOut);
    }
    rig.frame();
    assert_eq!(
        rig.fences.0.last().map(|e| e.outcome),
        Some(FenceOutcome::TimedOut)
    );
    assert!(
        rig.wire
            .borrow()
            .log
            .iter()
            .any(|l| l == "gl:client_wait 2 1000ms"),
        "bounded one second wait"
    );
    assert_eq!(rig.gpu.drawn_windows().len(), 4, "the frame still went out");

    rig.wire.borrow_mut().signaled = true;
    rig.frame();
    assert_eq!(
        rig.fences.0.last().map(|e| e.outcome),
        Some(FenceOutcome::Signaled)
    );
    assert!(rig.sync.is_enabled());
}

#[test]
fn disable_policy_stops_fencing_after_a_failed_wait() {
    let mut rig = Rig::new(SyncFailurePolicy::Disable);
    for _ in 0..3 {
        rig.frame();
    }
    {
        let mut wire = rig.wire.borrow_mut();
        wire.signaled = false;
        wire.waits.push_back(ClientWait::Failed);
    }
    rig.frame();
    assert_eq!(
        rig.fences.0.last().map(|e| e.outcome),
        Some(FenceOutcome::Failed)
    );
    assert!(!rig.sync.is_enabled());

    // Tearing the ring down triggered every untriggered fence before
    // destroying it.
    let log = rig.wire.borrow().log.clone();
    for fence in 1..=4 {
        let destroy = log.iter().position(|l| *l == format!("x:destroy {fence}"));
        let last_trigger = log
            .iter()
            .rposition(|l| *l == format!("x:trigger {fence}"));
        assert!(destroy.is_some(), "fence {fence} destroyed");
        assert!(last_trigger < destroy, "fence {fence} triggered first");
    }

    let before = rig.fences.0.len();
    rig.frame();
    assert_eq!(rig.fences.0.len(), before, "no more fence events");
    assert_eq!(rig.gpu.drawn_windows().len(), 5);
}
