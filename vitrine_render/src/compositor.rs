// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor: outputs, locking, repaint scheduling and frame runs.
//!
//! The [`Compositor`] owns the window model, the effect chain and one
//! [`OutputRenderer`] per output. It never paints on its own initiative:
//! scheduling a repaint only adds damage and arms a deadline, and the
//! event-loop driver calls [`dispatch_timers`](Compositor::dispatch_timers)
//! once a deadline passes.
//!
//! ```text
//!   schedule_repaint(r) ──► every output: damage ∪= r ∩ geometry, arm timer
//!   dispatch_timers()   ──► run_output(id) for every due output
//!   run_output(id)
//!     ├─ locked / swap pending / no damage ──► return
//!     ├─ Scene::paint          (effect chain phases, fence hooks)
//!     ├─ effect repaint requests ──► schedule_repaint
//!     ├─ frame callbacks for windows whose max-coverage output is id
//!     └─ reap remnants no DeletedRef holds
//! ```

use alloc::collections::BTreeMap;
use alloc::collections::btree_map::Entry;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use vitrine_core::deferred::Invoker;
use vitrine_core::effect::EffectId;
use vitrine_core::output::{OutputId, OutputInfo};
use vitrine_core::region::Region;
use vitrine_core::time::{Clock, HostTime};
use vitrine_core::trace::{FrameSummary, Tracer};
use vitrine_core::window::{WindowChanges, WindowId, WindowStore};
use vitrine_effects::{
    EffectChain, EffectLoadQueue, EffectLoader, GpuBackend, LoadError, RepaintRequests,
};

use crate::config::RenderConfig;
use crate::output::{OutputRenderer, SwapFeedback};
use crate::scene::{FrameRequest, Scene, SceneContext};
use crate::sync::FrameSync;

/// What [`Compositor::run_output`] did.
#[derive(Clone, Copy, Debug)]
pub enum RunOutcome {
    /// No output with that id.
    UnknownOutput,
    /// Compositing is locked.
    Locked,
    /// A buffer swap is still in flight.
    SwapPending,
    /// Nothing was damaged; the output went idle.
    Idle,
    /// A frame was painted.
    Painted(FrameSummary),
}

impl RunOutcome {
    /// Returns the frame summary if a frame was painted.
    #[must_use]
    pub fn painted(&self) -> Option<&FrameSummary> {
        match self {
            Self::Painted(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Per-output repaint scheduler and frame driver.
pub struct Compositor {
    config: RenderConfig,
    clock: Rc<dyn Clock>,
    windows: WindowStore,
    chain: EffectChain,
    outputs: BTreeMap<OutputId, OutputRenderer>,
    scene: Scene,
    repaints: RepaintRequests,
    changes: WindowChanges,
    frame_callbacks: Vec<WindowId>,
    lock_count: u32,
    frame_index: u64,
}

impl fmt::Debug for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("outputs", &self.outputs)
            .field("chain", &self.chain)
            .field("lock_count", &self.lock_count)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    /// Creates a compositor with no outputs and no windows.
    pub fn new(config: RenderConfig, chain: EffectChain, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: WindowStore::new(),
            chain,
            outputs: BTreeMap::new(),
            scene: Scene::new(),
            repaints: RepaintRequests::new(),
            changes: WindowChanges::default(),
            frame_callbacks: Vec::new(),
            lock_count: 0,
            frame_index: 0,
        }
    }

    /// The scheduling configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The window model.
    #[must_use]
    pub fn windows(&self) -> &WindowStore {
        &self.windows
    }

    /// Mutable access to the window model. Changes are picked up by
    /// [`flush_window_changes`](Self::flush_window_changes) and before
    /// every run.
    pub fn windows_mut(&mut self) -> &mut WindowStore {
        &mut self.windows
    }

    /// The effect chain.
    #[must_use]
    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    /// Mutable access to the effect chain.
    pub fn chain_mut(&mut self) -> &mut EffectChain {
        &mut self.chain
    }

    /// Number of frames painted so far, over all outputs.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    // -- Outputs --

    /// Adds an output, or updates it if the id is known. Either way it is
    /// repainted in full.
    pub fn add_output(&mut self, id: OutputId, info: OutputInfo) {
        let now = self.clock.now();
        let output = match self.outputs.entry(id) {
            Entry::Occupied(entry) => {
                let output = entry.into_mut();
                output.set_info(info);
                tracing::debug!(output = id.0, ?info, "output changed");
                output
            }
            Entry::Vacant(entry) => {
                tracing::debug!(output = id.0, ?info, "output added");
                entry.insert(OutputRenderer::new(id, info, &self.config))
            }
        };
        output.add_full_repaint();
        if self.lock_count == 0 {
            output.arm(now, &self.config);
        }
    }

    /// Removes an output. Its timer and damage go with it; frame callbacks
    /// it had collected are handed to the remaining outputs on their next
    /// run. Returns `false` if the id was unknown.
    pub fn remove_output(&mut self, id: OutputId) -> bool {
        let Some(mut output) = self.outputs.remove(&id) else {
            return false;
        };
        self.frame_callbacks.append(&mut output.frame_callbacks);
        tracing::debug!(output = id.0, "output removed");
        true
    }

    /// The repaint state of an output.
    #[must_use]
    pub fn output(&self, id: OutputId) -> Option<&OutputRenderer> {
        self.outputs.get(&id)
    }

    /// Ids of all outputs, ascending.
    pub fn output_ids(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.outputs.keys().copied()
    }

    /// Returns the output covering the largest part of `rect`. Ties,
    /// including no coverage at all, go to the lowest output id.
    #[must_use]
    pub fn max_coverage_output(&self, rect: Rect) -> Option<OutputId> {
        let mut best: Option<(OutputId, f64)> = None;
        for (&id, output) in &self.outputs {
            let area = rect.intersect(output.geometry()).area();
            if best.is_none_or(|(_, best_area)| area > best_area) {
                best = Some((id, area));
            }
        }
        best.map(|(id, _)| id)
    }

    // -- Locking --

    /// Suspends repainting. Locks nest; damage keeps accumulating.
    pub fn lock(&mut self) {
        self.lock_count += 1;
        if self.lock_count == 1 {
            for output in self.outputs.values_mut() {
                output.disarm();
            }
            tracing::debug!("compositing locked");
        }
    }

    /// Releases one lock. The last unlock repaints every output in full to
    /// recover whatever happened while locked.
    pub fn unlock(&mut self) {
        debug_assert!(self.lock_count > 0, "unlock without matching lock");
        if self.lock_count == 0 {
            tracing::warn!("unlock without matching lock ignored");
            return;
        }
        self.lock_count -= 1;
        if self.lock_count == 0 {
            tracing::debug!("compositing unlocked");
            self.schedule_repaint_full();
        }
    }

    /// Whether repainting is suspended.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    // -- Scheduling --

    /// Adds `region` (global coordinates) to the damage of every output it
    /// touches and arms their timers.
    pub fn schedule_repaint(&mut self, region: &Region) {
        if region.is_empty() {
            return;
        }
        let now = self.clock.now();
        let locked = self.is_locked();
        for output in self.outputs.values_mut() {
            if output.add_repaint(region) && !locked {
                output.arm(now, &self.config);
            }
        }
    }

    /// Requests a full repaint of every output.
    pub fn schedule_repaint_full(&mut self) {
        let now = self.clock.now();
        let locked = self.is_locked();
        for output in self.outputs.values_mut() {
            output.add_full_repaint();
            if !locked {
                output.arm(now, &self.config);
            }
        }
    }

    /// Repaints the area a window currently covers, on every output it
    /// touches.
    pub fn schedule_window_repaint(&mut self, window: WindowId) {
        if !self.windows.is_alive(window) {
            return;
        }
        let region = Region::from_rect(self.windows.geometry(window));
        self.schedule_repaint(&region);
    }

    /// Drains window changes: notifies effects of mapped and closed
    /// windows, schedules the resulting damage and any repaints effects
    /// asked for.
    pub fn flush_window_changes(&mut self) {
        let mut changes = core::mem::take(&mut self.changes);
        self.windows.collect_changes_into(&mut changes);
        for &window in &changes.added {
            self.chain
                .window_added(window, &mut self.windows, &mut self.repaints);
        }
        for &window in &changes.closed {
            self.chain
                .window_closed(window, &mut self.windows, &mut self.repaints);
        }
        self.schedule_repaint(&changes.damage);
        self.changes = changes;
        self.apply_repaint_requests();
    }

    fn apply_repaint_requests(&mut self) {
        if self.repaints.is_empty() {
            return;
        }
        match self.repaints.take(&self.windows) {
            None => self.schedule_repaint_full(),
            Some(region) => self.schedule_repaint(&region),
        }
    }

    /// The earliest armed deadline over all outputs.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.outputs
            .values()
            .filter_map(OutputRenderer::deadline)
            .min()
    }

    // -- Running --

    /// Runs every output whose timer has expired.
    pub fn dispatch_timers(
        &mut self,
        gpu: &mut dyn GpuBackend,
        sync: &mut dyn FrameSync,
        tracer: &mut Tracer<'_>,
    ) -> Vec<(OutputId, RunOutcome)> {
        let now = self.clock.now();
        let due: Vec<OutputId> = self
            .outputs
            .values()
            .filter(|output| output.is_due(now))
            .map(OutputRenderer::id)
            .collect();
        let mut outcomes = Vec::with_capacity(due.len());
        for id in due {
            let outcome = self.run_output(id, &mut *gpu, &mut *sync, &mut *tracer);
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Composites one frame on `id` if it has damage.
    ///
    /// Stops the output's timer first. Does nothing while locked or while
    /// a swap is pending, and goes idle without touching the effect chain
    /// when nothing is damaged.
    pub fn run_output(
        &mut self,
        id: OutputId,
        gpu: &mut dyn GpuBackend,
        sync: &mut dyn FrameSync,
        tracer: &mut Tracer<'_>,
    ) -> RunOutcome {
        if !self.outputs.contains_key(&id) {
            return RunOutcome::UnknownOutput;
        }
        if self.is_locked() {
            return RunOutcome::Locked;
        }
        self.flush_window_changes();

        let now = self.clock.now();
        let Some(output) = self.outputs.get_mut(&id) else {
            return RunOutcome::UnknownOutput;
        };
        output.disarm();
        if output.is_swap_pending() {
            return RunOutcome::SwapPending;
        }
        let Some((damage, full)) = output.take_damage() else {
            return RunOutcome::Idle;
        };

        self.frame_index += 1;
        let painted = self.scene.paint(
            FrameRequest {
                frame_index: self.frame_index,
                output: id,
                geometry: output.geometry(),
                damage,
                full,
                present: now,
            },
            SceneContext {
                windows: &mut self.windows,
                chain: &mut self.chain,
                gpu,
                framebuffers: &mut output.framebuffers,
                repaints: &mut self.repaints,
                sync,
                tracer,
                clock: &*self.clock,
            },
        );
        output.record_durations(
            painted.paint_end.saturating_duration_since(now),
            painted.render_end.saturating_duration_since(painted.paint_end),
        );
        output.retard_next_run(painted.render_end, &self.config);
        tracing::trace!(
            output = id.0,
            frame = self.frame_index,
            windows = painted.summary.windows_painted,
            full,
            "frame painted"
        );

        self.assign_frame_callbacks(id);
        self.apply_repaint_requests();
        self.reap_remnants();
        RunOutcome::Painted(painted.summary)
    }

    /// Handles a completed buffer swap on `id` and re-arms its timer.
    /// Returns `false` if the output is unknown or had no swap pending.
    pub fn swap_complete(&mut self, id: OutputId, feedback: SwapFeedback) -> bool {
        let now = self.clock.now();
        let locked = self.is_locked();
        let Some(output) = self.outputs.get_mut(&id) else {
            return false;
        };
        let swapped = output.swapped(feedback, now, &self.config);
        if locked {
            output.disarm();
        }
        swapped
    }

    // -- Frame callbacks --

    /// Asks for `window` to be told when a frame showing it was presented.
    /// The callback is delivered by the output covering most of it.
    pub fn request_frame_callback(&mut self, window: WindowId) {
        if self.windows.is_alive(window) && !self.frame_callbacks.contains(&window) {
            self.frame_callbacks.push(window);
        }
    }

    /// Takes the windows whose frame callbacks `id` has honored since the
    /// last call.
    pub fn take_frame_callbacks(&mut self, id: OutputId) -> Vec<WindowId> {
        self.outputs
            .get_mut(&id)
            .map(|output| core::mem::take(&mut output.frame_callbacks))
            .unwrap_or_default()
    }

    fn assign_frame_callbacks(&mut self, id: OutputId) {
        let pending = core::mem::take(&mut self.frame_callbacks);
        let mut honored = Vec::new();
        for window in pending {
            if !self.windows.is_alive(window) {
                continue;
            }
            if self.max_coverage_output(self.windows.geometry(window)) == Some(id) {
                honored.push(window);
            } else {
                self.frame_callbacks.push(window);
            }
        }
        if let Some(output) = self.outputs.get_mut(&id) {
            output.frame_callbacks.extend(honored);
        }
    }

    // -- Remnants --

    fn reap_remnants(&mut self) {
        for window in self.windows.reap_remnants() {
            self.chain.window_deleted(window);
            self.frame_callbacks.retain(|&w| w != window);
            for output in self.outputs.values_mut() {
                output.frame_callbacks.retain(|&w| w != window);
            }
            tracing::trace!(?window, "remnant removed");
        }
    }

    // -- Effects --

    /// Loads the next queued effect. Call when the event loop runs
    /// [`DeferredCall::DequeueEffectLoad`](vitrine_core::deferred::DeferredCall::DequeueEffectLoad).
    /// A successful load repaints every output.
    pub fn dequeue_effect_load(
        &mut self,
        queue: &mut EffectLoadQueue,
        loader: &mut dyn EffectLoader,
        gpu: &mut dyn GpuBackend,
        invoker: &mut dyn Invoker,
    ) -> Option<Result<EffectId, LoadError>> {
        let stacking = self.windows.stacking_order();
        let result = queue.dequeue_into(&mut self.chain, loader, gpu, &stacking, invoker);
        if matches!(result, Some(Ok(_))) {
            self.schedule_repaint_full();
        }
        result
    }

    /// Unloads an effect and repaints every output. Returns `false` if no
    /// effect of that name was loaded.
    pub fn unload_effect(&mut self, name: &str, gpu: &mut dyn GpuBackend) -> bool {
        let unloaded = self.chain.unload(name, &mut self.windows, gpu).is_some();
        if unloaded {
            self.schedule_repaint_full();
        }
        unloaded
    }
}

#[cfg(test)]
mod tests {
    use vitrine_core::time::{Duration, ManualClock};
    use vitrine_effects::headless::HeadlessGpu;

    use super::*;
    use crate::sync::NoSync;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::from_rect(Rect::new(x0, y0, x1, y1))
    }

    fn two_outputs() -> (Compositor, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(HostTime::from_millis(1000)));
        let mut comp = Compositor::new(
            RenderConfig::new(),
            EffectChain::default(),
            Rc::clone(&clock) as Rc<dyn Clock>,
        );
        comp.add_output(OutputId(1), OutputInfo::new(Rect::new(0.0, 0.0, 100.0, 100.0), 60_000));
        comp.add_output(OutputId(2), OutputInfo::new(Rect::new(100.0, 0.0, 200.0, 100.0), 60_000));
        (comp, clock)
    }

    fn run(comp: &mut Compositor, id: OutputId) -> RunOutcome {
        comp.run_output(id, &mut HeadlessGpu::new(), &mut NoSync, &mut Tracer::none())
    }

    #[test]
    fn repaints_union_and_spread_across_outputs() {
        let (mut comp, _clock) = two_outputs();
        run(&mut comp, OutputId(1));
        run(&mut comp, OutputId(2));
        comp.schedule_repaint(&rect(10.0, 10.0, 20.0, 20.0));
        comp.schedule_repaint(&rect(90.0, 0.0, 110.0, 10.0));
        let first = comp.output(OutputId(1)).unwrap();
        assert_eq!(
            first.damage(),
            &rect(10.0, 10.0, 20.0, 20.0).union(&rect(90.0, 0.0, 100.0, 10.0)),
            "damage is the union of both requests, capped to the output"
        );
        assert_eq!(comp.output(OutputId(2)).unwrap().damage(), &rect(100.0, 0.0, 110.0, 10.0));
    }

    #[test]
    fn run_without_damage_is_idle() {
        let (mut comp, _clock) = two_outputs();
        assert!(run(&mut comp, OutputId(1)).painted().is_some(), "new outputs repaint in full");
        assert!(matches!(run(&mut comp, OutputId(1)), RunOutcome::Idle));
        assert!(comp.output(OutputId(1)).unwrap().is_idle());
        assert_eq!(comp.frame_count(), 1);
    }

    #[test]
    fn locked_compositor_keeps_damage_and_repaints_fully_on_last_unlock() {
        let (mut comp, _clock) = two_outputs();
        run(&mut comp, OutputId(1));
        run(&mut comp, OutputId(2));
        comp.lock();
        comp.lock();
        comp.schedule_repaint(&rect(0.0, 0.0, 5.0, 5.0));
        assert_eq!(comp.next_deadline(), None, "no timer while locked");
        assert!(matches!(run(&mut comp, OutputId(1)), RunOutcome::Locked));
        comp.unlock();
        assert!(comp.is_locked());
        comp.unlock();
        assert!(!comp.is_locked());
        assert!(comp.output(OutputId(1)).unwrap().needs_full_repaint());
        assert!(comp.output(OutputId(2)).unwrap().needs_full_repaint());
        assert!(comp.next_deadline().is_some());
    }

    #[test]
    fn timer_fires_after_refresh_without_swap_events() {
        let (mut comp, clock) = two_outputs();
        let mut gpu = HeadlessGpu::new();
        let ran = comp.dispatch_timers(&mut gpu, &mut NoSync, &mut Tracer::none());
        assert_eq!(ran.len(), 2, "both new outputs are due immediately");

        comp.schedule_repaint(&rect(0.0, 0.0, 10.0, 10.0));
        let deadline = comp.output(OutputId(1)).unwrap().deadline().unwrap();
        assert_eq!(deadline, HostTime::from_millis(1000) + Duration(16_666_666));
        assert!(comp.dispatch_timers(&mut gpu, &mut NoSync, &mut Tracer::none()).is_empty());
        clock.set(deadline);
        let ran = comp.dispatch_timers(&mut gpu, &mut NoSync, &mut Tracer::none());
        assert!(ran.iter().any(|(id, o)| *id == OutputId(1) && o.painted().is_some()));
    }

    #[test]
    fn swap_pending_blocks_runs_until_swap_complete() {
        let clock = Rc::new(ManualClock::new(HostTime(0)));
        let mut comp = Compositor::new(
            RenderConfig::with_swap_events(),
            EffectChain::default(),
            Rc::clone(&clock) as Rc<dyn Clock>,
        );
        let id = OutputId(0);
        comp.add_output(id, OutputInfo::new(Rect::new(0.0, 0.0, 10.0, 10.0), 50_000));
        assert!(run(&mut comp, id).painted().is_some());
        comp.schedule_repaint(&rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(comp.next_deadline(), None, "timer waits for the swap");
        assert!(matches!(run(&mut comp, id), RunOutcome::SwapPending));

        clock.set(HostTime::from_millis(5));
        assert!(comp.swap_complete(id, SwapFeedback::software()));
        assert!(!comp.swap_complete(id, SwapFeedback::software()), "only one swap was pending");
        // 20 ms refresh minus 2 ms margin.
        assert_eq!(comp.next_deadline(), Some(HostTime::from_millis(23)));
        assert!(run(&mut comp, id).painted().is_some());
    }

    #[test]
    fn removed_output_drops_its_state() {
        let (mut comp, _clock) = two_outputs();
        comp.schedule_repaint(&rect(150.0, 0.0, 160.0, 10.0));
        assert!(comp.remove_output(OutputId(2)));
        assert!(!comp.remove_output(OutputId(2)));
        assert!(matches!(run(&mut comp, OutputId(2)), RunOutcome::UnknownOutput));
        assert!(comp.output_ids().eq([OutputId(1)]));
    }

    #[test]
    fn max_coverage_ties_go_to_lowest_id() {
        let (comp, _clock) = two_outputs();
        assert_eq!(
            comp.max_coverage_output(Rect::new(80.0, 0.0, 130.0, 10.0)),
            Some(OutputId(2)),
            "30 px on the second output beats 20 px on the first"
        );
        assert_eq!(comp.max_coverage_output(Rect::new(90.0, 0.0, 110.0, 10.0)), Some(OutputId(1)));
        assert_eq!(comp.max_coverage_output(Rect::new(500.0, 0.0, 510.0, 10.0)), Some(OutputId(1)));
    }

    #[test]
    fn frame_callback_is_honored_by_max_coverage_output_only() {
        let (mut comp, _clock) = two_outputs();
        let w = comp.windows_mut().create_window(Rect::new(120.0, 0.0, 180.0, 50.0));
        comp.request_frame_callback(w);
        run(&mut comp, OutputId(1));
        assert!(comp.take_frame_callbacks(OutputId(1)).is_empty());
        run(&mut comp, OutputId(2));
        assert_eq!(comp.take_frame_callbacks(OutputId(2)), [w]);
        assert!(comp.take_frame_callbacks(OutputId(2)).is_empty(), "callbacks are taken once");
    }

    #[test]
    fn closed_window_without_refs_is_reaped_after_run() {
        let (mut comp, _clock) = two_outputs();
        let w = comp.windows_mut().create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        run(&mut comp, OutputId(1));
        comp.windows_mut().close_window(w);
        assert!(run(&mut comp, OutputId(1)).painted().is_some(), "closing damages the window area");
        assert!(!comp.windows().is_alive(w));
    }
}
