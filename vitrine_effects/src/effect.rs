// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Effect`] capability trait and the contexts effects run in.
//!
//! Every hook has a default body that forwards to the rest of the chain, so
//! an effect overrides only what it cares about. Paint hooks receive a
//! [`Next`] cursor: calling the matching method on it runs every later
//! effect and finally the built-in painter. An effect that returns without
//! forwarding suppresses the call for everything after it.

use alloc::vec::Vec;

use kurbo::Rect;
use vitrine_core::effect::EffectId;
use vitrine_core::output::OutputId;
use vitrine_core::region::Region;
use vitrine_core::time::HostTime;
use vitrine_core::trace::PaintPhase;
use vitrine_core::window::{WindowId, WindowStore};

use crate::chain::{self, EffectSlot};
use crate::config::AnimationConfig;
use crate::error::EffectError;
use crate::framebuffer::{FramebufferStack, GpuBackend};
use crate::integration::Integrations;
use crate::paint::{
    PaintMask, ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData,
};

bitflags::bitflags! {
    /// What changed when [`Effect::reconfigure`] is called.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ReconfigureFlags: u8 {
        /// First configuration right after loading.
        const INITIAL = 1 << 0;
        /// Animation settings changed.
        const ANIMATION = 1 << 1;
        /// Everything should be re-read.
        const ALL = Self::INITIAL.bits() | Self::ANIMATION.bits();
    }
}

/// Capabilities an effect can advertise to the rest of the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Blurs the background behind windows.
    Blur,
    /// Adjusts the contrast of the background behind windows.
    Contrast,
    /// Animates popups sliding from a screen edge.
    SlidePopups,
}

/// Repaints requested by effects during a frame or lifecycle hook.
///
/// The compositor drains these after the frame and schedules them on the
/// affected outputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepaintRequests {
    full: bool,
    region: Region,
    windows: Vec<WindowId>,
}

impl RepaintRequests {
    /// Creates an empty request set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            full: false,
            region: Region::new(),
            windows: Vec::new(),
        }
    }

    /// Requests a repaint of every output.
    pub fn full(&mut self) {
        self.full = true;
    }

    /// Requests a repaint of `rect` in global coordinates.
    pub fn rect(&mut self, rect: Rect) {
        self.region.add_rect(rect);
    }

    /// Requests a repaint of `region` in global coordinates.
    pub fn region(&mut self, region: &Region) {
        self.region.union_with(region);
    }

    /// Requests a repaint of a window's current area.
    pub fn window(&mut self, window: WindowId) {
        if !self.windows.contains(&window) {
            self.windows.push(window);
        }
    }

    /// Returns `true` if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.full && self.region.is_empty() && self.windows.is_empty()
    }

    /// Whether a full repaint was requested.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Resolves every request to a region using the window store, and
    /// clears the set. Returns `None` for a full repaint.
    pub fn take(&mut self, windows: &WindowStore) -> Option<Region> {
        let full = core::mem::take(&mut self.full);
        let mut region = core::mem::take(&mut self.region);
        for window in self.windows.drain(..) {
            if windows.is_alive(window) {
                region.add_rect(windows.geometry(window));
            }
        }
        if full { None } else { Some(region) }
    }
}

/// A fault recorded by the chain driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectFault {
    /// The effect that failed.
    pub effect: EffectId,
    /// The phase it failed in.
    pub phase: PaintPhase,
}

/// Everything an effect can touch while painting one output.
#[derive(Debug)]
pub struct EffectContext<'c> {
    /// The window model.
    pub windows: &'c mut WindowStore,
    /// The GPU backend.
    pub gpu: &'c mut dyn GpuBackend,
    /// This output's framebuffer stack.
    pub framebuffers: &'c mut FramebufferStack,
    /// Repaints requested during the frame.
    pub repaints: &'c mut RepaintRequests,
    /// Output being painted.
    pub output: OutputId,
    /// Geometry of that output in global coordinates.
    pub output_geometry: Rect,
    pub(crate) faults: Vec<EffectFault>,
    pub(crate) windows_painted: u32,
}

impl<'c> EffectContext<'c> {
    /// Creates a context for painting `output`.
    pub fn new(
        windows: &'c mut WindowStore,
        gpu: &'c mut dyn GpuBackend,
        framebuffers: &'c mut FramebufferStack,
        repaints: &'c mut RepaintRequests,
        output: OutputId,
        output_geometry: Rect,
    ) -> Self {
        Self {
            windows,
            gpu,
            framebuffers,
            repaints,
            output,
            output_geometry,
            faults: Vec::new(),
            windows_painted: 0,
        }
    }

    /// Faults recorded so far in this frame.
    #[must_use]
    pub fn faults(&self) -> &[EffectFault] {
        &self.faults
    }

    /// Number of windows that reached the final painter.
    #[must_use]
    pub fn windows_painted(&self) -> u32 {
        self.windows_painted
    }
}

/// What lifecycle hooks may touch.
#[derive(Debug)]
pub struct LifecycleContext<'c> {
    /// The effect receiving the hook.
    pub effect: EffectId,
    /// The window model.
    pub windows: &'c mut WindowStore,
    /// Repaints to schedule.
    pub repaints: &'c mut RepaintRequests,
    /// Current animation settings.
    pub config: &'c AnimationConfig,
}

/// Cursor over the rest of the chain, handed to paint hooks.
///
/// Calling a method runs the remaining effects for that hook and then the
/// built-in behaviour. Calling it more than once runs them again (an effect
/// painting a window twice, for instance).
#[derive(Debug)]
pub struct Next<'n, 'c> {
    pub(crate) rest: &'n mut [EffectSlot],
    pub(crate) ctx: &'n mut EffectContext<'c>,
    pub(crate) forwarded: bool,
}

impl<'c> Next<'_, 'c> {
    /// The paint context.
    pub fn ctx(&mut self) -> &mut EffectContext<'c> {
        self.ctx
    }

    /// Forwards [`Effect::pre_paint_screen`].
    pub fn pre_paint_screen(&mut self, data: &mut ScreenPrePaintData, present: HostTime) {
        self.forwarded = true;
        chain::pre_paint_screen(self.rest, self.ctx, data, present);
    }

    /// Forwards [`Effect::pre_paint_window`].
    pub fn pre_paint_window(
        &mut self,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
    ) {
        self.forwarded = true;
        chain::pre_paint_window(self.rest, self.ctx, window, data, present);
    }

    /// Forwards [`Effect::paint_screen`].
    pub fn paint_screen(&mut self, mask: PaintMask, region: &Region, data: &mut ScreenPaintData) {
        self.forwarded = true;
        chain::paint_screen(self.rest, self.ctx, mask, region, data);
    }

    /// Forwards [`Effect::paint_window`]. At the end of the chain the window
    /// is drawn into the currently bound target.
    pub fn paint_window(
        &mut self,
        window: WindowId,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        self.forwarded = true;
        chain::paint_window(self.rest, self.ctx, window, mask, region, data);
    }

    /// Forwards [`Effect::post_paint_window`].
    pub fn post_paint_window(&mut self, window: WindowId) {
        self.forwarded = true;
        chain::post_paint_window(self.rest, self.ctx, window);
    }

    /// Forwards [`Effect::post_paint_screen`].
    pub fn post_paint_screen(&mut self) {
        self.forwarded = true;
        chain::post_paint_screen(self.rest, self.ctx);
    }
}

/// A visual effect plugged into the chain.
///
/// Effects are owned exclusively by the [`EffectChain`](crate::EffectChain).
/// Per-window state belongs in the effect and must be dropped in
/// [`window_deleted`](Self::window_deleted).
///
/// Paint hooks return `Err` to report a failure. The chain driver logs it,
/// completes the call as if the effect had forwarded, and excludes the
/// effect until it is reconfigured or reloaded.
pub trait Effect {
    /// Reads configuration. Called once after loading with
    /// [`ReconfigureFlags::INITIAL`] and again whenever settings change.
    fn reconfigure(&mut self, flags: ReconfigureFlags, config: &AnimationConfig) {
        _ = (flags, config);
    }

    /// Whether the effect wants paint hooks this frame. Sampled once at the
    /// start of each frame.
    fn is_active(&self) -> bool {
        true
    }

    /// Position in the chain, normally in `0..=100`. Lower runs outer
    /// (first).
    fn requested_position(&self) -> i32 {
        0
    }

    /// Whether the effect provides `feature`.
    fn provides(&self, feature: Feature) -> bool {
        _ = feature;
        false
    }

    /// Called once after loading with the effect's id. Subscribe to
    /// integrations here.
    fn attach(&mut self, id: EffectId, integrations: &mut Integrations, stacking: &[WindowId]) {
        _ = (id, integrations, stacking);
    }

    /// Frees GPU resources before the effect is dropped.
    fn release_resources(&mut self, gpu: &mut dyn GpuBackend) {
        _ = gpu;
    }

    /// First screen phase, in chain order. Advance timelines and set screen
    /// mask bits here.
    fn pre_paint_screen(
        &mut self,
        data: &mut ScreenPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.pre_paint_screen(data, present);
        Ok(())
    }

    /// Per-window preparation, bottom to top.
    fn pre_paint_window(
        &mut self,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.pre_paint_window(window, data, present);
        Ok(())
    }

    /// Screen paint, in chain order, before any window is drawn.
    fn paint_screen(
        &mut self,
        mask: PaintMask,
        region: &Region,
        data: &mut ScreenPaintData,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.paint_screen(mask, region, data);
        Ok(())
    }

    /// Called after every window has been drawn, in reverse chain order.
    /// Pop framebuffers pushed in [`paint_screen`](Self::paint_screen) here.
    fn finish_paint_screen(
        &mut self,
        ctx: &mut EffectContext<'_>,
        mask: PaintMask,
        data: &ScreenPaintData,
    ) -> Result<(), EffectError> {
        _ = (ctx, mask, data);
        Ok(())
    }

    /// Draws one window. Forward to draw it, or substitute the draw.
    fn paint_window(
        &mut self,
        window: WindowId,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.paint_window(window, mask, region, data);
        Ok(())
    }

    /// Per-window bookkeeping after painting.
    fn post_paint_window(
        &mut self,
        window: WindowId,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.post_paint_window(window);
        Ok(())
    }

    /// Last phase. Drop finished animations and request repaints here.
    fn post_paint_screen(&mut self, next: &mut Next<'_, '_>) -> Result<(), EffectError> {
        next.post_paint_screen();
        Ok(())
    }

    /// A window was mapped.
    fn window_added(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        _ = (window, ctx);
    }

    /// A window was closed and is now a remnant. Take a
    /// [`DeletedRef`](vitrine_core::window::DeletedRef) to keep it.
    fn window_closed(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        _ = (window, ctx);
    }

    /// A remnant is about to be removed. Drop all state for it.
    fn window_deleted(&mut self, window: WindowId) {
        _ = window;
    }
}
