// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The effect chain and its driver.
//!
//! Slots are kept stably sorted by [`Effect::requested_position`], so
//! effects with equal positions keep their load order. Each paint hook is
//! dispatched to the first runnable slot with a [`Next`] cursor over the
//! slots after it. A slot is runnable when its effect reported
//! [`is_active`](Effect::is_active) at the start of the frame and has not
//! faulted.
//!
//! ```text
//!   chain.paint_window(w)
//!     └─ A.paint_window(w, next)          position 10
//!          └─ next.paint_window(w)
//!               └─ B.paint_window(w, next)   position 70
//!                    └─ next.paint_window(w)
//!                         └─ gpu.draw_window(w)
//! ```
//!
//! # Faults
//!
//! A hook returning `Err` is logged and recorded in the context. The slot is
//! marked faulted and skipped from then on until
//! [`reconfigure`](EffectChain::reconfigure) or a reload. If the failing
//! effect had not forwarded yet, the call continues past it, so one broken
//! effect never drops a window from the frame.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use vitrine_core::deferred::Invoker;
use vitrine_core::effect::EffectId;
use vitrine_core::region::Region;
use vitrine_core::time::HostTime;
use vitrine_core::trace::PaintPhase;
use vitrine_core::window::{WindowId, WindowStore};

use crate::config::AnimationConfig;
use crate::effect::{
    Effect, EffectContext, EffectFault, Feature, LifecycleContext, Next, ReconfigureFlags,
    RepaintRequests,
};
use crate::error::{EffectError, LoadError};
use crate::framebuffer::GpuBackend;
use crate::integration::Integrations;
use crate::load_queue::{EffectLoadQueue, LoadRequest};
use crate::paint::{
    PaintMask, ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData,
};

/// One loaded effect and its per-frame state.
pub(crate) struct EffectSlot {
    id: EffectId,
    name: String,
    position: i32,
    effect: Box<dyn Effect>,
    active: bool,
    faulted: bool,
}

impl EffectSlot {
    fn runs(&self) -> bool {
        self.active && !self.faulted
    }

    fn fault(&mut self, phase: PaintPhase, error: &EffectError) -> EffectFault {
        tracing::warn!(
            effect = %self.name,
            phase = phase.name(),
            %error,
            "effect failed; excluded until reconfigured"
        );
        self.faulted = true;
        EffectFault {
            effect: self.id,
            phase,
        }
    }
}

impl fmt::Debug for EffectSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSlot")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("active", &self.active)
            .field("faulted", &self.faulted)
            .finish_non_exhaustive()
    }
}

/// The ordered set of loaded effects.
pub struct EffectChain {
    slots: Vec<EffectSlot>,
    next_id: u32,
    integrations: Integrations,
    config: AnimationConfig,
}

impl fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectChain")
            .field("slots", &self.slots)
            .field("integrations", &self.integrations)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new(AnimationConfig::new())
    }
}

impl EffectChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
            integrations: Integrations::new(),
            config,
        }
    }

    // -- Loading --

    /// Inserts an effect under `name`.
    ///
    /// The effect is attached to the integrations (replaying existing window
    /// state in `stacking` order), configured with
    /// [`ReconfigureFlags::INITIAL`] and placed after every loaded effect with
    /// a position less than or equal to its own.
    pub fn load(
        &mut self,
        name: &str,
        mut effect: Box<dyn Effect>,
        stacking: &[WindowId],
    ) -> Result<EffectId, LoadError> {
        if self.is_loaded(name) {
            return Err(LoadError::AlreadyLoaded(name.to_string()));
        }
        self.next_id += 1;
        let id = EffectId(self.next_id);
        effect.attach(id, &mut self.integrations, stacking);
        effect.reconfigure(ReconfigureFlags::INITIAL, &self.config);
        let position = effect.requested_position();
        let index = self.slots.partition_point(|s| s.position <= position);
        self.slots.insert(
            index,
            EffectSlot {
                id,
                name: name.to_string(),
                position,
                effect,
                active: false,
                faulted: false,
            },
        );
        tracing::debug!(effect = name, ?id, position, "effect loaded");
        Ok(id)
    }

    /// Removes the effect named `name`, releasing its grabs, integration
    /// subscriptions and GPU resources. Its per-window state (including any
    /// lifetime refs) is dropped with it.
    pub fn unload(
        &mut self,
        name: &str,
        windows: &mut WindowStore,
        gpu: &mut dyn GpuBackend,
    ) -> Option<EffectId> {
        let index = self.slots.iter().position(|s| s.name == name)?;
        let mut slot = self.slots.remove(index);
        self.integrations.remove_effect(slot.id);
        windows.release_grabs_of(slot.id);
        slot.effect.release_resources(gpu);
        tracing::debug!(effect = name, id = ?slot.id, "effect unloaded");
        Some(slot.id)
    }

    /// Unloads `name` and queues it to be loaded again.
    pub fn reload(
        &mut self,
        name: &str,
        windows: &mut WindowStore,
        gpu: &mut dyn GpuBackend,
        queue: &mut EffectLoadQueue,
        invoker: &mut dyn Invoker,
    ) -> bool {
        if self.unload(name, windows, gpu).is_none() {
            return false;
        }
        queue.enqueue(LoadRequest::new(name), invoker);
        true
    }

    /// Re-reads configuration in every effect and clears faults.
    pub fn reconfigure(&mut self, flags: ReconfigureFlags) {
        for slot in &mut self.slots {
            if slot.faulted {
                tracing::debug!(effect = %slot.name, "fault cleared by reconfigure");
            }
            slot.faulted = false;
            slot.effect.reconfigure(flags, &self.config);
        }
    }

    /// Replaces the animation settings and reconfigures every effect.
    pub fn set_config(&mut self, config: AnimationConfig) {
        self.config = config;
        self.reconfigure(ReconfigureFlags::ANIMATION);
    }

    /// Current animation settings.
    #[must_use]
    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    // -- Queries --

    /// Returns `true` if an effect named `name` is loaded.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// Id of the effect named `name`.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<EffectId> {
        self.slots.iter().find(|s| s.name == name).map(|s| s.id)
    }

    /// Names of loaded effects, in chain order.
    pub fn loaded_effects(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Names of effects that run this frame, in chain order.
    #[must_use]
    pub fn active_effects(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.runs())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Returns `true` if the effect named `name` is faulted.
    #[must_use]
    pub fn is_faulted(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name && s.faulted)
    }

    /// Returns `true` if a loaded, healthy effect provides `feature`.
    #[must_use]
    pub fn provides(&self, feature: Feature) -> bool {
        self.slots
            .iter()
            .any(|s| !s.faulted && s.effect.provides(feature))
    }

    /// Number of loaded effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no effect is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The integration registries, for producers.
    pub fn integrations_mut(&mut self) -> &mut Integrations {
        &mut self.integrations
    }

    /// The integration registries.
    #[must_use]
    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    // -- Window lifecycle --

    /// Notifies effects in chain order that `window` was mapped.
    pub fn window_added(
        &mut self,
        window: WindowId,
        windows: &mut WindowStore,
        repaints: &mut RepaintRequests,
    ) {
        for slot in self.slots.iter_mut().filter(|s| !s.faulted) {
            let mut ctx = LifecycleContext {
                effect: slot.id,
                windows: &mut *windows,
                repaints: &mut *repaints,
                config: &self.config,
            };
            slot.effect.window_added(window, &mut ctx);
        }
    }

    /// Notifies effects in chain order that `window` was closed.
    pub fn window_closed(
        &mut self,
        window: WindowId,
        windows: &mut WindowStore,
        repaints: &mut RepaintRequests,
    ) {
        for slot in self.slots.iter_mut().filter(|s| !s.faulted) {
            let mut ctx = LifecycleContext {
                effect: slot.id,
                windows: &mut *windows,
                repaints: &mut *repaints,
                config: &self.config,
            };
            slot.effect.window_closed(window, &mut ctx);
        }
    }

    /// Invalidates `window` in every integration and tells every effect,
    /// faulted or not, to drop its state for it.
    pub fn window_deleted(&mut self, window: WindowId) {
        self.integrations.window_removed(window);
        for slot in &mut self.slots {
            slot.effect.window_deleted(window);
        }
    }

    // -- Frame --

    /// Samples [`Effect::is_active`] for every effect. Call once before the
    /// first paint phase of a frame. Returns `true` if any effect runs.
    pub fn start_paint(&mut self) -> bool {
        let mut any = false;
        for slot in &mut self.slots {
            slot.active = slot.effect.is_active();
            any |= slot.runs();
        }
        any
    }

    /// Runs the screen pre-paint phase.
    pub fn pre_paint_screen(
        &mut self,
        ctx: &mut EffectContext<'_>,
        data: &mut ScreenPrePaintData,
        present: HostTime,
    ) {
        pre_paint_screen(&mut self.slots, ctx, data, present);
    }

    /// Runs the window pre-paint phase for one window.
    pub fn pre_paint_window(
        &mut self,
        ctx: &mut EffectContext<'_>,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
    ) {
        pre_paint_window(&mut self.slots, ctx, window, data, present);
    }

    /// Runs the screen paint phase, before any window is drawn.
    pub fn paint_screen(
        &mut self,
        ctx: &mut EffectContext<'_>,
        mask: PaintMask,
        region: &Region,
        data: &mut ScreenPaintData,
    ) {
        paint_screen(&mut self.slots, ctx, mask, region, data);
    }

    /// Runs [`Effect::finish_paint_screen`] in reverse chain order.
    pub fn finish_paint_screen(
        &mut self,
        ctx: &mut EffectContext<'_>,
        mask: PaintMask,
        data: &ScreenPaintData,
    ) {
        for slot in self.slots.iter_mut().rev().filter(|s| s.runs()) {
            if let Err(error) = slot.effect.finish_paint_screen(ctx, mask, data) {
                let fault = slot.fault(PaintPhase::PaintScreen, &error);
                ctx.faults.push(fault);
            }
        }
    }

    /// Paints one window through the chain.
    pub fn paint_window(
        &mut self,
        ctx: &mut EffectContext<'_>,
        window: WindowId,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        paint_window(&mut self.slots, ctx, window, mask, region, data);
    }

    /// Runs the window post-paint phase for one window.
    pub fn post_paint_window(&mut self, ctx: &mut EffectContext<'_>, window: WindowId) {
        post_paint_window(&mut self.slots, ctx, window);
    }

    /// Runs the screen post-paint phase.
    pub fn post_paint_screen(&mut self, ctx: &mut EffectContext<'_>) {
        post_paint_screen(&mut self.slots, ctx);
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Splits off the first runnable slot.
fn split_active(slots: &mut [EffectSlot]) -> Option<(&mut EffectSlot, &mut [EffectSlot])> {
    let (first, rest) = slots.split_first_mut()?;
    if first.runs() {
        Some((first, rest))
    } else {
        split_active(rest)
    }
}

/// Calls `hook` on the first runnable slot, or `tail` if none is left.
fn dispatch<'c, A, H, T>(
    rest: &mut [EffectSlot],
    ctx: &mut EffectContext<'c>,
    phase: PaintPhase,
    args: &mut A,
    hook: &H,
    tail: &T,
) where
    H: Fn(&mut dyn Effect, &mut A, &mut Next<'_, 'c>) -> Result<(), EffectError>,
    T: Fn(&mut EffectContext<'c>, &mut A),
{
    let Some((slot, rest)) = split_active(rest) else {
        tail(ctx, args);
        return;
    };
    let mut next = Next {
        rest: &mut *rest,
        ctx: &mut *ctx,
        forwarded: false,
    };
    let result = hook(slot.effect.as_mut(), args, &mut next);
    let forwarded = next.forwarded;
    if let Err(error) = result {
        let fault = slot.fault(phase, &error);
        ctx.faults.push(fault);
        if !forwarded {
            dispatch(rest, ctx, phase, args, hook, tail);
        }
    }
}

pub(crate) fn pre_paint_screen(
    slots: &mut [EffectSlot],
    ctx: &mut EffectContext<'_>,
    data: &mut ScreenPrePaintData,
    present: HostTime,
) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PrePaintScreen,
        &mut (data, present),
        &|e, a, next| e.pre_paint_screen(&mut *a.0, a.1, next),
        &|_, _| {},
    );
}

pub(crate) fn pre_paint_window(
    slots: &mut [EffectSlot],
    ctx: &mut EffectContext<'_>,
    window: WindowId,
    data: &mut WindowPrePaintData,
    present: HostTime,
) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PrePaintWindow,
        &mut (window, data, present),
        &|e, a, next| e.pre_paint_window(a.0, &mut *a.1, a.2, next),
        &|_, _| {},
    );
}

pub(crate) fn paint_screen(
    slots: &mut [EffectSlot],
    ctx: &mut EffectContext<'_>,
    mask: PaintMask,
    region: &Region,
    data: &mut ScreenPaintData,
) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PaintScreen,
        &mut (mask, region, data),
        &|e, a, next| e.paint_screen(a.0, a.1, &mut *a.2, next),
        &|_, _| {},
    );
}

pub(crate) fn paint_window(
    slots: &mut [EffectSlot],
    ctx: &mut EffectContext<'_>,
    window: WindowId,
    mask: PaintMask,
    region: &Region,
    data: &mut WindowPaintData,
) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PaintWindow,
        &mut (window, mask, region, data),
        &|e, a, next| e.paint_window(a.0, a.1, a.2, &mut *a.3, next),
        &|ctx, a| {
            let geometry = ctx.windows.geometry(a.0);
            ctx.gpu.draw_window(a.0, geometry, a.2, &*a.3);
            ctx.windows_painted += 1;
        },
    );
}

pub(crate) fn post_paint_window(
    slots: &mut [EffectSlot],
    ctx: &mut EffectContext<'_>,
    window: WindowId,
) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PostPaintWindow,
        &mut (window,),
        &|e, a, next| e.post_paint_window(a.0, next),
        &|_, _| {},
    );
}

pub(crate) fn post_paint_screen(slots: &mut [EffectSlot], ctx: &mut EffectContext<'_>) {
    dispatch(
        slots,
        ctx,
        PaintPhase::PostPaintScreen,
        &mut (),
        &|e, _, next| e.post_paint_screen(next),
        &|_, _| {},
    );
}
