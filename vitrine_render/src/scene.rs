// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene painter: one output, one frame, through the effect chain.
//!
//! ```text
//!   start_paint
//!   pre_paint_screen                        damage ──► ScreenPrePaintData
//!   pre_paint_window   bottom ──► top       per-window paint + clip
//!   occlusion          top ──► bottom       region = paint − clip above
//!   paint_screen
//!   paint_window       bottom ──► top       skipped when region is empty
//!   finish_paint_screen
//!   post_paint_window  bottom ──► top       every window, painted or not
//!   post_paint_screen
//! ```
//!
//! Fence hooks bracket the whole pass; see [`FrameSync`].

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};
use vitrine_core::output::OutputId;
use vitrine_core::region::Region;
use vitrine_core::time::{Clock, HostTime};
use vitrine_core::trace::{
    EffectFaultEvent, FenceEvent, FrameBeginEvent, FrameSummary, FrameSummaryBuilder, PaintPhase,
    PhaseBeginEvent, PhaseEndEvent, Tracer,
};
use vitrine_core::window::{WindowFlags, WindowId, WindowStore};
use vitrine_effects::paint::{
    ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData,
};
use vitrine_effects::{
    EffectChain, EffectContext, FramebufferStack, GpuBackend, PaintMask, RepaintRequests,
};

use crate::sync::{FrameSync, SyncReport};

/// Returns the windows to paint, bottom to top.
///
/// Windows with a reason not to be painted (hidden, closed, minimized, on
/// another desktop) are left out unless a
/// [`VisibleRef`](vitrine_core::window::VisibleRef) overrides that reason.
/// Elevated windows go on top, keeping their relative order.
#[must_use]
pub fn paint_order(windows: &WindowStore) -> Vec<WindowId> {
    let (elevated, mut order): (Vec<_>, Vec<_>) = windows
        .stacking_order()
        .into_iter()
        .filter(|&w| windows.paint_disabled(w).is_empty())
        .partition(|&w| windows.flags(w).contains(WindowFlags::ELEVATED));
    order.extend(elevated);
    order
}

/// What the compositor hands the scene for one frame.
#[derive(Debug)]
pub(crate) struct FrameRequest {
    pub(crate) frame_index: u64,
    pub(crate) output: OutputId,
    pub(crate) geometry: Rect,
    pub(crate) damage: Region,
    pub(crate) full: bool,
    pub(crate) present: HostTime,
}

/// The collaborators a frame borrows.
pub(crate) struct SceneContext<'a, 't> {
    pub(crate) windows: &'a mut WindowStore,
    pub(crate) chain: &'a mut EffectChain,
    pub(crate) gpu: &'a mut dyn GpuBackend,
    pub(crate) framebuffers: &'a mut FramebufferStack,
    pub(crate) repaints: &'a mut RepaintRequests,
    pub(crate) sync: &'a mut dyn FrameSync,
    pub(crate) tracer: &'a mut Tracer<'t>,
    pub(crate) clock: &'a dyn Clock,
}

/// What a painted frame produced.
#[derive(Debug)]
pub(crate) struct PaintedFrame {
    pub(crate) summary: FrameSummary,
    /// Start of the frame to the end of post-paint.
    pub(crate) paint_end: HostTime,
    /// When submission (including the fence update) finished.
    pub(crate) render_end: HostTime,
}

#[derive(Debug)]
struct WindowPass {
    window: WindowId,
    pre: WindowPrePaintData,
    region: Region,
}

/// Phase timestamps go both to the tracer and into the frame summary.
struct PhaseTimer<'a, 't> {
    tracer: &'a mut Tracer<'t>,
    clock: &'a dyn Clock,
    frame_index: u64,
    summary: FrameSummaryBuilder,
}

impl PhaseTimer<'_, '_> {
    fn begin(&mut self, phase: PaintPhase) {
        let timestamp = self.clock.now();
        self.summary.phase_begin(phase, timestamp);
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn end(&mut self, phase: PaintPhase) {
        let timestamp = self.clock.now();
        self.summary.phase_end(phase, timestamp);
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }
}

/// Paints frames. Keeps per-window scratch between frames.
#[derive(Debug, Default)]
pub struct Scene {
    passes: Vec<WindowPass>,
}

impl Scene {
    /// Creates a scene with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn paint(&mut self, frame: FrameRequest, cx: SceneContext<'_, '_>) -> PaintedFrame {
        let SceneContext {
            windows,
            chain,
            gpu,
            framebuffers,
            repaints,
            sync,
            tracer,
            clock,
        } = cx;

        let begin = FrameBeginEvent {
            frame_index: frame.frame_index,
            output: frame.output,
            present_time: frame.present,
            damage_rects: frame.damage.rects().len(),
            full_repaint: frame.full,
        };
        tracer.frame_begin(&begin);
        #[cfg(feature = "trace-rich")]
        tracer.damage_rects(frame.frame_index, &damage_rects(&frame.damage));
        let mut timer = PhaseTimer {
            tracer,
            clock,
            frame_index: frame.frame_index,
            summary: FrameSummaryBuilder::new(&begin),
        };

        sync.begin_frame();
        chain.start_paint();
        let mut ctx = EffectContext::new(
            windows,
            gpu,
            framebuffers,
            repaints,
            frame.output,
            frame.geometry,
        );

        let mut screen_pre = ScreenPrePaintData {
            mask: if frame.full {
                PaintMask::empty()
            } else {
                PaintMask::SCREEN_REGION
            },
            paint: frame.damage,
        };
        timer.begin(PaintPhase::PrePaintScreen);
        chain.pre_paint_screen(&mut ctx, &mut screen_pre, frame.present);
        timer.end(PaintPhase::PrePaintScreen);
        if screen_pre.mask.intersects(PaintMask::FULL_REPAINT) {
            screen_pre.mask.remove(PaintMask::SCREEN_REGION);
            screen_pre.paint = Region::from_rect(frame.geometry);
        }

        self.passes.clear();
        timer.begin(PaintPhase::PrePaintWindow);
        for window in paint_order(ctx.windows) {
            let geometry = ctx.windows.geometry(window);
            let opaque = ctx.windows.flags(window).contains(WindowFlags::OPAQUE)
                && ctx.windows.opacity(window) >= 1.0;
            let mut pre = WindowPrePaintData {
                mask: if opaque {
                    PaintMask::WINDOW_OPAQUE
                } else {
                    PaintMask::WINDOW_TRANSLUCENT
                },
                paint: screen_pre.paint.intersected_rect(geometry),
                clip: if opaque {
                    Region::from_rect(geometry)
                } else {
                    Region::new()
                },
            };
            chain.pre_paint_window(&mut ctx, window, &mut pre, frame.present);
            // Effects may widen a window's paint (blur reads what is behind
            // it); the screen paint grows with it.
            screen_pre.paint.union_with(&pre.paint);
            self.passes.push(WindowPass {
                window,
                pre,
                region: Region::new(),
            });
        }
        timer.end(PaintPhase::PrePaintWindow);

        let occlude = !screen_pre.mask.contains(PaintMask::SCREEN_TRANSFORMED);
        let mut above = Region::new();
        for pass in self.passes.iter_mut().rev() {
            let mut region = if pass.pre.mask.contains(PaintMask::WINDOW_TRANSFORMED) {
                screen_pre.paint.clone()
            } else {
                screen_pre
                    .paint
                    .intersected_rect(ctx.windows.geometry(pass.window))
                    .union(&pass.pre.paint)
            };
            if occlude {
                region = region.subtracted(&above);
                above.union_with(&pass.pre.clip);
            }
            pass.region = region;
        }

        sync.before_paint();
        let mut screen = ScreenPaintData::new(frame.geometry);
        timer.begin(PaintPhase::PaintScreen);
        chain.paint_screen(&mut ctx, screen_pre.mask, &screen_pre.paint, &mut screen);
        timer.end(PaintPhase::PaintScreen);

        #[cfg(feature = "trace-rich")]
        let mut painted = Vec::new();
        timer.begin(PaintPhase::PaintWindow);
        for pass in &self.passes {
            if pass.region.is_empty() {
                continue;
            }
            let mut data = WindowPaintData::new(ctx.windows.opacity(pass.window));
            apply_screen_transform(&mut data, &screen);
            chain.paint_window(&mut ctx, pass.window, pass.pre.mask, &pass.region, &mut data);
            #[cfg(feature = "trace-rich")]
            painted.push(window_paint_event(pass, &data));
        }
        timer.end(PaintPhase::PaintWindow);

        timer.begin(PaintPhase::PaintScreen);
        chain.finish_paint_screen(&mut ctx, screen_pre.mask, &screen);
        timer.end(PaintPhase::PaintScreen);

        timer.begin(PaintPhase::PostPaintWindow);
        for pass in &self.passes {
            chain.post_paint_window(&mut ctx, pass.window);
        }
        timer.end(PaintPhase::PostPaintWindow);

        timer.begin(PaintPhase::PostPaintScreen);
        chain.post_paint_screen(&mut ctx);
        timer.end(PaintPhase::PostPaintScreen);

        let leaked = ctx.framebuffers.unwind(ctx.gpu);
        if leaked > 0 {
            tracing::warn!(
                output = frame.output.0,
                leaked,
                "framebuffers left bound after the frame; unwound"
            );
        }
        for fault in ctx.faults() {
            timer.tracer.effect_fault(&EffectFaultEvent {
                frame_index: frame.frame_index,
                effect: fault.effect,
                phase: fault.phase,
            });
        }
        for _ in 0..ctx.windows_painted() {
            timer.summary.window_painted();
        }
        timer
            .summary
            .set_repaint_requested(!ctx.repaints.is_empty());
        #[cfg(feature = "trace-rich")]
        timer.tracer.window_paints(frame.frame_index, &painted);
        let paint_end = clock.now();

        if let Some(SyncReport { slot, outcome }) = sync.end_frame() {
            timer.tracer.fence(&FenceEvent {
                frame_index: frame.frame_index,
                slot,
                outcome,
            });
        }
        let render_end = clock.now();

        let summary = timer.summary.finish();
        timer.tracer.frame_summary(&summary);
        PaintedFrame {
            summary,
            paint_end,
            render_end,
        }
    }
}

/// Folds the screen transform into a window's transform.
fn apply_screen_transform(data: &mut WindowPaintData, screen: &ScreenPaintData) {
    data.projection = screen.projection;
    if screen.transform.is_identity() {
        return;
    }
    let [tx, ty, _] = screen.transform.translation;
    let [sx, sy, _] = screen.transform.scale;
    data.transform.scale_by(sx, sy);
    data.transform.translate(Vec2::new(tx, ty));
}

#[cfg(feature = "trace-rich")]
#[expect(clippy::cast_possible_truncation, reason = "trace precision is enough")]
fn window_paint_event(
    pass: &WindowPass,
    data: &WindowPaintData,
) -> vitrine_core::trace::WindowPaintEvent {
    vitrine_core::trace::WindowPaintEvent {
        window_index: pass.window.index(),
        mask: pass.pre.mask.bits(),
        opacity: data.opacity as f32,
    }
}

#[cfg(feature = "trace-rich")]
#[expect(clippy::cast_possible_truncation, reason = "screen coordinates fit i32/u32")]
fn damage_rects(damage: &Region) -> Vec<vitrine_core::trace::DamageRect> {
    damage
        .rects()
        .iter()
        .map(|r| vitrine_core::trace::DamageRect {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width() as u32,
            height: r.height() as u32,
        })
        .collect()
}
