// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blur-behind.
//!
//! For every window with a blur hint, the already painted background inside
//! the hinted region is blurred before the window itself is drawn:
//!
//! ```text
//!   bound target ──copy_to──► A
//!   push B ── draw A with blur shader ── pop
//!   draw B into bound target, clipped to the hinted shape
//! ```
//!
//! The blur samples up to `2 × radius` pixels outside the shape, so the
//! window pre-paint pass widens repaints that touch a blurred area and stops
//! windows above from occluding the pixels the blur reads.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::{Rect, Vec2};
use vitrine_core::effect::EffectId;
use vitrine_core::region::Region;
use vitrine_core::time::HostTime;
use vitrine_core::window::{WindowId, WindowStore};

use super::{expanded, window_area};
use crate::effect::{Effect, EffectContext, Feature, Next};
use crate::error::EffectError;
use crate::framebuffer::{
    DrawParams, GpuBackend, OffscreenTarget, ShaderId, ShaderKind, target_size,
};
use crate::integration::Integrations;
use crate::paint::{PaintMask, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};

/// Chain position of [`BlurEffect`].
pub const BLUR_POSITION: i32 = 20;

/// Blur kernel radius used by the built-in loader.
pub const DEFAULT_BLUR_RADIUS: u8 = 12;

type Regions = Rc<RefCell<BTreeMap<WindowId, Region>>>;

/// Background blur behind hinted windows.
#[derive(Debug)]
pub struct BlurEffect {
    regions: Regions,
    radius: u8,
    shader: ShaderId,
    targets: [OffscreenTarget; 2],
    painted_area: Region,
    current_blur: Region,
}

impl BlurEffect {
    /// Compiles the blur shader and creates the effect.
    pub fn new(gpu: &mut dyn GpuBackend, radius: u8) -> Result<Self, EffectError> {
        let shader = gpu.compile_shader(ShaderKind::Blur { radius })?;
        Ok(Self {
            regions: Rc::default(),
            radius,
            shader,
            targets: [OffscreenTarget::new(); 2],
            painted_area: Region::new(),
            current_blur: Region::new(),
        })
    }

    /// Kernel radius in pixels.
    #[must_use]
    pub fn radius(&self) -> u8 {
        self.radius
    }

    /// How far outside its shape the blur samples.
    fn expand_size(&self) -> f64 {
        f64::from(self.radius) * 2.0
    }

    /// The window's blur shape in global coordinates, if it has a hint.
    fn blur_area(&self, windows: &WindowStore, window: WindowId) -> Option<Region> {
        let regions = self.regions.borrow();
        let local = regions.get(&window)?;
        Some(window_area(windows, window, local))
    }

    fn should_blur(mask: PaintMask, data: &WindowPaintData) -> bool {
        if mask.contains(PaintMask::WINDOW_FORCE_BLUR) {
            return true;
        }
        !mask.contains(PaintMask::WINDOW_TRANSFORMED) && data.transform.is_identity()
    }

    fn do_blur(
        &mut self,
        ctx: &mut EffectContext<'_>,
        shape: &Region,
        opacity: f64,
    ) -> Result<(), EffectError> {
        let bounds = shape.bounding_box();
        let (width, height) = target_size(bounds);
        let [a, b] = &mut self.targets;
        let source = a.ensure(ctx.gpu, width, height)?;
        let scratch = b.ensure(ctx.gpu, width, height)?;
        let local = Rect::from_origin_size((0.0, 0.0), bounds.size());

        ctx.gpu.copy_to(source, bounds);
        ctx.framebuffers.push(ctx.gpu, scratch);
        ctx.gpu.draw_texture(
            source,
            local,
            &DrawParams {
                shader: Some(self.shader),
                ..DrawParams::default()
            },
        );
        ctx.framebuffers.pop(ctx.gpu)?;
        ctx.gpu.draw_texture(
            scratch,
            bounds,
            &DrawParams {
                opacity,
                clip: shape.clone(),
                ..DrawParams::default()
            },
        );
        Ok(())
    }
}

impl Effect for BlurEffect {
    fn is_active(&self) -> bool {
        !self.regions.borrow().is_empty()
    }

    fn requested_position(&self) -> i32 {
        BLUR_POSITION
    }

    fn provides(&self, feature: Feature) -> bool {
        feature == Feature::Blur
    }

    fn attach(&mut self, id: EffectId, integrations: &mut Integrations, stacking: &[WindowId]) {
        let regions = Rc::clone(&self.regions);
        integrations.blur.add(
            id,
            Box::new(move |update| {
                let mut regions = regions.borrow_mut();
                match update.window {
                    None => regions.clear(),
                    Some(window) if update.valid => {
                        regions.insert(window, update.payload.region.clone());
                    }
                    Some(window) => {
                        regions.remove(&window);
                    }
                }
            }),
            stacking,
        );
    }

    fn release_resources(&mut self, gpu: &mut dyn GpuBackend) {
        for target in &mut self.targets {
            target.release(gpu);
        }
    }

    fn pre_paint_screen(
        &mut self,
        data: &mut ScreenPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        self.painted_area.clear();
        self.current_blur.clear();
        next.pre_paint_screen(data, present);
        Ok(())
    }

    fn pre_paint_window(
        &mut self,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.pre_paint_window(window, data, present);

        let ctx = next.ctx();
        let output = ctx.output_geometry;
        if let Some(area) = self.blur_area(ctx.windows, window) {
            let area = area.intersected_rect(output);
            let expanded_blur = expanded(&area, self.expand_size()).intersected_rect(output);

            // Anything painted below the blurred area changes what the blur
            // reads, so the whole widened area has to be repainted.
            if self.painted_area.intersects(&expanded_blur) || data.paint.intersects(&area) {
                data.paint.union_with(&expanded_blur);
                if expanded_blur.intersects(&self.current_blur) {
                    data.paint.union_with(&self.current_blur);
                }
            }
            data.clip = data.clip.subtracted(&expanded_blur);
            self.current_blur.union_with(&expanded_blur);
        }
        self.painted_area = self.painted_area.subtracted(&data.clip);
        self.painted_area.union_with(&data.paint);
        Ok(())
    }

    fn paint_window(
        &mut self,
        window: WindowId,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        if Self::should_blur(mask, data) {
            let ctx = next.ctx();
            if let Some(mut shape) = self.blur_area(ctx.windows, window) {
                let [tx, ty, _] = data.transform.translation;
                shape.translate(Vec2::new(tx, ty));
                let shape = shape
                    .intersected(region)
                    .intersected_rect(ctx.output_geometry);
                if !shape.is_empty() {
                    self.do_blur(ctx, &shape, data.opacity)?;
                }
            }
        }
        next.paint_window(window, mask, region, data);
        Ok(())
    }

    fn window_deleted(&mut self, window: WindowId) {
        self.regions.borrow_mut().remove(&window);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use vitrine_core::output::OutputId;

    use super::*;
    use crate::chain::EffectChain;
    use crate::effect::RepaintRequests;
    use crate::framebuffer::FramebufferStack;
    use crate::headless::{GpuCall, HeadlessGpu};
    use crate::integration::BlurPayload;

    const SCREEN: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

    struct Setup {
        windows: WindowStore,
        gpu: HeadlessGpu,
        framebuffers: FramebufferStack,
        repaints: RepaintRequests,
        chain: EffectChain,
    }

    impl Setup {
        fn new() -> Self {
            let mut gpu = HeadlessGpu::new();
            let mut chain = EffectChain::default();
            let blur = BlurEffect::new(&mut gpu, 4).unwrap();
            chain.load("blur", Box::new(blur), &[]).unwrap();
            Self {
                windows: WindowStore::new(),
                gpu,
                framebuffers: FramebufferStack::new(),
                repaints: RepaintRequests::new(),
                chain,
            }
        }

        fn hint(&mut self, window: WindowId, region: Region) {
            self.chain
                .integrations_mut()
                .blur
                .update(window, Some(BlurPayload { region }));
        }

        fn paint(&mut self, window: WindowId, mask: PaintMask, data: &mut WindowPaintData) {
            self.chain.start_paint();
            let mut ctx = EffectContext::new(
                &mut self.windows,
                &mut self.gpu,
                &mut self.framebuffers,
                &mut self.repaints,
                OutputId(0),
                SCREEN,
            );
            self.chain
                .paint_window(&mut ctx, window, mask, &Region::from_rect(SCREEN), data);
        }
    }

    #[test]
    fn blurs_whole_window_for_empty_hint() {
        let mut s = Setup::new();
        let w = s.windows.create_window(Rect::new(10.0, 20.0, 110.0, 70.0));
        s.hint(w, Region::new());
        s.gpu.calls.clear();
        s.paint(w, PaintMask::empty(), &mut WindowPaintData::default());

        let calls = &s.gpu.calls;
        let window_rect = Rect::new(10.0, 20.0, 110.0, 70.0);
        let (a, b) = match (&calls[0], &calls[1]) {
            (GpuCall::Create(a), GpuCall::Create(b)) => (*a, *b),
            other => panic!("expected two allocations, got {other:?}"),
        };
        assert_eq!(
            calls[2..],
            [
                GpuCall::Copy(a, window_rect),
                GpuCall::Bind(Some(b)),
                GpuCall::DrawTexture(a, Rect::new(0.0, 0.0, 100.0, 50.0), Some(ShaderId(1))),
                GpuCall::Bind(None),
                GpuCall::DrawTexture(b, window_rect, None),
                GpuCall::DrawWindow(w, 1.0),
            ]
        );
        assert_eq!(s.framebuffers.depth(), 0, "stack balanced");
    }

    #[test]
    fn transformed_window_is_blurred_only_when_forced() {
        let mut s = Setup::new();
        let w = s.windows.create_window(Rect::new(0.0, 0.0, 50.0, 50.0));
        s.hint(w, Region::new());
        s.gpu.calls.clear();

        s.paint(w, PaintMask::WINDOW_TRANSFORMED, &mut WindowPaintData::default());
        assert!(
            !s.gpu.calls.iter().any(|c| matches!(c, GpuCall::Copy(..))),
            "transformed window skips blur"
        );

        let mut data = WindowPaintData::default();
        data.transform.translate(Vec2::new(0.0, 20.0));
        s.paint(
            w,
            PaintMask::WINDOW_TRANSFORMED | PaintMask::WINDOW_FORCE_BLUR,
            &mut data,
        );
        let copies: Vec<_> = s
            .gpu
            .calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::Copy(_, rect) => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(copies, [Rect::new(0.0, 20.0, 50.0, 70.0)], "follows translation");
    }

    #[test]
    fn allocation_failure_faults_blur_but_paints_window() {
        let mut s = Setup::new();
        let w = s.windows.create_window(Rect::new(0.0, 0.0, 50.0, 50.0));
        s.hint(w, Region::new());
        s.gpu.fail_allocations = true;
        s.paint(w, PaintMask::empty(), &mut WindowPaintData::default());
        assert_eq!(s.gpu.drawn_windows(), [w]);
        assert!(s.chain.is_faulted("blur"));
    }

    #[test]
    fn damage_under_blur_widens_repaint() {
        let mut s = Setup::new();
        let below = s.windows.create_window(Rect::new(0.0, 0.0, 200.0, 200.0));
        let above = s.windows.create_window(Rect::new(50.0, 50.0, 150.0, 150.0));
        s.hint(above, Region::new());
        s.chain.start_paint();
        let mut ctx = EffectContext::new(
            &mut s.windows,
            &mut s.gpu,
            &mut s.framebuffers,
            &mut s.repaints,
            OutputId(0),
            SCREEN,
        );
        let present = HostTime::from_millis(16);
        s.chain
            .pre_paint_screen(&mut ctx, &mut ScreenPrePaintData::default(), present);

        let damage = Rect::new(60.0, 60.0, 70.0, 70.0);
        let mut lower = WindowPrePaintData {
            paint: Region::from_rect(damage),
            ..WindowPrePaintData::default()
        };
        s.chain.pre_paint_window(&mut ctx, below, &mut lower, present);

        let mut upper = WindowPrePaintData {
            clip: Region::from_rect(Rect::new(50.0, 50.0, 150.0, 150.0)),
            ..WindowPrePaintData::default()
        };
        s.chain.pre_paint_window(&mut ctx, above, &mut upper, present);
        assert!(
            upper.paint.contains_rect(Rect::new(42.0, 42.0, 158.0, 158.0)),
            "repaint widened by twice the radius"
        );
        assert!(upper.clip.is_empty(), "blurred window occludes nothing");
    }

    #[test]
    fn invalid_hint_deactivates_and_unload_frees_targets() {
        let mut s = Setup::new();
        let w = s.windows.create_window(Rect::new(0.0, 0.0, 50.0, 50.0));
        s.hint(w, Region::new());
        s.paint(w, PaintMask::empty(), &mut WindowPaintData::default());
        assert_eq!(s.gpu.live_targets(), 2);

        s.chain.integrations_mut().blur.update(w, None);
        assert!(!s.chain.start_paint(), "no hints left");

        s.chain.unload("blur", &mut s.windows, &mut s.gpu);
        assert_eq!(s.gpu.live_targets(), 0);
        assert!(!s.chain.integrations().blur.is_advertised());
    }
}
