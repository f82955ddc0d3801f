// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background contrast: a colour matrix applied to whatever is painted
//! behind a hinted window, in a single pass.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::Vec2;
use vitrine_core::effect::EffectId;
use vitrine_core::region::Region;
use vitrine_core::time::HostTime;
use vitrine_core::window::{WindowId, WindowStore};

use super::window_area;
use crate::effect::{Effect, EffectContext, Feature, Next};
use crate::error::EffectError;
use crate::framebuffer::{
    DrawParams, GpuBackend, OffscreenTarget, ShaderId, ShaderKind, target_size,
};
use crate::integration::{ContrastPayload, Integrations};
use crate::paint::{PaintMask, WindowPaintData, WindowPrePaintData};

/// Chain position of [`ContrastEffect`]. Right after blur, so contrast is
/// applied to the blurred background.
pub const CONTRAST_POSITION: i32 = 21;

type Hints = Rc<RefCell<BTreeMap<WindowId, ContrastPayload>>>;

/// Colour-matrix pass behind hinted windows.
#[derive(Debug)]
pub struct ContrastEffect {
    hints: Hints,
    shader: ShaderId,
    target: OffscreenTarget,
}

impl ContrastEffect {
    /// Compiles the colour-matrix shader and creates the effect.
    pub fn new(gpu: &mut dyn GpuBackend) -> Result<Self, EffectError> {
        Ok(Self {
            hints: Rc::default(),
            shader: gpu.compile_shader(ShaderKind::ColorMatrix)?,
            target: OffscreenTarget::new(),
        })
    }

    fn hint(&self, windows: &WindowStore, window: WindowId) -> Option<(Region, [f32; 16])> {
        let hints = self.hints.borrow();
        let hint = hints.get(&window)?;
        Some((window_area(windows, window, &hint.region), hint.color))
    }

    fn should_contrast(mask: PaintMask, data: &WindowPaintData) -> bool {
        if mask.contains(PaintMask::WINDOW_FORCE_CONTRAST) {
            return true;
        }
        !mask.contains(PaintMask::WINDOW_TRANSFORMED) && data.transform.is_identity()
    }

    fn do_contrast(
        &mut self,
        ctx: &mut EffectContext<'_>,
        shape: &Region,
        color: [f32; 16],
        opacity: f64,
    ) -> Result<(), EffectError> {
        let bounds = shape.bounding_box();
        let (width, height) = target_size(bounds);
        let source = self.target.ensure(ctx.gpu, width, height)?;
        ctx.gpu.copy_to(source, bounds);
        ctx.gpu.draw_texture(
            source,
            bounds,
            &DrawParams {
                shader: Some(self.shader),
                opacity,
                color_matrix: Some(color),
                clip: shape.clone(),
            },
        );
        Ok(())
    }
}

impl Effect for ContrastEffect {
    fn is_active(&self) -> bool {
        !self.hints.borrow().is_empty()
    }

    fn requested_position(&self) -> i32 {
        CONTRAST_POSITION
    }

    fn provides(&self, feature: Feature) -> bool {
        feature == Feature::Contrast
    }

    fn attach(&mut self, id: EffectId, integrations: &mut Integrations, stacking: &[WindowId]) {
        let hints = Rc::clone(&self.hints);
        integrations.contrast.add(
            id,
            Box::new(move |update| {
                let mut hints = hints.borrow_mut();
                match update.window {
                    None => hints.clear(),
                    Some(window) if update.valid => {
                        hints.insert(window, update.payload.clone());
                    }
                    Some(window) => {
                        hints.remove(&window);
                    }
                }
            }),
            stacking,
        );
    }

    fn release_resources(&mut self, gpu: &mut dyn GpuBackend) {
        self.target.release(gpu);
    }

    fn pre_paint_window(
        &mut self,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        next.pre_paint_window(window, data, present);
        // The pass reads what is behind the window; it must not be clipped
        // away by the window's own opaque area.
        if let Some((area, _)) = self.hint(next.ctx().windows, window) {
            data.clip = data.clip.subtracted(&area);
        }
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
        if Self::should_contrast(mask, data) {
            let ctx = next.ctx();
            if let Some((mut shape, color)) = self.hint(ctx.windows, window) {
                let [tx, ty, _] = data.transform.translation;
                shape.translate(Vec2::new(tx, ty));
                let shape = shape
                    .intersected(region)
                    .intersected_rect(ctx.output_geometry);
                if !shape.is_empty() {
                    self.do_contrast(ctx, &shape, color, data.opacity)?;
                }
            }
        }
        next.paint_window(window, mask, region, data);
        Ok(())
    }

    fn window_deleted(&mut self, window: WindowId) {
        self.hints.borrow_mut().remove(&window);
    }
}
