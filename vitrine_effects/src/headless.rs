// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`GpuBackend`] that records calls instead of drawing.
//!
//! Used for headless runs and as the fake backend in tests across the
//! workspace. Every call is appended to [`HeadlessGpu::calls`].

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;
use vitrine_core::region::Region;
use vitrine_core::window::WindowId;

use crate::error::{EffectError, FramebufferError};
use crate::framebuffer::{DrawParams, GpuBackend, ShaderId, ShaderKind, TargetId};
use crate::paint::WindowPaintData;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum GpuCall {
    /// `create_target` succeeded.
    Create(TargetId),
    /// `destroy_target`.
    Destroy(TargetId),
    /// `bind_target`.
    Bind(Option<TargetId>),
    /// `copy_to`.
    Copy(TargetId, Rect),
    /// `draw_texture` with the shader used.
    DrawTexture(TargetId, Rect, Option<ShaderId>),
    /// `draw_window` with the final opacity.
    DrawWindow(WindowId, f64),
}

/// Recording GPU backend.
#[derive(Clone, Debug, Default)]
pub struct HeadlessGpu {
    /// Every call made, in order.
    pub calls: Vec<GpuCall>,
    /// When set, `create_target` fails.
    pub fail_allocations: bool,
    /// When set, `compile_shader` fails.
    pub fail_shaders: bool,
    next_id: u32,
    live: BTreeSet<TargetId>,
}

impl HeadlessGpu {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of targets created and not yet destroyed.
    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.live.len()
    }

    /// Windows drawn, in draw order.
    #[must_use]
    pub fn drawn_windows(&self) -> Vec<WindowId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::DrawWindow(w, _) => Some(*w),
                _ => None,
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuBackend for HeadlessGpu {
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, FramebufferError> {
        if self.fail_allocations || width == 0 || height == 0 {
            return Err(FramebufferError::Allocation { width, height });
        }
        let id = TargetId(self.next());
        self.live.insert(id);
        self.calls.push(GpuCall::Create(id));
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        self.live.remove(&target);
        self.calls.push(GpuCall::Destroy(target));
    }

    fn bind_target(&mut self, target: Option<TargetId>) {
        self.calls.push(GpuCall::Bind(target));
    }

    fn copy_to(&mut self, dst: TargetId, src: Rect) {
        self.calls.push(GpuCall::Copy(dst, src));
    }

    fn draw_texture(&mut self, texture: TargetId, dst: Rect, params: &DrawParams) {
        self.calls
            .push(GpuCall::DrawTexture(texture, dst, params.shader));
    }

    fn compile_shader(&mut self, kind: ShaderKind) -> Result<ShaderId, EffectError> {
        if self.fail_shaders {
            return Err(EffectError::ShaderCompile {
                name: kind.name(),
                log: String::from("headless backend configured to fail"),
            });
        }
        Ok(ShaderId(self.next()))
    }

    fn draw_window(
        &mut self,
        window: WindowId,
        _geometry: Rect,
        _region: &Region,
        data: &WindowPaintData,
    ) {
        self.calls.push(GpuCall::DrawWindow(window, data.opacity));
    }
}
