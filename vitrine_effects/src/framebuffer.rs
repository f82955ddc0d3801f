// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU backend seam, framebuffer stack and offscreen targets.
//!
//! Effects never talk to a graphics API directly. They go through
//! [`GpuBackend`], which hands out opaque [`TargetId`] and [`ShaderId`]
//! handles. Redirecting a window into a texture is a push/pop on the
//! per-output [`FramebufferStack`]:
//!
//! ```text
//!   push(A)        bind A
//!     push(B)      bind B
//!     pop() -> B   bind A      (previous target restored)
//!   pop() -> A     bind output
//! ```
//!
//! Offscreen targets are owned by the effect that created them. An
//! [`OffscreenTarget`] caches one target and recreates it only when the
//! requested size changes.

use alloc::vec::Vec;

use kurbo::Rect;
use vitrine_core::region::Region;
use vitrine_core::window::WindowId;

use crate::error::{EffectError, FramebufferError};
use crate::paint::WindowPaintData;

/// Opaque handle to an offscreen render target (and its texture).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u32);

/// Opaque handle to a compiled shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// The shader programs built-in effects ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Plain textured quad with opacity.
    Texture,
    /// One pass of a separable box/Gaussian blur.
    Blur {
        /// Kernel radius in pixels.
        radius: u8,
    },
    /// Colour matrix applied to the sampled texture.
    ColorMatrix,
}

impl ShaderKind {
    /// Human-readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Blur { .. } => "blur",
            Self::ColorMatrix => "color-matrix",
        }
    }
}

/// Parameters for [`GpuBackend::draw_texture`].
#[derive(Clone, Debug, PartialEq)]
pub struct DrawParams {
    /// Shader to draw with; `None` uses the backend's plain texture shader.
    pub shader: Option<ShaderId>,
    /// Opacity multiplier.
    pub opacity: f64,
    /// Colour matrix, column-major, for [`ShaderKind::ColorMatrix`].
    pub color_matrix: Option<[f32; 16]>,
    /// Area of the bound target the draw may touch.
    pub clip: Region,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            shader: None,
            opacity: 1.0,
            color_matrix: None,
            clip: Region::new(),
        }
    }
}

/// The graphics operations effects and the final painter rely on.
///
/// All calls act on the currently bound target. `bind_target(None)` binds
/// the output's own framebuffer.
pub trait GpuBackend {
    /// Allocates a render target of the given size in pixels.
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, FramebufferError>;

    /// Frees a render target. Unknown ids are ignored.
    fn destroy_target(&mut self, target: TargetId);

    /// Binds `target`, or the output framebuffer for `None`.
    fn bind_target(&mut self, target: Option<TargetId>);

    /// Copies `src` of the currently bound target into `dst`.
    fn copy_to(&mut self, dst: TargetId, src: Rect);

    /// Draws `texture` into `dst` of the currently bound target.
    fn draw_texture(&mut self, texture: TargetId, dst: Rect, params: &DrawParams);

    /// Compiles (or fetches from cache) a shader program.
    fn compile_shader(&mut self, kind: ShaderKind) -> Result<ShaderId, EffectError>;

    /// Draws a window's contents at `geometry`, restricted to `region`.
    fn draw_window(
        &mut self,
        window: WindowId,
        geometry: Rect,
        region: &Region,
        data: &WindowPaintData,
    );
}

impl core::fmt::Debug for dyn GpuBackend + '_ {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn GpuBackend")
    }
}

/// Stack of bound offscreen targets for one output.
#[derive(Clone, Debug, Default)]
pub struct FramebufferStack {
    stack: Vec<TargetId>,
}

impl FramebufferStack {
    /// Creates an empty stack; the output framebuffer is bound.
    #[must_use]
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Pushes and binds `target`.
    pub fn push(&mut self, gpu: &mut dyn GpuBackend, target: TargetId) {
        self.stack.push(target);
        gpu.bind_target(Some(target));
    }

    /// Pops the top target and rebinds the one below it, or the output
    /// framebuffer if the stack is now empty.
    pub fn pop(&mut self, gpu: &mut dyn GpuBackend) -> Result<TargetId, FramebufferError> {
        let top = self.stack.pop().ok_or(FramebufferError::StackEmpty)?;
        gpu.bind_target(self.current());
        Ok(top)
    }

    /// The currently bound offscreen target, if any.
    #[must_use]
    pub fn current(&self) -> Option<TargetId> {
        self.stack.last().copied()
    }

    /// Number of pushed targets.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drops anything left on the stack and binds the output framebuffer.
    /// Returns how many targets were dropped; reporting them is up to the
    /// caller.
    ///
    /// Called at the end of a frame so an effect that faulted between push
    /// and pop cannot leave the next frame redirected.
    pub fn unwind(&mut self, gpu: &mut dyn GpuBackend) -> usize {
        let leaked = self.stack.len();
        if leaked > 0 {
            self.stack.clear();
            gpu.bind_target(None);
        }
        leaked
    }
}

/// A lazily (re)allocated offscreen target owned by one effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffscreenTarget {
    target: Option<TargetId>,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: None,
            width: 0,
            height: 0,
        }
    }

    /// Returns a target of exactly `width`×`height`, recreating it if the
    /// cached one has a different size.
    pub fn ensure(
        &mut self,
        gpu: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<TargetId, FramebufferError> {
        if let Some(target) = self.target {
            if self.width == width && self.height == height {
                return Ok(target);
            }
            gpu.destroy_target(target);
            self.target = None;
        }
        let target = gpu.create_target(width, height)?;
        self.target = Some(target);
        self.width = width;
        self.height = height;
        Ok(target)
    }

    /// The cached target, if allocated.
    #[must_use]
    pub fn get(&self) -> Option<TargetId> {
        self.target
    }

    /// Frees the cached target.
    pub fn release(&mut self, gpu: &mut dyn GpuBackend) {
        if let Some(target) = self.target.take() {
            gpu.destroy_target(target);
        }
    }
}

/// Pixel size covering `rect`, rounded outwards.
#[must_use]
pub fn target_size(rect: Rect) -> (u32, u32) {
    let r = rect.expand();
    #[expect(
        clippy::cast_possible_truncation,
        reason = "window sizes fit comfortably in u32 after clamping to zero"
    )]
    let size = (r.width().max(0.0) as u32, r.height().max(0.0) as u32);
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GpuCall, HeadlessGpu};

    #[test]
    fn nested_push_pop_restores_previous_target() {
        let mut gpu = HeadlessGpu::new();
        let mut stack = FramebufferStack::new();
        let a = gpu.create_target(10, 10).unwrap();
        let b = gpu.create_target(10, 10).unwrap();
        gpu.calls.clear();

        stack.push(&mut gpu, a);
        stack.push(&mut gpu, b);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop(&mut gpu), Ok(b));
        assert_eq!(stack.current(), Some(a));
        assert_eq!(stack.pop(&mut gpu), Ok(a));
        assert_eq!(
            gpu.calls,
            alloc::vec![
                GpuCall::Bind(Some(a)),
                GpuCall::Bind(Some(b)),
                GpuCall::Bind(Some(a)),
                GpuCall::Bind(None),
            ]
        );
    }

    #[test]
    fn pop_on_empty_is_an_error() {
        let mut gpu = HeadlessGpu::new();
        let mut stack = FramebufferStack::new();
        assert_eq!(stack.pop(&mut gpu), Err(FramebufferError::StackEmpty));
        assert!(gpu.calls.is_empty(), "no rebind on failed pop");
    }

    #[test]
    fn unwind_rebinds_output() {
        let mut gpu = HeadlessGpu::new();
        let mut stack = FramebufferStack::new();
        let a = gpu.create_target(4, 4).unwrap();
        stack.push(&mut gpu, a);
        assert_eq!(stack.unwind(&mut gpu), 1);
        assert_eq!(stack.depth(), 0);
        assert_eq!(gpu.calls.last(), Some(&GpuCall::Bind(None)));
    }

    #[test]
    fn offscreen_target_recreated_on_resize_only() {
        let mut gpu = HeadlessGpu::new();
        let mut slot = OffscreenTarget::new();
        let first = slot.ensure(&mut gpu, 100, 50).unwrap();
        assert_eq!(slot.ensure(&mut gpu, 100, 50), Ok(first), "same size reuses");
        let second = slot.ensure(&mut gpu, 200, 50).unwrap();
        assert_ne!(first, second);
        assert!(gpu.calls.contains(&GpuCall::Destroy(first)));
        assert_eq!(gpu.live_targets(), 1);

        slot.release(&mut gpu);
        assert_eq!(gpu.live_targets(), 0);
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn allocation_failure_leaves_slot_empty() {
        let mut gpu = HeadlessGpu::new();
        gpu.fail_allocations = true;
        let mut slot = OffscreenTarget::new();
        assert_eq!(
            slot.ensure(&mut gpu, 8, 8),
            Err(FramebufferError::Allocation { width: 8, height: 8 })
        );
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn target_size_rounds_out() {
        assert_eq!(target_size(Rect::new(0.5, 0.5, 10.2, 20.0)), (11, 20));
    }
}
