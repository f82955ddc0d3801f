// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame paint data and paint mask bits.
//!
//! Each frame creates fresh paint records: one [`ScreenPrePaintData`] and
//! [`ScreenPaintData`] per output, and one [`WindowPrePaintData`] and
//! [`WindowPaintData`] per painted window. Effects mutate them on their way
//! through the chain; nothing here survives the frame. State an effect needs
//! across frames lives in the effect itself.

use kurbo::{Rect, Vec2};
use vitrine_core::region::Region;
use vitrine_core::transform::{RotationAxis, Transform3d};

bitflags::bitflags! {
    /// Bit flags describing how a screen or window is painted.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PaintMask: u32 {
        /// Window is fully opaque; nothing below it inside its shape needs
        /// painting.
        const WINDOW_OPAQUE = 1 << 0;
        /// Window needs blending.
        const WINDOW_TRANSLUCENT = 1 << 1;
        /// Window is transformed; its painted area may differ from its
        /// geometry.
        const WINDOW_TRANSFORMED = 1 << 2;
        /// Only the damaged region of the screen is painted.
        const SCREEN_REGION = 1 << 3;
        /// The whole screen is transformed.
        const SCREEN_TRANSFORMED = 1 << 4;
        /// At least one window is transformed; the screen is painted in full.
        const SCREEN_WITH_TRANSFORMED_WINDOWS = 1 << 5;
        /// Paint the background before any window.
        const SCREEN_BACKGROUND_FIRST = 1 << 6;
        /// Use a high-quality scaling filter for the window.
        const WINDOW_LANCZOS = 1 << 8;
        /// Blur the background behind the window even without a region hint.
        const WINDOW_FORCE_BLUR = 1 << 10;
        /// Apply background contrast even without a region hint.
        const WINDOW_FORCE_CONTRAST = 1 << 11;
        /// The window is redirected into an offscreen target by some effect.
        const WINDOW_OFFSCREEN = 1 << 12;
    }
}

impl PaintMask {
    /// Mask bits that force a full-screen repaint.
    pub const FULL_REPAINT: Self = Self::SCREEN_TRANSFORMED.union(Self::SCREEN_WITH_TRANSFORMED_WINDOWS);
}

/// A rotation about an arbitrary origin, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    /// Rotation axis.
    pub axis: RotationAxis,
    /// Angle in degrees.
    pub angle: f64,
    /// Origin relative to the painted item's top-left corner.
    pub origin: [f64; 3],
}

/// Translation, scale and rotation applied to a window or the screen.
///
/// Kept decomposed so several effects can each contribute a part (one
/// scales, another slides) without rebuilding a matrix in between.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintTransform {
    /// Translation in pixels.
    pub translation: [f64; 3],
    /// Scale factors.
    pub scale: [f64; 3],
    /// Optional rotation.
    pub rotation: Option<Rotation>,
}

impl Default for PaintTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PaintTransform {
    /// No translation, unit scale, no rotation.
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        scale: [1.0; 3],
        rotation: None,
    };

    /// Returns `true` if the transform leaves geometry untouched.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Adds `offset` to the translation.
    pub fn translate(&mut self, offset: Vec2) {
        self.translation[0] += offset.x;
        self.translation[1] += offset.y;
    }

    /// Multiplies the x and y scale factors.
    pub fn scale_by(&mut self, sx: f64, sy: f64) {
        self.scale[0] *= sx;
        self.scale[1] *= sy;
    }

    /// Builds the matrix for an item whose top-left corner is at `origin`
    /// in global coordinates: scale and rotate about the item, then
    /// translate.
    #[must_use]
    pub fn to_matrix(&self, origin: Vec2) -> Transform3d {
        let [tx, ty, tz] = self.translation;
        let [sx, sy, sz] = self.scale;
        let to_item = Transform3d::from_translation(origin.x, origin.y, 0.0);
        let from_item = Transform3d::from_translation(-origin.x, -origin.y, 0.0);
        let mut m = Transform3d::from_translation(tx, ty, tz) * to_item;
        if let Some(rot) = self.rotation {
            m = m * Transform3d::from_rotation_about(rot.axis, rot.angle.to_radians(), rot.origin);
        }
        m * Transform3d::from_scale(sx, sy, sz) * from_item
    }

    /// Maps `rect` through this transform, returning the bounding box.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        if self.is_identity() {
            return rect;
        }
        self.to_matrix(rect.origin().to_vec2()).map_rect(rect)
    }
}

/// Screen data collected before painting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScreenPrePaintData {
    /// Screen paint mask.
    pub mask: PaintMask,
    /// Region that will be painted this frame.
    pub paint: Region,
}

/// Screen data used while painting.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenPaintData {
    /// Transform applied to the whole scene.
    pub transform: PaintTransform,
    /// Projection installed for the output.
    pub projection: Transform3d,
    /// Output geometry in global coordinates.
    pub output_geometry: Rect,
}

impl ScreenPaintData {
    /// Creates screen data for an output with an identity transform.
    #[must_use]
    pub fn new(output_geometry: Rect) -> Self {
        Self {
            transform: PaintTransform::IDENTITY,
            projection: Transform3d::IDENTITY,
            output_geometry,
        }
    }
}

/// Window data collected before painting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowPrePaintData {
    /// Window paint mask.
    pub mask: PaintMask,
    /// Region of the window that will be painted.
    pub paint: Region,
    /// Opaque region that occludes windows below.
    pub clip: Region,
}

impl WindowPrePaintData {
    /// Marks the window translucent. It no longer occludes anything.
    pub fn set_translucent(&mut self) {
        self.mask.insert(PaintMask::WINDOW_TRANSLUCENT);
        self.mask.remove(PaintMask::WINDOW_OPAQUE);
        self.clip.clear();
    }

    /// Marks the window transformed. Its geometry no longer predicts its
    /// painted area, so it does not occlude anything either.
    pub fn set_transformed(&mut self) {
        self.mask.insert(PaintMask::WINDOW_TRANSFORMED);
        self.clip.clear();
    }
}

/// Window data used while painting.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowPaintData {
    /// Opacity multiplier in `0.0..=1.0`.
    pub opacity: f64,
    /// Brightness multiplier.
    pub brightness: f64,
    /// Saturation multiplier.
    pub saturation: f64,
    /// Window transform.
    pub transform: PaintTransform,
    /// Projection matrix.
    pub projection: Transform3d,
}

impl Default for WindowPaintData {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl WindowPaintData {
    /// Creates paint data starting from the window's base opacity.
    #[must_use]
    pub fn new(opacity: f64) -> Self {
        Self {
            opacity,
            brightness: 1.0,
            saturation: 1.0,
            transform: PaintTransform::IDENTITY,
            projection: Transform3d::IDENTITY,
        }
    }

    /// Multiplies the opacity, clamped to `0.0..=1.0`, and returns the
    /// result.
    pub fn multiply_opacity(&mut self, factor: f64) -> f64 {
        self.opacity = (self.opacity * factor).clamp(0.0, 1.0);
        self.opacity
    }

    /// Multiplies the brightness and returns the result.
    pub fn multiply_brightness(&mut self, factor: f64) -> f64 {
        self.brightness *= factor;
        self.brightness
    }

    /// Multiplies the saturation, clamped to `0.0..=1.0`, and returns the
    /// result.
    pub fn multiply_saturation(&mut self, factor: f64) -> f64 {
        self.saturation = (self.saturation * factor).clamp(0.0, 1.0);
        self.saturation
    }
}
