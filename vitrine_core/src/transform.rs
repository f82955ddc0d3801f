// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transforms for window and screen paint passes.
//!
//! Effects compose window transforms from translation, scale, and rotation
//! about an arbitrary origin, and screen effects may install a projection.
//! [`Transform3d`] covers exactly those operations plus mapping points and
//! rectangles into output space (for damage computation).

use core::ops::Mul;

use kurbo::{Point, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Axis of a rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RotationAxis {
    /// Rotate in the YZ plane.
    X,
    /// Rotate in the XZ plane.
    Y,
    /// Rotate in the screen plane.
    #[default]
    Z,
}

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column*, matching the layout GL uniforms expect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Creates a pure translation.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `radians` around `axis` through the origin.
    #[must_use]
    pub fn from_rotation(axis: RotationAxis, radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        let cols = match axis {
            RotationAxis::X => [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            RotationAxis::Y => [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            RotationAxis::Z => [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        };
        Self { cols }
    }

    /// Creates a rotation of `radians` around `axis` through `origin`.
    #[must_use]
    pub fn from_rotation_about(axis: RotationAxis, radians: f64, origin: [f64; 3]) -> Self {
        let [ox, oy, oz] = origin;
        Self::from_translation(ox, oy, oz)
            * Self::from_rotation(axis, radians)
            * Self::from_translation(-ox, -oy, -oz)
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns `true` if this is exactly the identity.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Maps a point in the z=0 plane, applying the perspective divide.
    #[must_use]
    pub fn map_point(&self, p: Point) -> Point {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w == 0.0 || w == 1.0 {
            Point::new(x, y)
        } else {
            Point::new(x / w, y / w)
        }
    }

    /// Maps a rectangle and returns the bounding box of the result.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let corners = [
            self.map_point(Point::new(rect.x0, rect.y0)),
            self.map_point(Point::new(rect.x1, rect.y0)),
            self.map_point(Point::new(rect.x0, rect.y1)),
            self.map_point(Point::new(rect.x1, rect.y1)),
        ];
        let mut out = Rect::from_points(corners[0], corners[1]);
        out = out.union_pt(corners[2]);
        out.union_pt(corners[3])
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, cell) in col.iter_mut().enumerate() {
                *cell =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn default_is_identity() {
        assert!(Transform3d::default().is_identity());
    }

    #[test]
    fn translation_then_scale_maps_rect() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0) * Transform3d::from_scale(2.0, 2.0, 1.0);
        let mapped = t.map_rect(Rect::new(0.0, 0.0, 50.0, 25.0));
        assert_eq!(mapped, Rect::new(10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn rotation_about_center_keeps_center_fixed() {
        let r = Transform3d::from_rotation_about(
            RotationAxis::Z,
            core::f64::consts::FRAC_PI_2,
            [50.0, 50.0, 0.0],
        );
        let p = r.map_point(Point::new(50.0, 50.0));
        assert!((p.x - 50.0).abs() < EPS && (p.y - 50.0).abs() < EPS, "center moved to {p:?}");
        let q = r.map_point(Point::new(100.0, 50.0));
        assert!((q.x - 50.0).abs() < EPS && (q.y - 100.0).abs() < EPS, "edge mapped to {q:?}");
    }

    #[test]
    fn rotation_x_flattens_height() {
        let r = Transform3d::from_rotation(RotationAxis::X, core::f64::consts::FRAC_PI_2);
        let p = r.map_point(Point::new(3.0, 10.0));
        assert!((p.x - 3.0).abs() < EPS, "x is untouched by an X-axis rotation");
        assert!(p.y.abs() < EPS, "y collapses onto the axis at 90 degrees");
    }

    #[test]
    fn perspective_divide_applies() {
        let mut t = Transform3d::IDENTITY;
        t.cols[3][3] = 2.0;
        assert_eq!(t.map_point(Point::new(4.0, 8.0)), Point::new(2.0, 4.0));
    }
}
