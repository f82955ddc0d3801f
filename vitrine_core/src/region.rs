// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage regions as unions of rectangles.
//!
//! A [`Region`] is a set of points in global compositor coordinates stored as
//! a list of pairwise-disjoint [`Rect`]s. The list is not sorted and is not
//! canonical: two regions covering the same area may hold different
//! rectangles, so equality compares coverage rather than storage.
//!
//! Rectangles that merely touch along an edge do not overlap. Empty and
//! inverted rectangles are normalized or dropped on insertion.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

/// A union of rectangles.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering a single rectangle.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.add_rect(rect);
        region
    }

    /// Creates a region from any number of (possibly overlapping) rectangles.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.add_rect(rect);
        }
        region
    }

    /// Returns `true` if the region covers no area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Returns the disjoint rectangles making up the region.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Removes all rectangles.
    #[inline]
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Adds `rect` to the region.
    pub fn add_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_degenerate(&rect) {
            return;
        }
        let mut pieces = alloc::vec![rect];
        for existing in &self.rects {
            if pieces.is_empty() {
                return;
            }
            let mut next = Vec::with_capacity(pieces.len());
            for piece in &pieces {
                subtract_into(piece, existing, &mut next);
            }
            pieces = next;
        }
        self.rects.extend(pieces);
    }

    /// Adds every rectangle of `other` to the region.
    pub fn union_with(&mut self, other: &Self) {
        for rect in &other.rects {
            self.add_rect(*rect);
        }
    }

    /// Returns the union of two regions.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_degenerate(&rect) || self.rects.is_empty() {
            return;
        }
        let mut next = Vec::with_capacity(self.rects.len());
        for existing in &self.rects {
            subtract_into(existing, &rect, &mut next);
        }
        self.rects = next;
    }

    /// Returns `self` with the area of `other` removed.
    #[must_use]
    pub fn subtracted(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for rect in &other.rects {
            out.subtract_rect(*rect);
        }
        out
    }

    /// Returns the part of the region inside `rect`.
    #[must_use]
    pub fn intersected_rect(&self, rect: Rect) -> Self {
        let rect = rect.abs();
        let rects = self
            .rects
            .iter()
            .filter(|r| overlaps(r, &rect))
            .map(|r| r.intersect(rect))
            .collect();
        Self { rects }
    }

    /// Returns the intersection of two regions.
    #[must_use]
    pub fn intersected(&self, other: &Self) -> Self {
        let mut rects = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if overlaps(a, b) {
                    // Disjoint inputs give disjoint pairwise intersections.
                    rects.push(a.intersect(*b));
                }
            }
        }
        Self { rects }
    }

    /// Returns `true` if the region overlaps `rect` with non-zero area.
    #[must_use]
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        let rect = rect.abs();
        self.rects.iter().any(|r| overlaps(r, &rect))
    }

    /// Returns `true` if the two regions overlap with non-zero area.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.rects
            .iter()
            .any(|a| other.rects.iter().any(|b| overlaps(a, b)))
    }

    /// Returns `true` if every point of `rect` is inside the region.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        let mut rest = Self::from_rect(rect);
        for r in &self.rects {
            rest.subtract_rect(*r);
            if rest.is_empty() {
                return true;
            }
        }
        rest.is_empty()
    }

    /// Returns the smallest rectangle enclosing the region, or
    /// [`Rect::ZERO`] if it is empty.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        let mut iter = self.rects.iter();
        match iter.next() {
            Some(first) => iter.fold(*first, |acc, r| acc.union(*r)),
            None => Rect::ZERO,
        }
    }

    /// Returns the covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// Moves the region by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        for rect in &mut self.rects {
            *rect = *rect + offset;
        }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl PartialEq for Region {
    /// Two regions are equal when they cover the same points.
    fn eq(&self, other: &Self) -> bool {
        self.subtracted(other).is_empty() && other.subtracted(self).is_empty()
    }
}

fn is_degenerate(rect: &Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Pushes the parts of `a` outside `b` into `out` (at most four bands).
fn subtract_into(a: &Rect, b: &Rect, out: &mut Vec<Rect>) {
    if !overlaps(a, b) {
        out.push(*a);
        return;
    }
    let i = a.intersect(*b);
    if i.y0 > a.y0 {
        out.push(Rect::new(a.x0, a.y0, a.x1, i.y0));
    }
    if a.y1 > i.y1 {
        out.push(Rect::new(a.x0, i.y1, a.x1, a.y1));
    }
    if i.x0 > a.x0 {
        out.push(Rect::new(a.x0, i.y0, i.x0, i.y1));
    }
    if a.x1 > i.x1 {
        out.push(Rect::new(i.x1, i.y0, a.x1, i.y1));
    }
}
