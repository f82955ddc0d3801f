// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted guards that extend a window's lifetime or visibility.
//!
//! A closed window stays in the [`WindowStore`](super::WindowStore) as a
//! *remnant* for as long as at least one [`DeletedRef`] to it exists, so an
//! effect can keep painting its last frame while animating the close.
//! [`WindowStore::reap_remnants`](super::WindowStore::reap_remnants) removes
//! remnants whose count has dropped to zero.
//!
//! A [`VisibleRef`] forces a window to be painted even though it would
//! normally be skipped (minimized, on another desktop, closed). Each ref
//! carries the set of [`VisibilityReasons`] it overrides; the window is
//! forced visible for a reason while any ref holding that reason is alive.
//!
//! Both guards follow the usual ownership rules: construction and `clone`
//! increment, `drop` decrements. Assigning one guard over another
//! (`a = b.clone()`) evaluates the clone first, so the new target is
//! incremented before the old one is released even when both name the same
//! window.

use alloc::rc::Rc;
use core::cell::Cell;

use bitflags::bitflags;

use super::id::WindowId;

bitflags! {
    /// Reasons a window may be excluded from painting.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct VisibilityReasons: u8 {
        /// Explicitly hidden by the window-management layer.
        const HIDDEN = 1 << 0;
        /// Closed; only a remnant remains.
        const DELETED = 1 << 1;
        /// Not on the current virtual desktop.
        const DESKTOP = 1 << 2;
        /// Minimized.
        const MINIMIZED = 1 << 3;
    }
}

const REASON_COUNT: usize = 4;

/// Shared counters for one window slot generation.
#[derive(Debug, Default)]
pub(crate) struct RefCounts {
    deleted: Cell<u32>,
    visible: [Cell<u32>; REASON_COUNT],
}

impl RefCounts {
    pub(crate) fn deleted(&self) -> u32 {
        self.deleted.get()
    }

    pub(crate) fn forced_reasons(&self) -> VisibilityReasons {
        let mut out = VisibilityReasons::empty();
        for (bit, count) in self.visible.iter().enumerate() {
            if count.get() > 0 {
                out |= VisibilityReasons::from_bits_retain(1 << bit);
            }
        }
        out
    }

    fn adjust_visible(&self, reasons: VisibilityReasons, up: bool) {
        for (bit, count) in self.visible.iter().enumerate() {
            if reasons.bits() & (1 << bit) != 0 {
                let v = count.get();
                count.set(if up { v + 1 } else { v.saturating_sub(1) });
            }
        }
    }
}

/// Keeps a closed window's remnant alive.
///
/// Obtained from [`WindowStore::deleted_ref`](super::WindowStore::deleted_ref).
#[derive(Debug)]
pub struct DeletedRef {
    window: WindowId,
    counts: Rc<RefCounts>,
}

impl DeletedRef {
    pub(crate) fn new(window: WindowId, counts: Rc<RefCounts>) -> Self {
        counts.deleted.set(counts.deleted.get() + 1);
        Self { window, counts }
    }

    /// Returns the window this ref keeps alive.
    #[inline]
    #[must_use]
    pub fn window(&self) -> WindowId {
        self.window
    }
}

impl Clone for DeletedRef {
    fn clone(&self) -> Self {
        Self::new(self.window, Rc::clone(&self.counts))
    }
}

impl Drop for DeletedRef {
    fn drop(&mut self) {
        let v = self.counts.deleted.get();
        debug_assert!(v > 0, "deleted-ref count underflow for {:?}", self.window);
        self.counts.deleted.set(v.saturating_sub(1));
    }
}

impl PartialEq for DeletedRef {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window
    }
}

/// Forces a window to be painted despite the given reasons.
///
/// Obtained from [`WindowStore::visible_ref`](super::WindowStore::visible_ref).
#[derive(Debug)]
pub struct VisibleRef {
    window: WindowId,
    reasons: VisibilityReasons,
    counts: Rc<RefCounts>,
}

impl VisibleRef {
    pub(crate) fn new(window: WindowId, reasons: VisibilityReasons, counts: Rc<RefCounts>) -> Self {
        counts.adjust_visible(reasons, true);
        Self {
            window,
            reasons,
            counts,
        }
    }

    /// Returns the window this ref keeps visible.
    #[inline]
    #[must_use]
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Returns the reasons this ref overrides.
    #[inline]
    #[must_use]
    pub fn reasons(&self) -> VisibilityReasons {
        self.reasons
    }
}

impl Clone for VisibleRef {
    fn clone(&self) -> Self {
        Self::new(self.window, self.reasons, Rc::clone(&self.counts))
    }
}

impl Drop for VisibleRef {
    fn drop(&mut self) {
        self.counts.adjust_visible(self.reasons, false);
    }
}

impl PartialEq for VisibleRef {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window && self.reasons == other.reasons
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn window() -> WindowId {
        WindowId {
            idx: 3,
            generation: 0,
        }
    }

    #[test]
    fn copies_round_trip_to_original_count() {
        let counts = Rc::new(RefCounts::default());
        let base = DeletedRef::new(window(), Rc::clone(&counts));
        assert_eq!(counts.deleted(), 1);

        let copies: Vec<_> = (0..5).map(|_| base.clone()).collect();
        assert_eq!(counts.deleted(), 6);
        drop(copies);
        assert_eq!(counts.deleted(), 1, "dropping every copy restores the count");
        drop(base);
        assert_eq!(counts.deleted(), 0);
    }

    #[test]
    fn reassigning_same_target_keeps_count() {
        let counts = Rc::new(RefCounts::default());
        let mut a = DeletedRef::new(window(), Rc::clone(&counts));
        let b = a.clone();
        assert_eq!(counts.deleted(), 2);
        a = b.clone();
        assert_eq!(counts.deleted(), 2, "clone-then-release never dips to zero");
        drop((a, b));
        assert_eq!(counts.deleted(), 0);
    }

    #[test]
    fn visible_ref_tracks_each_reason() {
        let counts = Rc::new(RefCounts::default());
        let min = VisibleRef::new(window(), VisibilityReasons::MINIMIZED, Rc::clone(&counts));
        let both = VisibleRef::new(
            window(),
            VisibilityReasons::MINIMIZED | VisibilityReasons::DESKTOP,
            Rc::clone(&counts),
        );
        assert_eq!(
            counts.forced_reasons(),
            VisibilityReasons::MINIMIZED | VisibilityReasons::DESKTOP
        );
        drop(both);
        assert_eq!(counts.forced_reasons(), VisibilityReasons::MINIMIZED);
        drop(min);
        assert!(counts.forced_reasons().is_empty());
    }
}
