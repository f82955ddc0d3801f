// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window identity.

use core::fmt;

/// Sentinel value for "no window" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a window in a [`WindowStore`](super::WindowStore).
///
/// Carries a slot index and a generation counter so that a handle held past
/// the window's removal is detected instead of aliasing whatever window
/// reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl WindowId {
    /// Returns the raw slot index (for diagnostics and dense side tables).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({}@gen{})", self.idx, self.generation)
    }
}
