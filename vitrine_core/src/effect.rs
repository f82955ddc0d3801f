// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect identity and animation grab roles.
//!
//! Effects themselves live in `vitrine_effects`. Core only needs a stable
//! identity so windows can record which effect owns an open or close
//! animation.

use core::fmt;

/// Identifies one loaded effect instance.
///
/// Ids are assigned by the effect chain on load and never reused within a
/// session, so a stale id held by a window simply stops matching.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub u32);

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({})", self.0)
    }
}

/// A marker recording which effect animates a window transition.
///
/// The first effect in chain order to claim a role wins; later effects see
/// the claim and skip their own animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrabRole {
    /// The window-added (open) animation.
    WindowAdded,
    /// The window-closed animation.
    WindowClosed,
}

impl GrabRole {
    /// Number of distinct roles.
    pub const COUNT: usize = 2;

    /// Returns a dense index for per-window role storage.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::WindowAdded => 0,
            Self::WindowClosed => 1,
        }
    }
}
