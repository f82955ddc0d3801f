// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display output identification and geometry.
//!
//! [`OutputId`] is a lightweight handle identifying one display sink. The
//! platform layer assigns ids when it reports a new physical or virtual
//! display; core treats them as opaque and orders them numerically.

use core::fmt;

use kurbo::Rect;

use crate::time::Duration;

/// Identifies a specific display output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputId(pub u32);

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.0)
    }
}

/// Static description of an output as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputInfo {
    /// Position and size in global compositor coordinates.
    pub geometry: Rect,
    /// Refresh rate in millihertz (`60_000` for 60 Hz), or zero if unknown.
    pub refresh_mhz: u32,
}

impl OutputInfo {
    /// Creates an output description.
    #[inline]
    #[must_use]
    pub const fn new(geometry: Rect, refresh_mhz: u32) -> Self {
        Self {
            geometry,
            refresh_mhz,
        }
    }

    /// Returns the length of one refresh cycle, falling back to
    /// `fallback_mhz` when the output does not report a rate.
    #[must_use]
    pub fn refresh_interval(&self, fallback_mhz: u32) -> Duration {
        let mhz = if self.refresh_mhz == 0 {
            fallback_mhz
        } else {
            self.refresh_mhz
        };
        // 1e12 ns·mHz per cycle.
        Duration(1_000_000_000_000_u64.checked_div(u64::from(mhz)).unwrap_or(0))
    }
}
