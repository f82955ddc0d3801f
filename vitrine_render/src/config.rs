// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Repaint scheduling configuration.

use vitrine_core::time::Duration;

/// Configuration for the [`Compositor`](crate::Compositor).
///
/// Arrives already parsed; the compositor never reads settings itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Upper bound on the delay timer. 250 ms keeps a 4 fps floor.
    pub max_delay: Duration,
    /// The vblank margin is `refresh / vblank_margin_divisor`.
    pub vblank_margin_divisor: u64,
    /// Number of frames a paint or render duration maximum is kept for.
    pub duration_window: u32,
    /// Refresh rate in millihertz for outputs that report none.
    pub default_refresh_mhz: u32,
    /// Whether the backend reports buffer swaps. Without swap events the
    /// next run is retarded by one refresh cycle instead of waiting for
    /// [`Compositor::swap_complete`](crate::Compositor::swap_complete).
    pub swap_events: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderConfig {
    /// Default configuration for a backend without swap events.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_delay: Duration::from_millis(250),
            vblank_margin_divisor: 10,
            duration_window: 100,
            default_refresh_mhz: 60_000,
            swap_events: false,
        }
    }

    /// Default configuration for a backend that reports buffer swaps.
    #[must_use]
    pub const fn with_swap_events() -> Self {
        Self {
            swap_events: true,
            ..Self::new()
        }
    }
}
