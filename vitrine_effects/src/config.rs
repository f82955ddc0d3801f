// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation configuration shared by the built-in effects.

use vitrine_core::time::Duration;

/// Already-parsed animation settings.
///
/// Passed to every effect through [`Effect::reconfigure`]. Durations are the
/// nominal values; effects scale them with [`animation_time`] so the global
/// speed factor applies uniformly.
///
/// [`Effect::reconfigure`]: crate::Effect::reconfigure
/// [`animation_time`]: Self::animation_time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Global duration multiplier. `1.0` is normal speed, `0.5` twice as
    /// fast, `0.0` effectively instant.
    pub speed_factor: f64,
    /// Fade-in duration for newly mapped windows.
    pub fade_in: Duration,
    /// Fade-out duration for closed windows.
    pub fade_out: Duration,
    /// Slide-in duration used when a slide hint carries none.
    pub slide_in: Duration,
    /// Slide-out duration used when a slide hint carries none.
    pub slide_out: Duration,
    /// Slide distance in pixels used when a slide hint carries none.
    pub slide_distance: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationConfig {
    /// Default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            speed_factor: 1.0,
            fade_in: Duration::from_millis(150),
            fade_out: Duration::from_millis(150),
            slide_in: Duration::from_millis(150),
            slide_out: Duration::from_millis(250),
            slide_distance: 128.0,
        }
    }

    /// Scales a nominal duration by [`speed_factor`](Self::speed_factor).
    ///
    /// Never returns less than one millisecond, so timelines always make
    /// progress and finish on the next frame at worst.
    #[must_use]
    pub fn animation_time(&self, nominal: Duration) -> Duration {
        let factor = if self.speed_factor.is_finite() {
            self.speed_factor.max(0.0)
        } else {
            1.0
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "scaled animation durations are far below u64::MAX nanoseconds"
        )]
        let nanos = (nominal.nanos() as f64 * factor) as u64;
        Duration(nanos.max(Duration::from_millis(1).nanos()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_factor_scales_durations() {
        let mut cfg = AnimationConfig::new();
        assert_eq!(cfg.animation_time(cfg.slide_out), Duration::from_millis(250));
        cfg.speed_factor = 0.5;
        assert_eq!(cfg.animation_time(cfg.slide_out), Duration::from_millis(125));
    }

    #[test]
    fn zero_speed_is_one_millisecond() {
        let cfg = AnimationConfig {
            speed_factor: 0.0,
            ..AnimationConfig::new()
        };
        assert_eq!(
            cfg.animation_time(cfg.fade_in),
            Duration::from_millis(1),
            "instant animations still take one frame"
        );
    }
}
