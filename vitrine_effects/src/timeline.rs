// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation timelines driven by frame present times.
//!
//! Effects do not get a fixed frame interval. Consecutive pre-paint calls may
//! be one refresh apart, several seconds apart (after the compositor went
//! idle), or far apart because a timer was throttled. A [`Timeline`]
//! therefore measures its own deltas from the present times it is given and
//! treats the first present time after a reset as its start, so an idle
//! period never makes an animation jump.

use vitrine_core::time::{Duration, HostTime};

/// Playback direction of a [`Timeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Value runs from 0 to 1.
    #[default]
    Forward,
    /// Value runs from 1 to 0.
    Backward,
}

/// Easing curve applied to linear progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    /// No easing.
    #[default]
    Linear,
    /// Quadratic, accelerating.
    InQuad,
    /// Quadratic, decelerating.
    OutQuad,
    /// Cubic, accelerating.
    InCubic,
    /// Cubic, decelerating.
    OutCubic,
    /// Cubic, accelerating then decelerating.
    InOutCubic,
}

impl Easing {
    /// Maps linear progress `t` in `0.0..=1.0` through the curve.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InCubic => t * t * t,
            Self::OutCubic => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }

    /// Linear progress at which the curve reaches `value`.
    ///
    /// Every curve is monotonic, so bisection converges on the single
    /// solution.
    #[must_use]
    pub fn invert(self, value: f64) -> f64 {
        let value = value.clamp(0.0, 1.0);
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..64 {
            let mid = (lo + hi) / 2.0;
            if self.apply(mid) < value {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }
}

/// Linear interpolation between `from` and `to`.
#[inline]
#[must_use]
pub fn interpolate(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// A finite animation clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeline {
    duration: Duration,
    elapsed: Duration,
    direction: Direction,
    easing: Easing,
    clock: PresentDelta,
}

impl Timeline {
    /// Creates a timeline at its start.
    #[must_use]
    pub const fn new(duration: Duration, direction: Direction, easing: Easing) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
            direction,
            easing,
            clock: PresentDelta::new(),
        }
    }

    /// Total duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Changes the duration, keeping the elapsed time.
    ///
    /// Use [`retarget`](Self::retarget) to change it mid-animation without a
    /// jump in [`value`](Self::value).
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Current direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Reverses playback from the current value.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.retarget(direction, self.duration, self.easing);
        }
    }

    /// Switches direction, duration and easing together without moving
    /// [`value`](Self::value).
    ///
    /// Elapsed time is solved so the new curve passes through the value the
    /// old one had reached.
    pub fn retarget(&mut self, direction: Direction, duration: Duration, easing: Easing) {
        let value = self.value();
        self.direction = direction;
        self.duration = duration;
        self.easing = easing;
        let eased = match direction {
            Direction::Forward => value,
            Direction::Backward => 1.0 - value,
        };
        let progress = easing.invert(eased);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the product is bounded by the duration's own nanoseconds"
        )]
        let nanos = (duration.nanos() as f64 * progress + 0.5) as u64;
        self.elapsed = Duration(nanos).min(duration);
    }

    /// Changes the easing curve.
    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    /// Time played so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Rewinds to the start. The next [`advance`](Self::advance) call only
    /// records its present time.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.clock.reset();
    }

    /// Advances to `present`. The first call after construction or
    /// [`reset`](Self::reset) has zero delta.
    pub fn advance(&mut self, present: HostTime) {
        let delta = self.clock.advance(present);
        self.advance_by(delta);
    }

    /// Advances by an explicit delta.
    pub fn advance_by(&mut self, delta: Duration) {
        self.elapsed = (self.elapsed + delta).min(self.duration);
    }

    /// Linear progress in `0.0..=1.0`, ignoring direction and easing.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.nanos() as f64 / self.duration.nanos() as f64).clamp(0.0, 1.0)
    }

    /// Eased value. Runs 0→1 forward and 1→0 backward.
    #[must_use]
    pub fn value(&self) -> f64 {
        let p = self.easing.apply(self.progress());
        match self.direction {
            Direction::Forward => p,
            Direction::Backward => 1.0 - p,
        }
    }

    /// Returns `true` once the full duration has played.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Tracks deltas between present times across idle periods.
///
/// The first call after construction or [`reset`](Self::reset) yields zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentDelta {
    last: Option<HostTime>,
}

impl PresentDelta {
    /// Creates a tracker with no previous present time.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Returns the time since the previous call.
    pub fn advance(&mut self, present: HostTime) -> Duration {
        let delta = self
            .last
            .map_or(Duration::ZERO, |last| present.saturating_duration_since(last));
        self.last = Some(present);
        delta
    }

    /// Forgets the previous present time. Call when no animation is running.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> HostTime {
        HostTime::from_millis(v)
    }

    #[test]
    fn first_advance_is_zero_delta() {
        let mut tl = Timeline::new(Duration::from_millis(100), Direction::Forward, Easing::Linear);
        tl.advance(ms(5_000));
        assert_eq!(tl.elapsed(), Duration::ZERO, "start is the first present time");
        tl.advance(ms(5_050));
        assert_eq!(tl.value(), 0.5);
        tl.advance(ms(9_000));
        assert!(tl.is_done());
        assert_eq!(tl.value(), 1.0, "clamped at the end");
    }

    #[test]
    fn reversing_keeps_value_continuous() {
        let mut tl = Timeline::new(Duration::from_millis(100), Direction::Forward, Easing::Linear);
        tl.advance_by(Duration::from_millis(30));
        assert_eq!(tl.value(), 0.3);
        tl.set_direction(Direction::Backward);
        assert!((tl.value() - 0.3).abs() < 1e-6, "no jump on reversal");
        tl.advance_by(Duration::from_millis(70));
        assert!(tl.is_done());
        assert_eq!(tl.value(), 0.0);
    }

    #[test]
    fn eased_reversal_keeps_value() {
        // Fade-in closed halfway, fading out over the same duration.
        let mut tl = Timeline::new(Duration::from_millis(150), Direction::Forward, Easing::OutQuad);
        tl.advance_by(Duration::from_millis(75));
        let before = tl.value();
        assert!((before - 0.75).abs() < 1e-9);
        tl.retarget(Direction::Backward, Duration::from_millis(150), Easing::OutQuad);
        assert!((tl.value() - before).abs() < 1e-6, "got {}", tl.value());
        tl.advance_by(Duration::from_millis(10));
        assert!(tl.value() < before, "moving back towards zero");
        tl.advance_by(Duration::from_millis(150));
        assert!(tl.is_done());
        assert_eq!(tl.value(), 0.0);
    }

    #[test]
    fn retarget_to_longer_duration_and_new_curve_keeps_value() {
        // Slide-in closed halfway: 150 ms OutCubic in, 250 ms InCubic out.
        let mut tl = Timeline::new(Duration::from_millis(150), Direction::Forward, Easing::OutCubic);
        tl.advance_by(Duration::from_millis(75));
        let before = tl.value();
        assert!((before - 0.875).abs() < 1e-9);
        tl.retarget(Direction::Backward, Duration::from_millis(250), Easing::InCubic);
        assert!((tl.value() - before).abs() < 1e-6, "got {}", tl.value());
        assert_eq!(tl.duration(), Duration::from_millis(250));
        assert!(!tl.is_done());
    }

    #[test]
    fn same_curve_reversal_with_new_duration_keeps_value() {
        let mut tl = Timeline::new(Duration::from_millis(150), Direction::Forward, Easing::OutCubic);
        tl.advance_by(Duration::from_millis(75));
        let before = tl.value();
        tl.retarget(Direction::Backward, Duration::from_millis(250), Easing::OutCubic);
        assert!((tl.value() - before).abs() < 1e-6, "got {}", tl.value());
    }

    #[test]
    fn invert_undoes_apply() {
        for e in [
            Easing::Linear,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InCubic,
            Easing::OutCubic,
            Easing::InOutCubic,
        ] {
            for t in [0.0, 0.1, 0.25, 0.5, 0.8, 1.0] {
                assert!((e.invert(e.apply(t)) - t).abs() < 1e-6, "{e:?} at {t}");
            }
        }
    }

    #[test]
    fn timeline_restarts_its_clock_on_reset() {
        let mut tl = Timeline::new(Duration::from_millis(100), Direction::Forward, Easing::Linear);
        tl.advance(ms(1_000));
        tl.advance(ms(1_040));
        assert_eq!(tl.elapsed(), Duration::from_millis(40));
        tl.reset();
        tl.advance(ms(60_000));
        assert_eq!(tl.elapsed(), Duration::ZERO, "idle gap is not played");
    }

    #[test]
    fn zero_duration_is_done_immediately() {
        let tl = Timeline::new(Duration::ZERO, Direction::Forward, Easing::OutCubic);
        assert!(tl.is_done());
        assert_eq!(tl.value(), 1.0);
    }

    #[test]
    fn easing_endpoints() {
        for e in [
            Easing::Linear,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InCubic,
            Easing::OutCubic,
            Easing::InOutCubic,
        ] {
            assert_eq!(e.apply(0.0), 0.0, "{e:?} starts at zero");
            assert_eq!(e.apply(1.0), 1.0, "{e:?} ends at one");
        }
        assert!(Easing::OutCubic.apply(0.5) > 0.5, "decelerating curve leads");
    }

    #[test]
    fn present_delta_resets_after_idle() {
        let mut d = PresentDelta::new();
        assert_eq!(d.advance(ms(100)), Duration::ZERO);
        assert_eq!(d.advance(ms(116)), Duration::from_millis(16));
        d.reset();
        assert_eq!(d.advance(ms(10_000)), Duration::ZERO, "idle gap is not a delta");
    }
}
