// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic presentation time.
//!
//! [`HostTime`] is a point on the compositor's monotonic clock in
//! nanoseconds. The platform layer samples the clock (usually
//! `CLOCK_MONOTONIC`) and hands the value in; core never reads a clock itself.
//!
//! [`Duration`] is a span in the same units. Effects advance their timelines
//! with the delta between two consecutive present times, which may be zero
//! after an idle period.

use core::cell::Cell;
use core::fmt;
use core::ops::{Add, AddAssign, Sub};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point in time on the monotonic clock, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Creates a time from a millisecond timestamp.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the timestamp truncated to whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ns)", self.0)
    }
}

/// A source of monotonic time.
///
/// The compositor samples it to measure paint and render durations. The
/// platform layer supplies the implementation; tests use a manual clock.
pub trait Clock {
    /// Returns the current monotonic time.
    fn now(&self) -> HostTime;
}

/// A [`Clock`] that only moves when told to.
///
/// Used by headless runs and tests. Interior mutability lets a shared
/// handle advance time while the compositor holds the clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<HostTime>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub const fn new(start: HostTime) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: HostTime) {
        self.now.set(now);
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        self.now.get()
    }
}

/// A span of monotonic time, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// The zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Creates a duration from microseconds.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(NANOS_PER_MICRO))
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration truncated to whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }

    /// Returns the duration in fractional milliseconds.
    #[inline]
    #[must_use]
    pub const fn as_millis_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_MILLI as f64
    }

    /// Returns `true` if the duration is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtraction clamped at zero.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Divides the duration by an integer divisor, returning zero for a zero
    /// divisor.
    #[inline]
    #[must_use]
    pub const fn div_or_zero(self, divisor: u64) -> Self {
        match self.0.checked_div(divisor) {
            Some(v) => Self(v),
            None => Self(0),
        }
    }

    /// Returns the smaller of two durations.
    #[inline]
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 < other.0 { self } else { other }
    }

    /// Returns the larger of two durations.
    #[inline]
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if self.0 > other.0 { self } else { other }
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Duration {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % NANOS_PER_MILLI == 0 {
            write!(f, "Duration({}ms)", self.0 / NANOS_PER_MILLI)
        } else {
            write!(f, "Duration({}ns)", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        let t = HostTime::from_millis(1234);
        assert_eq!(t.as_millis(), 1234);
        assert_eq!(t.nanos(), 1_234_000_000);
    }

    #[test]
    fn subtraction_saturates() {
        let early = HostTime::from_millis(10);
        let late = HostTime::from_millis(25);
        assert_eq!(late - early, Duration::from_millis(15));
        assert_eq!(early - late, Duration::ZERO);
    }

    #[test]
    fn duration_div_by_zero_is_zero() {
        assert_eq!(Duration::from_millis(16).div_or_zero(0), Duration::ZERO);
        assert_eq!(
            Duration::from_millis(16).div_or_zero(10),
            Duration::from_micros(1600)
        );
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(HostTime::from_millis(5));
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.now(), HostTime::from_millis(15), "advance adds to the reading");
        clock.set(HostTime(1));
        assert_eq!(clock.now(), HostTime(1), "set overrides the reading");
    }

    #[test]
    fn debug_prefers_millis() {
        let s = alloc::format!("{:?}", Duration::from_millis(250));
        assert_eq!(s, "Duration(250ms)");
        let s = alloc::format!("{:?}", Duration(5));
        assert_eq!(s, "Duration(5ns)");
    }
}
