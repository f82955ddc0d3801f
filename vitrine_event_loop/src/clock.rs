// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Instant;

use vitrine_core::time::{Clock, HostTime};

/// [`Clock`] backed by [`Instant`], counting nanoseconds from its creation.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a clock at [`HostTime`] zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The [`Instant`] a host time corresponds to, for timer deadlines.
    #[must_use]
    pub fn instant(&self, t: HostTime) -> Instant {
        self.origin + std::time::Duration::from_nanos(t.0)
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> HostTime {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "u64 nanoseconds cover centuries of uptime"
        )]
        HostTime(self.origin.elapsed().as_nanos() as u64)
    }
}
