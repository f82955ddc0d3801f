// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rolling maximum of paint and render durations.

use vitrine_core::time::Duration;

/// Tracks the largest duration seen over roughly the last `window` samples.
///
/// Two buckets are kept: the one being filled and the one completed before
/// it. [`max`](Self::max) reports the larger, so a spike is remembered for
/// between one and two windows and then forgotten.
#[derive(Clone, Copy, Debug)]
pub struct DurationRecord {
    previous: Duration,
    current: Duration,
    samples: u32,
    window: u32,
}

impl DurationRecord {
    /// Creates an empty record that rolls over every `window` samples.
    #[must_use]
    pub const fn new(window: u32) -> Self {
        Self {
            previous: Duration::ZERO,
            current: Duration::ZERO,
            samples: 0,
            window: if window == 0 { 1 } else { window },
        }
    }

    /// Adds one sample.
    pub fn record(&mut self, sample: Duration) {
        self.current = self.current.max(sample);
        self.samples += 1;
        if self.samples >= self.window {
            self.previous = self.current;
            self.current = Duration::ZERO;
            self.samples = 0;
        }
    }

    /// Returns the largest sample in the current and previous window.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.previous.max(self.current)
    }
}
