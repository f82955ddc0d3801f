// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fence ring configuration.

use vitrine_core::time::Duration;

/// What to do after a fence could not be finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncFailurePolicy {
    /// Replace the stuck fence and keep synchronizing from the next frame.
    #[default]
    Retry,
    /// Stop synchronizing for the rest of the session.
    Disable,
}

/// Configuration for [`SyncManager`](crate::SyncManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Number of fences in the ring. At least two.
    pub ring_size: usize,
    /// Upper bound for the blocking wait in
    /// [`SyncObject::finish`](crate::SyncObject::finish).
    pub client_wait_timeout: Duration,
    /// Reaction to a failed finish.
    pub policy: SyncFailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncConfig {
    /// Four fences, a one second wait and [`SyncFailurePolicy::Retry`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring_size: 4,
            client_wait_timeout: Duration::from_millis(1000),
            policy: SyncFailurePolicy::Retry,
        }
    }

    /// Returns a copy with `policy`.
    #[must_use]
    pub const fn with_policy(mut self, policy: SyncFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a copy with `ring_size` fences, raised to two if smaller.
    #[must_use]
    pub const fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = if ring_size < 2 { 2 } else { ring_size };
        self
    }

    /// How many slots past the cursor [`SyncManager::update_fences`]
    /// advances each frame.
    ///
    /// [`SyncManager::update_fences`]: crate::SyncManager::update_fences
    #[must_use]
    pub const fn lookahead(&self) -> usize {
        let limit = self.ring_size.saturating_sub(1);
        if limit < 2 { limit } else { 2 }
    }
}
