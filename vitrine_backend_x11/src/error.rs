// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::sync_object::SyncState;

/// Why a fence operation did not complete.
///
/// None of these are fatal. The frame goes out unsynchronized and the
/// [`SyncFailurePolicy`](crate::SyncFailurePolicy) decides what happens next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The bounded client wait expired.
    #[error("timed out waiting for the X fence")]
    Timeout,
    /// The driver failed the client wait.
    #[error("client wait on the X fence failed")]
    WaitFailed,
    /// The operation is not legal in the fence's current state.
    #[error("cannot {op} a fence in state {from:?}")]
    InvalidTransition {
        /// State the fence was in.
        from: SyncState,
        /// Rejected operation.
        op: &'static str,
    },
}
