// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Failure to set up or pump the event loop.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The event loop itself failed.
    #[error(transparent)]
    Loop(#[from] calloop::Error),
    /// The wake-up channel for queued invocations could not be created.
    #[error("cannot create the invocation ping: {0}")]
    Ping(#[from] std::io::Error),
}
