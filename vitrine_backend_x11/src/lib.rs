// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! X11 backend for vitrine.
//!
//! When the compositor paints from window pixmaps the X server is still
//! rendering into, the GPU has to wait for the X command stream. This crate
//! brackets each frame with an X `SYNC` fence imported as a GPU sync
//! object:
//!
//! ```text
//!   begin_frame ──► SyncManager::next_fence + SyncObject::trigger
//!   before_paint ─► SyncObject::wait        (GPU-side, non-blocking)
//!   end_frame ────► SyncManager::update_fences
//!                      finish (bounded CPU wait) + reset
//! ```
//!
//! The X connection and the GL entry points are consumed through the
//! [`X11Fences`] and [`GpuFences`] traits.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod config;
mod driver;
mod error;
#[cfg(test)]
mod fake;
mod frame_sync;
mod sync_manager;
mod sync_object;

pub use config::{SyncConfig, SyncFailurePolicy};
pub use driver::{ClientWait, GpuFences, GpuSync, ResetCookie, X11Fences, XFence};
pub use error::SyncError;
pub use frame_sync::X11FrameSync;
pub use sync_manager::SyncManager;
pub use sync_object::{SyncObject, SyncState};
