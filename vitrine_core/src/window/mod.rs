// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window data model.
//!
//! A *window* is anything the compositor paints on behalf of a client. Each
//! window has:
//!
//! - An identity ([`WindowId`]): a generational handle that becomes stale
//!   once the window is removed.
//! - Properties set by the window-management layer:
//!   [`geometry`](WindowStore::set_geometry),
//!   [`opacity`](WindowStore::set_opacity), [`flags`](WindowStore::set_flags),
//!   [`transient parent`](WindowStore::set_transient_for) and a place in the
//!   stacking order.
//! - Per-role animation grabs so at most one effect animates its open or
//!   close transition.
//! - Lifetime counters behind [`DeletedRef`] and [`VisibleRef`].
//!
//! # Remnants
//!
//! [`close_window`](WindowStore::close_window) does not remove a window. It
//! stays in the stacking order as a remnant for as long as an effect holds a
//! [`DeletedRef`], and is removed by the first
//! [`reap_remnants`](WindowStore::reap_remnants) call after the last ref is
//! dropped.

mod changes;
mod id;
mod lifetime;
mod store;

pub use changes::WindowChanges;
pub use id::{INVALID, WindowId};
pub use lifetime::{DeletedRef, VisibilityReasons, VisibleRef};
pub use store::{WindowFlags, WindowStore};
