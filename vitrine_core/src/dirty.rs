// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for the window store.
//!
//! Window mutations mark one of these [`understory_dirty`] channels. The
//! compositor drains them once per frame through
//! [`WindowStore::collect_changes`](crate::window::WindowStore::collect_changes)
//! and turns the result into per-output damage.
//!
//! # Propagation
//!
//! - [`GEOMETRY`] is marked with
//!   [`EagerPolicy`](understory_dirty::EagerPolicy). Transient windows
//!   (popups, dialogs) depend on their parent on this channel, so moving a
//!   parent also damages the area of every transient stacked on it.
//! - [`CONTENT`], [`OPACITY`] and [`STACKING`] are local: only the marked
//!   window is reported.

use understory_dirty::Channel;

/// Window position or size changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// Window buffer content changed (client commit or damage report).
pub const CONTENT: Channel = Channel::new(1);

/// Window opacity changed.
pub const OPACITY: Channel = Channel::new(2);

/// Window was raised, lowered, added, closed or removed.
pub const STACKING: Channel = Channel::new(3);
