// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window model, damage regions and frame-loop primitives for the vitrine
//! compositor core.
//!
//! `vitrine_core` holds the data every other vitrine crate agrees on: which
//! windows exist and in what order they stack, which screen areas are
//! damaged, and how time flows between frames. It is `no_std` compatible
//! (with `alloc`) and stores windows in struct-of-arrays layout behind
//! generational handles.
//!
//! # Architecture
//!
//! ```text
//!   Window-management layer (geometry, map/unmap, stacking, damage)
//!       │
//!       ▼
//!   WindowStore ──► collect_changes() ──► WindowChanges { damage: Region }
//!                                              │
//!                 ┌────────────────────────────┘
//!                 ▼
//!   Compositor::schedule_repaint(region)      (vitrine_render)
//!       │  per-output delay timer
//!       ▼
//!   EffectChain paint phases ──► final painter   (vitrine_effects)
//!       │
//!       ▼
//!   reap_remnants() once effects drop their DeletedRefs
//! ```
//!
//! **[`window`]**: Struct-of-arrays window store with generational handles,
//! stacking order, animation grab roles and the [`DeletedRef`] /
//! [`VisibleRef`] lifetime guards.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//! GEOMETRY propagates from a window to its transients; CONTENT, OPACITY and
//! STACKING are local.
//!
//! **[`region`]**: Union-of-rectangles damage regions.
//!
//! **[`deferred`]**: The [`Invoker`](deferred::Invoker) seam through which
//! work is posted back to the event loop instead of running recursively.
//!
//! **[`output`]**: Output identity and geometry.
//!
//! **[`effect`]**: Effect identity and grab roles shared by windows and the
//! effect chain.
//!
//! **[`time`]**: Monotonic present time and the [`Clock`](time::Clock)
//! seam.
//!
//! **[`transform`]**: 4×4 transform used by window and screen paint data.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and paint-phase
//! events, with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-window
//!   paint and damage-rect events.
//!
//! [`DeletedRef`]: window::DeletedRef
//! [`VisibleRef`]: window::VisibleRef

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod deferred;
pub mod dirty;
pub mod effect;
pub mod output;
pub mod region;
pub mod time;
pub mod trace;
pub mod transform;
pub mod window;
