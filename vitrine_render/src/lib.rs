// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-output repaint scheduling and scene painting for the vitrine
//! compositor core.
//!
//! Every output owns a damage region and a delay timer. Damage arms the
//! timer; when it fires the output composites one frame by running the
//! effect chain's paint phases over the windows in stacking order.
//!
//! # Architecture
//!
//! ```text
//!   window changes / effect repaint requests
//!       │
//!       ▼
//!   Compositor::schedule_repaint ──► OutputRenderer { damage, deadline }
//!                                          │ deadline passes
//!                                          ▼
//!   Compositor::dispatch_timers ──► run_output ──► Scene::paint
//!                                                     │
//!                    FrameSync::begin_frame ◄─────────┤
//!                    EffectChain phases ◄─────────────┤
//!                    FrameSync::end_frame ◄───────────┘
//! ```
//!
//! **[`compositor`]**: [`Compositor`]: outputs, locking, scheduling, frame
//! runs, frame callbacks and remnant reaping.
//!
//! **[`output`]**: [`OutputRenderer`]: damage, delay computation and swap
//! gating for one output.
//!
//! **[`scene`]**: Paint order and the per-frame pass through the chain.
//!
//! **[`sync`]**: The [`FrameSync`] hook a backend uses to fence GPU work.
//!
//! **[`config`]**: [`RenderConfig`].
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` dispatch in
//!   `vitrine_core`.
//! - `trace-rich` (disabled by default, implies `trace`): Emits per-window
//!   paint and damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod compositor;
pub mod config;
pub mod duration_record;
pub mod output;
pub mod scene;
pub mod sync;

pub use compositor::{Compositor, RunOutcome};
pub use config::RenderConfig;
pub use output::{OutputRenderer, SwapFeedback};
pub use sync::{FrameSync, NoSync, SyncReport};
