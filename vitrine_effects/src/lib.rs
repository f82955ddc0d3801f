// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect chain, paint pipeline and effect integrations for the vitrine
//! compositor core.
//!
//! An [`Effect`] intercepts the paint phases of every frame. Effects are
//! owned by an [`EffectChain`] and run in order of their requested
//! position; each hook either forwards through its [`Next`] cursor or
//! substitutes its own behaviour.
//!
//! # Frame
//!
//! ```text
//!   start_paint()                  sample is_active() once
//!   pre_paint_screen               chain order
//!   pre_paint_window  ×N           bottom to top
//!   paint_screen                   chain order
//!   paint_window      ×N ──► final painter (GpuBackend::draw_window)
//!   finish_paint_screen            reverse chain order
//!   post_paint_window ×N
//!   post_paint_screen
//! ```
//!
//! **[`chain`]**: The chain driver: load order, fault isolation, phase
//! dispatch.
//!
//! **[`effect`]**: The [`Effect`] trait, [`Next`] and the paint and
//! lifecycle contexts.
//!
//! **[`paint`]**: Per-frame paint records and [`PaintMask`] bits.
//!
//! **[`framebuffer`]**: [`GpuBackend`] seam, [`FramebufferStack`] and
//! [`OffscreenTarget`](framebuffer::OffscreenTarget).
//!
//! **[`load_queue`]**: One-effect-per-iteration load queue.
//!
//! **[`integration`]**: Producer/consumer registries for blur, contrast,
//! slide and screen-state hints.
//!
//! **[`timeline`]**: Animation clocks driven by present time.
//!
//! **[`builtin`]**: Fade, sliding popups, blur and contrast, plus a loader
//! for them.
//!
//! **[`headless`]**: A recording [`GpuBackend`] for headless runs and tests.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod builtin;
pub mod chain;
pub mod config;
pub mod effect;
pub mod error;
pub mod framebuffer;
pub mod headless;
pub mod integration;
pub mod load_queue;
pub mod paint;
pub mod timeline;

pub use chain::EffectChain;
pub use config::AnimationConfig;
pub use effect::{Effect, EffectContext, LifecycleContext, Next, RepaintRequests};
pub use error::{EffectError, FramebufferError, LoadError};
pub use framebuffer::{FramebufferStack, GpuBackend};
pub use load_queue::{EffectLoadQueue, EffectLoader, LoadRequest};
pub use paint::PaintMask;
