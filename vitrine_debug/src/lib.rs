// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for vitrine frame
//! diagnostics.
//!
//! This crate provides [`TraceSink`](vitrine_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: one human-readable line per event.
//! - [`recorder::RecorderSink`]: compact binary recording, read back with
//!   [`recorder::decode`].
//! - [`chrome::export`]: Chrome Trace Event Format JSON from recorded bytes.
//!
//! ```text
//!   Compositor::run_output ─► Tracer ─► RecorderSink ─► bytes ─► chrome::export ─► JSON
//!                                   └─► PrettyPrintSink ─► stderr
//! ```

pub mod chrome;
pub mod pretty;
pub mod recorder;

/// Host time in microseconds, the unit every sink here reports.
fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
