// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in microseconds.

use std::io::Write;

use vitrine_core::trace::{
    DamageRect, EffectFaultEvent, FenceEvent, FenceOutcome, FrameBeginEvent, FrameSummary,
    PaintPhase, PhaseBeginEvent, PhaseEndEvent, TraceSink, WindowPaintEvent,
};

use crate::nanos_to_us;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn outcome_name(outcome: FenceOutcome) -> &'static str {
    match outcome {
        FenceOutcome::Signaled => "signaled",
        FenceOutcome::TimedOut => "TIMED OUT",
        FenceOutcome::Failed => "FAILED",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let kind = if e.full_repaint { "full" } else { "partial" };
        let _ = writeln!(
            self.writer,
            "[frame] frame={} output={} present={:.1}µs damage={} ({kind})",
            e.frame_index,
            e.output.0,
            nanos_to_us(e.present_time.0),
            e.damage_rects,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            nanos_to_us(e.timestamp.0),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            nanos_to_us(e.timestamp.0),
        );
    }

    fn on_effect_fault(&mut self, e: &EffectFaultEvent) {
        let _ = writeln!(
            self.writer,
            "[fault] frame={} effect={} during {}",
            e.frame_index,
            e.effect.0,
            e.phase.name(),
        );
    }

    fn on_fence(&mut self, e: &FenceEvent) {
        let _ = writeln!(
            self.writer,
            "[fence] frame={} slot={} {}",
            e.frame_index,
            e.slot,
            outcome_name(e.outcome),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let phase_us = |phase: PaintPhase| nanos_to_us(s.phase_nanos[phase.index()]);
        let repaint = if s.repaint_requested { " repaint" } else { "" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} output={} windows={} pre={:.1}µs paint={:.1}µs \
             draw={:.1}µs post={:.1}µs total={:.1}µs{repaint}",
            s.frame_index,
            s.output.0,
            s.windows_painted,
            phase_us(PaintPhase::PrePaintScreen) + phase_us(PaintPhase::PrePaintWindow),
            phase_us(PaintPhase::PaintScreen),
            phase_us(PaintPhase::PaintWindow),
            phase_us(PaintPhase::PostPaintWindow) + phase_us(PaintPhase::PostPaintScreen),
            nanos_to_us(s.total_nanos()),
        );
    }

    fn on_window_paints(&mut self, frame_index: u64, windows: &[WindowPaintEvent]) {
        let _ = writeln!(
            self.writer,
            "[windows] frame={frame_index} painted={}",
            windows.len(),
        );
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let _ = writeln!(
            self.writer,
            "[damage] frame={frame_index} rects={}",
            rects.len(),
        );
    }
}
