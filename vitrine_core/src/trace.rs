// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the repaint loop.
//!
//! [`TraceSink`] has one method per event the compositor emits while
//! painting an output. All bodies default to no-ops, so a sink implements
//! only the events it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. With the `trace`
//! feature **off**, every `Tracer` method compiles to nothing. With it **on**,
//! each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects paint-phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! These events complement the `tracing` log lines the crates emit: logs
//! explain *why* something degraded, trace events carry the per-frame
//! numbers a profiler needs.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-window [`WindowPaintEvent`]
//!   and [`DamageRect`] events plus the corresponding `TraceSink` methods.

use crate::effect::EffectId;
use crate::output::OutputId;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One phase of the per-frame paint pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintPhase {
    /// Effects adjust screen paint data and advance timelines.
    PrePaintScreen,
    /// Effects adjust per-window paint data.
    PrePaintWindow,
    /// The screen pass (effects may transform the whole scene).
    PaintScreen,
    /// Per-window draw through the effect chain.
    PaintWindow,
    /// Per-window bookkeeping after drawing.
    PostPaintWindow,
    /// Screen bookkeeping; effects may request another repaint.
    PostPaintScreen,
}

impl PaintPhase {
    /// Number of phases.
    pub const COUNT: usize = 6;

    /// All phases in execution order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::PrePaintScreen,
        Self::PrePaintWindow,
        Self::PaintScreen,
        Self::PaintWindow,
        Self::PostPaintWindow,
        Self::PostPaintScreen,
    ];

    /// Returns the dense index of this phase.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::PrePaintScreen => 0,
            Self::PrePaintWindow => 1,
            Self::PaintScreen => 2,
            Self::PaintWindow => 3,
            Self::PostPaintWindow => 4,
            Self::PostPaintScreen => 5,
        }
    }

    /// Returns a short lowercase name used by text sinks.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrePaintScreen => "pre_paint_screen",
            Self::PrePaintWindow => "pre_paint_window",
            Self::PaintScreen => "paint_screen",
            Self::PaintWindow => "paint_window",
            Self::PostPaintWindow => "post_paint_window",
            Self::PostPaintScreen => "post_paint_screen",
        }
    }
}

/// Result of waiting on a GPU fence for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FenceOutcome {
    /// The fence signaled; the frame is synchronized.
    Signaled,
    /// The bounded wait expired; the frame went out unsynchronized.
    TimedOut,
    /// The driver reported an error; the frame went out unsynchronized.
    Failed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an output starts compositing a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic per-compositor frame counter.
    pub frame_index: u64,
    /// The output being painted.
    pub output: OutputId,
    /// Present time handed to effects.
    pub present_time: HostTime,
    /// Number of damage rectangles going into the frame.
    pub damage_rects: usize,
    /// Whether the whole output is repainted.
    pub full_repaint: bool,
}

/// Marks the beginning of a paint phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PaintPhase,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a paint phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PaintPhase,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when an effect hook fails and the effect is taken out of the
/// chain.
#[derive(Clone, Copy, Debug)]
pub struct EffectFaultEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The failing effect.
    pub effect: EffectId,
    /// The phase in which it failed.
    pub phase: PaintPhase,
}

/// Emitted once per frame by the X11 sync path.
#[derive(Clone, Copy, Debug)]
pub struct FenceEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Ring slot of the fence.
    pub slot: u8,
    /// Whether the wait succeeded.
    pub outcome: FenceOutcome,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Which output.
    pub output: OutputId,
    /// Present time handed to effects.
    pub present_time: HostTime,
    /// Duration of each [`PaintPhase`] in nanoseconds, indexed by
    /// [`PaintPhase::index`] (0 if not measured).
    pub phase_nanos: [u64; PaintPhase::COUNT],
    /// Windows that reached the final painter.
    pub windows_painted: u32,
    /// Whether the whole output was repainted.
    pub full_repaint: bool,
    /// Whether an effect requested another frame in post-paint.
    pub repaint_requested: bool,
}

impl FrameSummary {
    /// Returns the sum of all measured phase durations.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        self.phase_nanos.iter().sum()
    }
}

/// A window handed to the final painter (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct WindowPaintEvent {
    /// Slot index of the window.
    pub window_index: u32,
    /// Raw paint mask bits.
    pub mask: u32,
    /// Final opacity after all effects.
    pub opacity: f32,
}

/// An axis-aligned damage rectangle (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the repaint loop.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when an output starts a frame.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a paint phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a paint phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when an effect faults.
    fn on_effect_fault(&mut self, e: &EffectFaultEvent) {
        _ = e;
    }

    /// Called with the frame's fence outcome.
    fn on_fence(&mut self, e: &FenceEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with the windows painted this frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_window_paints(&mut self, frame_index: u64, windows: &[WindowPaintEvent]) {
        _ = (frame_index, windows);
    }

    /// Called with the frame's damage rectangles (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:expr) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        dispatch!(self, on_frame_begin, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        dispatch!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        dispatch!(self, on_phase_end, e);
    }

    /// Emits an [`EffectFaultEvent`].
    #[inline]
    pub fn effect_fault(&mut self, e: &EffectFaultEvent) {
        dispatch!(self, on_effect_fault, e);
    }

    /// Emits a [`FenceEvent`].
    #[inline]
    pub fn fence(&mut self, e: &FenceEvent) {
        dispatch!(self, on_fence, e);
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        dispatch!(self, on_frame_summary, s);
    }

    /// Emits per-window paint records (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn window_paints(&mut self, frame_index: u64, windows: &[WindowPaintEvent]) {
        if let Some(s) = &mut self.sink {
            s.on_window_paints(frame_index, windows);
        }
    }

    /// Emits damage rectangles (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(frame_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects paint-phase timestamps during a frame and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    begin: FrameBeginEvent,
    starts: [Option<HostTime>; PaintPhase::COUNT],
    ends: [Option<HostTime>; PaintPhase::COUNT],
    windows_painted: u32,
    repaint_requested: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(begin: &FrameBeginEvent) -> Self {
        Self {
            begin: *begin,
            starts: [None; PaintPhase::COUNT],
            ends: [None; PaintPhase::COUNT],
            windows_painted: 0,
            repaint_requested: false,
        }
    }

    /// Records the start of a phase. Repeated phases keep the first start.
    pub fn phase_begin(&mut self, phase: PaintPhase, t: HostTime) {
        self.starts[phase.index()].get_or_insert(t);
    }

    /// Records the end of a phase. Repeated phases keep the last end.
    pub fn phase_end(&mut self, phase: PaintPhase, t: HostTime) {
        self.ends[phase.index()] = Some(t);
    }

    /// Counts one window handed to the final painter.
    pub fn window_painted(&mut self) {
        self.windows_painted += 1;
    }

    /// Records whether post-paint asked for another frame.
    pub fn set_repaint_requested(&mut self, requested: bool) {
        self.repaint_requested = requested;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        let mut phase_nanos = [0; PaintPhase::COUNT];
        for phase in PaintPhase::ALL {
            let i = phase.index();
            if let (Some(start), Some(end)) = (self.starts[i], self.ends[i]) {
                phase_nanos[i] = end.saturating_duration_since(start).nanos();
            }
        }
        FrameSummary {
            frame_index: self.begin.frame_index,
            output: self.begin.output,
            present_time: self.begin.present_time,
            phase_nanos,
            windows_painted: self.windows_painted,
            full_repaint: self.begin.full_repaint,
            repaint_requested: self.repaint_requested,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> FrameBeginEvent {
        FrameBeginEvent {
            frame_index: 42,
            output: OutputId(1),
            present_time: HostTime::from_millis(1000),
            damage_rects: 3,
            full_repaint: false,
        }
    }

    #[test]
    fn phase_indices_are_dense_and_ordered() {
        for (i, phase) in PaintPhase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i, "{phase:?} out of order");
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_frame_begin(&sample_begin());
        sink.on_effect_fault(&EffectFaultEvent {
            frame_index: 1,
            effect: EffectId(3),
            phase: PaintPhase::PaintWindow,
        });
        sink.on_fence(&FenceEvent {
            frame_index: 1,
            slot: 2,
            outcome: FenceOutcome::TimedOut,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&sample_begin());
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(&sample_begin());
        builder.phase_begin(PaintPhase::PrePaintScreen, HostTime(100));
        builder.phase_end(PaintPhase::PrePaintScreen, HostTime(150));
        // Per-window phases repeat; the span covers first start to last end.
        builder.phase_begin(PaintPhase::PaintWindow, HostTime(200));
        builder.phase_end(PaintPhase::PaintWindow, HostTime(260));
        builder.phase_begin(PaintPhase::PaintWindow, HostTime(270));
        builder.phase_end(PaintPhase::PaintWindow, HostTime(400));
        builder.window_painted();
        builder.window_painted();
        builder.set_repaint_requested(true);

        let summary = builder.finish();
        assert_eq!(summary.phase_nanos[PaintPhase::PrePaintScreen.index()], 50);
        assert_eq!(summary.phase_nanos[PaintPhase::PaintWindow.index()], 200);
        assert_eq!(summary.phase_nanos[PaintPhase::PostPaintScreen.index()], 0);
        assert_eq!(summary.total_nanos(), 250);
        assert_eq!(summary.windows_painted, 2);
        assert!(summary.repaint_requested);
        assert_eq!(summary.frame_index, 42);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            faults: Vec<EffectId>,
        }
        impl TraceSink for RecordingSink {
            fn on_effect_fault(&mut self, e: &EffectFaultEvent) {
                self.faults.push(e.effect);
            }
        }

        let mut sink = RecordingSink { faults: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.effect_fault(&EffectFaultEvent {
            frame_index: 0,
            effect: EffectId(9),
            phase: PaintPhase::PrePaintWindow,
        });
        drop(tracer);
        assert_eq!(sink.faults, &[EffectId(9)]);
    }
}
