// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back as
//! an iterator of [`RecordedEvent`].
//!
//! Rich events ([`on_window_paints`](TraceSink::on_window_paints),
//! [`on_damage_rects`](TraceSink::on_damage_rects)) store only the count.

use vitrine_core::effect::EffectId;
use vitrine_core::output::OutputId;
use vitrine_core::time::HostTime;
use vitrine_core::trace::{
    DamageRect, EffectFaultEvent, FenceEvent, FenceOutcome, FrameBeginEvent, FrameSummary,
    PaintPhase, PhaseBeginEvent, PhaseEndEvent, TraceSink, WindowPaintEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_EFFECT_FAULT: u8 = 4;
const TAG_FENCE: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;
const TAG_WINDOW_PAINTS_COUNT: u8 = 7;
const TAG_DAMAGE_RECTS_COUNT: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_count(&mut self, len: usize) {
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn write_phase(&mut self, p: PaintPhase) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "there are six phases"
        )]
        self.write_u8(p.index() as u8);
    }

    fn write_outcome(&mut self, o: FenceOutcome) {
        self.write_u8(match o {
            FenceOutcome::Signaled => 0,
            FenceOutcome::TimedOut => 1,
            FenceOutcome::Failed => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u32(e.output.0);
        self.write_u64(e.present_time.0);
        self.write_count(e.damage_rects);
        self.write_bool(e.full_repaint);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.0);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.0);
    }

    fn on_effect_fault(&mut self, e: &EffectFaultEvent) {
        self.write_u8(TAG_EFFECT_FAULT);
        self.write_u64(e.frame_index);
        self.write_u32(e.effect.0);
        self.write_phase(e.phase);
    }

    fn on_fence(&mut self, e: &FenceEvent) {
        self.write_u8(TAG_FENCE);
        self.write_u64(e.frame_index);
        self.write_u8(e.slot);
        self.write_outcome(e.outcome);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.output.0);
        self.write_u64(s.present_time.0);
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
        self.write_u32(s.windows_painted);
        self.write_bool(s.full_repaint);
        self.write_bool(s.repaint_requested);
    }

    fn on_window_paints(&mut self, frame_index: u64, windows: &[WindowPaintEvent]) {
        self.write_u8(TAG_WINDOW_PAINTS_COUNT);
        self.write_u64(frame_index);
        self.write_count(windows.len());
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(frame_index);
        self.write_count(rects.len());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// An [`EffectFaultEvent`].
    EffectFault(EffectFaultEvent),
    /// A [`FenceEvent`].
    Fence(FenceEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Number of windows handed to the final painter in a frame.
    WindowPaintsCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of windows.
        count: u32,
    },
    /// Damage-rect count for a frame.
    DamageRectsCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of damage rects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_phase(&mut self) -> Option<PaintPhase> {
        PaintPhase::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_outcome(&mut self) -> Option<FenceOutcome> {
        Some(match self.read_u8()? {
            0 => FenceOutcome::Signaled,
            1 => FenceOutcome::TimedOut,
            _ => FenceOutcome::Failed,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            output: OutputId(self.read_u32()?),
            present_time: self.read_time()?,
            damage_rects: self.read_u32()? as usize,
            full_repaint: self.read_bool()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_effect_fault(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::EffectFault(EffectFaultEvent {
            frame_index: self.read_u64()?,
            effect: EffectId(self.read_u32()?),
            phase: self.read_phase()?,
        }))
    }

    fn decode_fence(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Fence(FenceEvent {
            frame_index: self.read_u64()?,
            slot: self.read_u8()?,
            outcome: self.read_outcome()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let output = OutputId(self.read_u32()?);
        let present_time = self.read_time()?;
        let mut phase_nanos = [0; PaintPhase::COUNT];
        for nanos in &mut phase_nanos {
            *nanos = self.read_u64()?;
        }
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            output,
            present_time,
            phase_nanos,
            windows_painted: self.read_u32()?,
            full_repaint: self.read_bool()?,
            repaint_requested: self.read_bool()?,
        }))
    }

    fn decode_count(&mut self) -> Option<(u64, u32)> {
        Some((self.read_u64()?, self.read_u32()?))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        match self.read_u8()? {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_EFFECT_FAULT => self.decode_effect_fault(),
            TAG_FENCE => self.decode_fence(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_WINDOW_PAINTS_COUNT => {
                let (frame_index, count) = self.decode_count()?;
                Some(RecordedEvent::WindowPaintsCount { frame_index, count })
            }
            TAG_DAMAGE_RECTS_COUNT => {
                let (frame_index, count) = self.decode_count()?;
                Some(RecordedEvent::DamageRectsCount { frame_index, count })
            }
            _ => {
                self.pos = self.data.len();
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> FrameSummary {
        let mut phase_nanos = [0; PaintPhase::COUNT];
        phase_nanos[PaintPhase::PaintWindow.index()] = 1_500;
        FrameSummary {
            frame_index: 7,
            output: OutputId(2),
            present_time: HostTime(16_000_000),
            phase_nanos,
            windows_painted: 3,
            full_repaint: true,
            repaint_requested: false,
        }
    }

    #[test]
    fn events_come_back_in_recording_order() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 7,
            phase: PaintPhase::PostPaintScreen,
            timestamp: HostTime(10),
        });
        rec.on_fence(&FenceEvent {
            frame_index: 7,
            slot: 3,
            outcome: FenceOutcome::TimedOut,
        });
        rec.on_frame_summary(&summary());
        rec.on_damage_rects(
            7,
            &[DamageRect {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            }],
        );

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        let RecordedEvent::PhaseBegin(begin) = &events[0] else {
            panic!("expected phase begin, got {:?}", events[0]);
        };
        assert_eq!(begin.phase, PaintPhase::PostPaintScreen);
        let RecordedEvent::Fence(fence) = &events[1] else {
            panic!("expected fence, got {:?}", events[1]);
        };
        assert_eq!((fence.slot, fence.outcome), (3, FenceOutcome::TimedOut));
        let RecordedEvent::FrameSummary(s) = &events[2] else {
            panic!("expected summary, got {:?}", events[2]);
        };
        assert_eq!(s.phase_nanos, summary().phase_nanos);
        assert_eq!(s.windows_painted, 3);
        assert!(s.full_repaint && !s.repaint_requested, "{s:?}");
        assert!(
            matches!(
                events[3],
                RecordedEvent::DamageRectsCount {
                    frame_index: 7,
                    count: 1
                }
            ),
            "{:?}",
            events[3]
        );
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_frame_summary(&summary());
        rec.on_frame_summary(&summary());
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 3];
        assert_eq!(decode(cut).count(), 1, "only the complete record decodes");
    }

    #[test]
    fn unknown_tag_ends_decoding() {
        assert_eq!(decode(&[0xff, 1, 2, 3]).count(), 0);
    }
}
