// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each output becomes a process (`pid`), so frames of different outputs
//! show up on separate tracks. Paint phases are duration events; fences,
//! faults and summaries are instants.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::collections::HashMap;
use std::io::{self, Write};

use serde_json::{Value, json};

use vitrine_core::trace::PaintPhase;

use crate::nanos_to_us;
use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Phase and fence events carry only the frame index; the frame begin
    // tells which output that frame belongs to.
    let mut outputs: HashMap<u64, u32> = HashMap::new();
    // Last timestamp seen per frame, for events that carry none.
    let mut last_ts: HashMap<u64, f64> = HashMap::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                outputs.insert(e.frame_index, e.output.0);
                let ts = nanos_to_us(e.present_time.0);
                last_ts.insert(e.frame_index, ts);
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": ts,
                    "pid": e.output.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "damage_rects": e.damage_rects,
                        "full_repaint": e.full_repaint,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                let ts = nanos_to_us(e.timestamp.0);
                last_ts.insert(e.frame_index, ts);
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Paint",
                    "ts": ts,
                    "pid": outputs.get(&e.frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                let ts = nanos_to_us(e.timestamp.0);
                last_ts.insert(e.frame_index, ts);
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Paint",
                    "ts": ts,
                    "pid": outputs.get(&e.frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::EffectFault(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "EffectFault",
                    "cat": "Effect",
                    "ts": last_ts.get(&e.frame_index).copied().unwrap_or(0.0),
                    "pid": outputs.get(&e.frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "effect": e.effect.0,
                        "phase": e.phase.name(),
                    }
                }));
            }
            RecordedEvent::Fence(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Fence",
                    "cat": "Sync",
                    "ts": last_ts.get(&e.frame_index).copied().unwrap_or(0.0),
                    "pid": outputs.get(&e.frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "slot": e.slot,
                        "outcome": format!("{:?}", e.outcome),
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                let phases: serde_json::Map<String, Value> = PaintPhase::ALL
                    .iter()
                    .map(|phase| {
                        (
                            format!("{}_us", phase.name()),
                            json!(nanos_to_us(s.phase_nanos[phase.index()])),
                        )
                    })
                    .collect();
                let ts = last_ts
                    .get(&s.frame_index)
                    .copied()
                    .unwrap_or_else(|| nanos_to_us(s.present_time.0));
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": s.output.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": s.frame_index,
                        "windows_painted": s.windows_painted,
                        "full_repaint": s.full_repaint,
                        "repaint_requested": s.repaint_requested,
                        "total_us": nanos_to_us(s.total_nanos()),
                        "phases": phases,
                    }
                }));
                outputs.remove(&s.frame_index);
                last_ts.remove(&s.frame_index);
            }
            RecordedEvent::WindowPaintsCount { frame_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "WindowPaints",
                    "cat": "Rich",
                    "ts": last_ts.get(&frame_index).copied().unwrap_or(0.0),
                    "pid": outputs.get(&frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                    }
                }));
            }
            RecordedEvent::DamageRectsCount { frame_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": last_ts.get(&frame_index).copied().unwrap_or(0.0),
                    "pid": outputs.get(&frame_index).copied().unwrap_or(0),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use vitrine_core::output::OutputId;
    use vitrine_core::time::HostTime;
    use vitrine_core::trace::{
        FenceEvent, FenceOutcome, FrameBeginEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 0,
            output: OutputId(3),
            present_time: HostTime(1_000_000),
            damage_rects: 1,
            full_repaint: true,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PaintPhase::PaintWindow,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PaintPhase::PaintWindow,
            timestamp: HostTime(1_000_100),
        });
        rec.on_fence(&FenceEvent {
            frame_index: 0,
            slot: 2,
            outcome: FenceOutcome::Signaled,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameBegin");

        // Phases land on the track of the output that began the frame.
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "paint_window");
        assert_eq!(parsed[1]["pid"], 3);
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1000.1);

        // The fence has no timestamp of its own and takes the last one seen.
        assert_eq!(parsed[3]["name"], "Fence");
        assert_eq!(parsed[3]["ts"], 1000.1);
        assert_eq!(parsed[3]["args"]["outcome"], "Signaled");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
