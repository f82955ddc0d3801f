// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-output repaint state: damage, delay timer and swap gating.
//!
//! The delay timer is a deadline, not a system timer. The event-loop driver
//! asks the compositor for the earliest deadline and calls
//! [`Compositor::dispatch_timers`](crate::Compositor::dispatch_timers) when
//! it passes.
//!
//! After a buffer swap the delay aims the next run shortly before the next
//! vblank:
//!
//! ```text
//!   delay = max(refresh − vblank_to_now − refresh/10 − max_paint − max_render, 0)
//!   timer = now + min(delay, max_delay)
//! ```

use alloc::vec::Vec;

use kurbo::Rect;
use vitrine_core::output::{OutputId, OutputInfo};
use vitrine_core::region::Region;
use vitrine_core::time::{Duration, HostTime};
use vitrine_core::window::WindowId;
use vitrine_effects::FramebufferStack;

use crate::config::RenderConfig;
use crate::duration_record::DurationRecord;

/// What the backend knows about a completed buffer swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwapFeedback {
    /// Hardware timestamp of the vblank the buffer was presented at.
    pub vblank: Option<HostTime>,
}

impl SwapFeedback {
    /// A swap reported without a timestamp.
    #[must_use]
    pub const fn software() -> Self {
        Self { vblank: None }
    }

    /// A swap with a hardware vblank timestamp.
    #[must_use]
    pub const fn hardware(vblank: HostTime) -> Self {
        Self {
            vblank: Some(vblank),
        }
    }
}

/// Repaint state of one output.
#[derive(Debug)]
pub struct OutputRenderer {
    id: OutputId,
    info: OutputInfo,
    pub(crate) damage: Region,
    pub(crate) full_repaint: bool,
    deadline: Option<HostTime>,
    delay: Duration,
    idle: bool,
    swap_pending: bool,
    paint_durations: DurationRecord,
    render_durations: DurationRecord,
    pub(crate) framebuffers: FramebufferStack,
    pub(crate) frame_callbacks: Vec<WindowId>,
}

impl OutputRenderer {
    /// Creates the state for a newly reported output. A new output is idle
    /// and needs a full repaint.
    #[must_use]
    pub fn new(id: OutputId, info: OutputInfo, config: &RenderConfig) -> Self {
        Self {
            id,
            info,
            damage: Region::new(),
            full_repaint: true,
            deadline: None,
            delay: Duration::ZERO,
            idle: true,
            swap_pending: false,
            paint_durations: DurationRecord::new(config.duration_window),
            render_durations: DurationRecord::new(config.duration_window),
            framebuffers: FramebufferStack::new(),
            frame_callbacks: Vec::new(),
        }
    }

    /// The output's id.
    #[must_use]
    pub fn id(&self) -> OutputId {
        self.id
    }

    /// Position and size in global coordinates.
    #[must_use]
    pub fn geometry(&self) -> Rect {
        self.info.geometry
    }

    /// The platform description of the output.
    #[must_use]
    pub fn info(&self) -> OutputInfo {
        self.info
    }

    /// Damage accumulated since the last run.
    #[must_use]
    pub fn damage(&self) -> &Region {
        &self.damage
    }

    /// Whether the next run repaints the whole output.
    #[must_use]
    pub fn needs_full_repaint(&self) -> bool {
        self.full_repaint
    }

    /// Whether there is anything to paint.
    #[must_use]
    pub fn has_damage(&self) -> bool {
        self.full_repaint || !self.damage.is_empty()
    }

    /// When the delay timer fires, if armed.
    #[must_use]
    pub fn deadline(&self) -> Option<HostTime> {
        self.deadline
    }

    /// The delay the timer is armed with next.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the last run found nothing to paint.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Whether a buffer swap is in flight.
    #[must_use]
    pub fn is_swap_pending(&self) -> bool {
        self.swap_pending
    }

    /// Largest recent paint duration.
    #[must_use]
    pub fn max_paint_duration(&self) -> Duration {
        self.paint_durations.max()
    }

    /// Largest recent render (submission) duration.
    #[must_use]
    pub fn max_render_duration(&self) -> Duration {
        self.render_durations.max()
    }

    /// Length of one refresh cycle.
    #[must_use]
    pub fn refresh_interval(&self, config: &RenderConfig) -> Duration {
        self.info.refresh_interval(config.default_refresh_mhz)
    }

    pub(crate) fn set_info(&mut self, info: OutputInfo) {
        self.info = info;
    }

    /// Adds `region`, capped to the output. Returns `false` if nothing of
    /// it lies on this output.
    pub(crate) fn add_repaint(&mut self, region: &Region) -> bool {
        let capped = region.intersected_rect(self.info.geometry);
        if capped.is_empty() {
            return false;
        }
        self.damage.union_with(&capped);
        true
    }

    pub(crate) fn add_full_repaint(&mut self) {
        self.full_repaint = true;
    }

    /// Arms the timer unless it is armed already or a swap is pending; the
    /// swap completion arms it instead.
    pub(crate) fn arm(&mut self, now: HostTime, config: &RenderConfig) {
        if self.deadline.is_some() || self.swap_pending {
            return;
        }
        let wait = self.delay.min(config.max_delay);
        self.deadline = Some(now + wait);
        tracing::trace!(output = self.id.0, wait_ms = wait.as_millis_f64(), "delay timer armed");
    }

    pub(crate) fn disarm(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn is_due(&self, now: HostTime) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Takes the damage for a run. Returns `None` and goes idle when there
    /// is nothing to paint; the next composite then happens without delay.
    pub(crate) fn take_damage(&mut self) -> Option<(Region, bool)> {
        if !self.has_damage() {
            if !self.idle {
                tracing::trace!(output = self.id.0, "output idle");
            }
            self.idle = true;
            self.delay = Duration::ZERO;
            return None;
        }
        self.idle = false;
        let full = core::mem::take(&mut self.full_repaint);
        let damage = core::mem::take(&mut self.damage);
        if full {
            Some((Region::from_rect(self.info.geometry), true))
        } else {
            Some((damage, false))
        }
    }

    pub(crate) fn record_durations(&mut self, paint: Duration, render: Duration) {
        self.paint_durations.record(paint);
        self.render_durations.record(render);
    }

    /// Waits for the swap event, or without swap events delays the next run
    /// by one refresh cycle.
    pub(crate) fn retard_next_run(&mut self, now: HostTime, config: &RenderConfig) {
        if config.swap_events {
            self.swap_pending = true;
            return;
        }
        self.delay = self.refresh_interval(config);
        self.arm(now, config);
    }

    /// Handles a completed buffer swap. Returns `false` if no swap was
    /// pending.
    pub(crate) fn swapped(
        &mut self,
        feedback: SwapFeedback,
        now: HostTime,
        config: &RenderConfig,
    ) -> bool {
        if !self.swap_pending {
            tracing::warn!(output = self.id.0, "swap completed but no swap was pending");
            return false;
        }
        self.swap_pending = false;

        let refresh = self.refresh_interval(config);
        let since_vblank = feedback
            .vblank
            .map_or(Duration::ZERO, |vblank| now.saturating_duration_since(vblank));
        self.delay = refresh
            .saturating_sub(since_vblank)
            .saturating_sub(refresh.div_or_zero(config.vblank_margin_divisor))
            .saturating_sub(self.paint_durations.max())
            .saturating_sub(self.render_durations.max());

        self.disarm();
        self.arm(now, config);
        true
    }
}
