// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fades windows in when they are mapped and out when they close.

use alloc::collections::BTreeMap;

use vitrine_core::effect::GrabRole;
use vitrine_core::region::Region;
use vitrine_core::time::{Duration, HostTime};
use vitrine_core::window::{DeletedRef, VisibilityReasons, VisibleRef, WindowFlags, WindowId};

use crate::config::AnimationConfig;
use crate::effect::{Effect, LifecycleContext, Next, ReconfigureFlags};
use crate::error::EffectError;
use crate::paint::{PaintMask, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};
use crate::timeline::{Direction, Easing, Timeline};

/// Chain position of [`FadeEffect`].
pub const FADE_POSITION: i32 = 60;

#[derive(Debug)]
struct Fade {
    timeline: Timeline,
    // Held for closing windows only; dropping them lets the remnant go.
    _deleted: Option<DeletedRef>,
    _visible: Option<VisibleRef>,
}

/// Opacity animation on map and close.
///
/// Skips windows whose open or close grab is held by another effect, and
/// popups (left to sliding popups or nothing).
#[derive(Debug, Default)]
pub struct FadeEffect {
    fades: BTreeMap<WindowId, Fade>,
    fade_in: Duration,
    fade_out: Duration,
}

impl FadeEffect {
    /// Creates the effect with default durations until reconfigured.
    #[must_use]
    pub fn new() -> Self {
        let config = AnimationConfig::new();
        Self {
            fades: BTreeMap::new(),
            fade_in: config.fade_in,
            fade_out: config.fade_out,
        }
    }

    /// Returns `true` while `window` is fading.
    #[must_use]
    pub fn is_fading(&self, window: WindowId) -> bool {
        self.fades.contains_key(&window)
    }

    fn may_animate(window: WindowId, role: GrabRole, ctx: &mut LifecycleContext<'_>) -> bool {
        if ctx.windows.flags(window).contains(WindowFlags::POPUP) {
            return false;
        }
        ctx.windows.try_grab(window, role, ctx.effect)
    }
}

impl Effect for FadeEffect {
    fn reconfigure(&mut self, flags: ReconfigureFlags, config: &AnimationConfig) {
        _ = flags;
        self.fade_in = config.animation_time(config.fade_in);
        self.fade_out = config.animation_time(config.fade_out);
    }

    fn is_active(&self) -> bool {
        !self.fades.is_empty()
    }

    fn requested_position(&self) -> i32 {
        FADE_POSITION
    }

    fn pre_paint_screen(
        &mut self,
        data: &mut ScreenPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        for fade in self.fades.values_mut() {
            fade.timeline.advance(present);
        }
        next.pre_paint_screen(data, present);
        Ok(())
    }

    fn pre_paint_window(
        &mut self,
        window: WindowId,
        data: &mut WindowPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        if self.fades.contains_key(&window) {
            data.set_translucent();
        }
        next.pre_paint_window(window, data, present);
        Ok(())
    }

    fn paint_window(
        &mut self,
        window: WindowId,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        if let Some(fade) = self.fades.get(&window) {
            data.multiply_opacity(fade.timeline.value());
        }
        next.paint_window(window, mask, region, data);
        Ok(())
    }

    fn post_paint_screen(&mut self, next: &mut Next<'_, '_>) -> Result<(), EffectError> {
        let ctx = next.ctx();
        for &window in self.fades.keys() {
            ctx.repaints.window(window);
        }
        self.fades.retain(|_, fade| !fade.timeline.is_done());
        next.post_paint_screen();
        Ok(())
    }

    fn window_added(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        if !Self::may_animate(window, GrabRole::WindowAdded, ctx) {
            return;
        }
        self.fades.insert(
            window,
            Fade {
                timeline: Timeline::new(self.fade_in, Direction::Forward, Easing::OutQuad),
                _deleted: None,
                _visible: None,
            },
        );
        ctx.repaints.window(window);
    }

    fn window_closed(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        if !Self::may_animate(window, GrabRole::WindowClosed, ctx) {
            return;
        }
        // A window closed mid fade-in fades out from where it is.
        let timeline = match self.fades.remove(&window) {
            Some(mut fade) => {
                fade.timeline.retarget(Direction::Backward, self.fade_out, Easing::OutQuad);
                fade.timeline
            }
            None => Timeline::new(self.fade_out, Direction::Backward, Easing::OutQuad),
        };
        self.fades.insert(
            window,
            Fade {
                timeline,
                _deleted: Some(ctx.windows.deleted_ref(window)),
                _visible: Some(ctx.windows.visible_ref(window, VisibilityReasons::DELETED)),
            },
        );
        ctx.repaints.window(window);
    }

    fn window_deleted(&mut self, window: WindowId) {
        self.fades.remove(&window);
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use kurbo::Rect;
    use vitrine_core::effect::EffectId;
    use vitrine_core::window::WindowStore;

    use super::*;
    use crate::chain::EffectChain;
    use crate::effect::RepaintRequests;

    #[test]
    fn closed_window_is_kept_until_fade_finishes() {
        let mut windows = WindowStore::new();
        let mut repaints = RepaintRequests::new();
        let mut chain = EffectChain::default();
        chain.load("fade", Box::new(FadeEffect::new()), &[]).unwrap();

        let w = windows.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));
        windows.close_window(w);
        chain.window_closed(w, &mut windows, &mut repaints);

        assert_eq!(windows.deleted_ref_count(w), 1, "fade holds the remnant");
        assert_eq!(
            windows.paint_disabled(w),
            VisibilityReasons::empty(),
            "remnant stays painted"
        );
        assert!(windows.reap_remnants().is_empty());
        assert!(!repaints.is_empty());
    }

    #[test]
    fn closing_mid_fade_in_keeps_opacity() {
        let mut windows = WindowStore::new();
        let mut repaints = RepaintRequests::new();
        let config = AnimationConfig::new();
        let mut fade = FadeEffect::new();
        let w = windows.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));

        let mut ctx = LifecycleContext {
            effect: EffectId(1),
            windows: &mut windows,
            repaints: &mut repaints,
            config: &config,
        };
        fade.window_added(w, &mut ctx);
        let half = Duration(fade.fade_in.nanos() / 2);
        fade.fades.get_mut(&w).unwrap().timeline.advance_by(half);
        let before = fade.fades[&w].timeline.value();
        assert!(before > 0.5, "eased fade-in leads its clock");

        ctx.windows.close_window(w);
        fade.window_closed(w, &mut ctx);
        let after = fade.fades[&w].timeline.value();
        assert!((after - before).abs() < 1e-6, "before {before} after {after}");
        assert_eq!(fade.fades[&w].timeline.direction(), Direction::Backward);
    }

    #[test]
    fn popups_are_not_faded() {
        let mut windows = WindowStore::new();
        let mut repaints = RepaintRequests::new();
        let mut chain = EffectChain::default();
        chain.load("fade", Box::new(FadeEffect::new()), &[]).unwrap();
        let w = windows.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        windows.set_flags(w, WindowFlags::POPUP);
        chain.window_added(w, &mut windows, &mut repaints);
        assert_eq!(windows.grab(w, GrabRole::WindowAdded), None);
        assert!(repaints.is_empty());
    }
}
