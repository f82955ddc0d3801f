// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slides popups in from a screen edge when they map and back out when
//! they close.
//!
//! Only windows with a slide hint in the [`Registry`](crate::integration::Registry)
//! are animated. The hint arrives through a callback that cannot touch the
//! window model, so it is recorded in shared state and applied the next
//! time the effect runs with a [`WindowStore`] at hand.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;
use vitrine_core::effect::{EffectId, GrabRole};
use vitrine_core::region::Region;
use vitrine_core::time::{Duration, HostTime};
use vitrine_core::window::{DeletedRef, VisibilityReasons, VisibleRef, WindowId, WindowStore};

use crate::config::AnimationConfig;
use crate::effect::{Effect, Feature, LifecycleContext, Next, ReconfigureFlags};
use crate::error::EffectError;
use crate::integration::{Integrations, SlideEdge, SlidePayload, Update};
use crate::paint::{PaintMask, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};
use crate::timeline::{Direction, Easing, Timeline, interpolate};

/// Chain position of [`SlidingPopupsEffect`].
pub const SLIDE_POSITION: i32 = 40;

/// Hint state written by the registry callback.
#[derive(Debug, Default)]
struct Hints {
    current: BTreeMap<WindowId, SlidePayload>,
    arrived: Vec<WindowId>,
    dropped: Vec<WindowId>,
}

impl Hints {
    fn record(&mut self, update: &Update<SlidePayload>) {
        match update.window {
            None => {
                self.dropped.extend(self.current.keys().copied());
                self.current.clear();
                self.arrived.clear();
            }
            Some(window) if update.valid => {
                if self.current.insert(window, update.payload).is_none() {
                    self.arrived.push(window);
                }
            }
            Some(window) => {
                self.current.remove(&window);
                self.arrived.retain(|w| *w != window);
                self.dropped.push(window);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlideKind {
    In,
    Out,
}

#[derive(Debug)]
struct Slide {
    kind: SlideKind,
    timeline: Timeline,
    _deleted: Option<DeletedRef>,
    _visible: Option<VisibleRef>,
}

/// Popup slide animation.
#[derive(Debug)]
pub struct SlidingPopupsEffect {
    id: Option<EffectId>,
    hints: Rc<RefCell<Hints>>,
    slides: BTreeMap<WindowId, Slide>,
    slide_in: Duration,
    slide_out: Duration,
    distance: f64,
}

impl Default for SlidingPopupsEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingPopupsEffect {
    /// Creates the effect with default settings until reconfigured.
    #[must_use]
    pub fn new() -> Self {
        let config = AnimationConfig::new();
        Self {
            id: None,
            hints: Rc::default(),
            slides: BTreeMap::new(),
            slide_in: config.slide_in,
            slide_out: config.slide_out,
            distance: config.slide_distance,
        }
    }

    /// Returns `true` while `window` is sliding.
    #[must_use]
    pub fn is_sliding(&self, window: WindowId) -> bool {
        self.slides.contains_key(&window)
    }

    /// Fills in the parts of `hint` its producer left to the compositor.
    ///
    /// A missing offset becomes the window's distance from the hinted edge
    /// of `screen`; an explicit offset is never smaller than that distance.
    /// Zero durations and non-positive distances take the configured
    /// defaults.
    #[must_use]
    pub fn sanitize(&self, hint: SlidePayload, geometry: Rect, screen: Rect) -> SlidePayload {
        let gap = match hint.edge {
            SlideEdge::Left => geometry.x0 - screen.x0,
            SlideEdge::Top => geometry.y0 - screen.y0,
            SlideEdge::Right => screen.x1 - geometry.x1,
            SlideEdge::Bottom => screen.y1 - geometry.y1,
        };
        let offset = hint.offset.unwrap_or(gap.max(0.0)).max(gap);
        SlidePayload {
            edge: hint.edge,
            offset: Some(offset),
            in_duration: if hint.in_duration.is_zero() {
                self.slide_in
            } else {
                hint.in_duration
            },
            out_duration: if hint.out_duration.is_zero() {
                self.slide_out
            } else {
                hint.out_duration
            },
            distance: if hint.distance > 0.0 {
                hint.distance
            } else {
                self.distance
            },
        }
    }

    /// Applies hint changes recorded since the last call.
    fn sync(&mut self, windows: &mut WindowStore) {
        let Some(me) = self.id else {
            return;
        };
        let (arrived, dropped) = {
            let mut hints = self.hints.borrow_mut();
            (
                core::mem::take(&mut hints.arrived),
                core::mem::take(&mut hints.dropped),
            )
        };
        for window in dropped {
            self.slides.remove(&window);
            if windows.is_alive(window) {
                windows.release_grab(window, GrabRole::WindowAdded, me);
                windows.release_grab(window, GrabRole::WindowClosed, me);
            }
        }
        // Claim the close role as soon as a hint exists so other effects
        // leave hinted popups alone when they close.
        for window in arrived {
            if windows.is_alive(window) && !windows.is_closed(window) {
                windows.try_grab(window, GrabRole::WindowClosed, me);
            }
        }
    }

    fn hint(&self, window: WindowId) -> Option<SlidePayload> {
        self.hints.borrow().current.get(&window).copied()
    }
}

/// The part of a window that stays on the near side of the offset line.
fn visible_part(edge: SlideEdge, geometry: Rect, screen: Rect, offset: f64) -> Rect {
    match edge {
        SlideEdge::Left => Rect::new(screen.x0 + offset, geometry.y0, geometry.x1, geometry.y1),
        SlideEdge::Top => Rect::new(geometry.x0, screen.y0 + offset, geometry.x1, geometry.y1),
        SlideEdge::Right => Rect::new(geometry.x0, geometry.y0, screen.x1 - offset, geometry.y1),
        SlideEdge::Bottom => Rect::new(geometry.x0, geometry.y0, geometry.x1, screen.y1 - offset),
    }
}

impl Effect for SlidingPopupsEffect {
    fn reconfigure(&mut self, flags: ReconfigureFlags, config: &AnimationConfig) {
        _ = flags;
        self.slide_in = config.animation_time(config.slide_in);
        self.slide_out = config.animation_time(config.slide_out);
        self.distance = config.slide_distance;
    }

    fn is_active(&self) -> bool {
        !self.slides.is_empty()
    }

    fn requested_position(&self) -> i32 {
        SLIDE_POSITION
    }

    fn provides(&self, feature: Feature) -> bool {
        feature == Feature::SlidePopups
    }

    fn attach(&mut self, id: EffectId, integrations: &mut Integrations, stacking: &[WindowId]) {
        self.id = Some(id);
        let hints = Rc::clone(&self.hints);
        integrations.slide.add(
            id,
            Box::new(move |update| hints.borrow_mut().record(update)),
            stacking,
        );
    }

    fn pre_paint_screen(
        &mut self,
        data: &mut ScreenPrePaintData,
        present: HostTime,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        self.sync(next.ctx().windows);
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
        if let Some(slide) = self.slides.get_mut(&window) {
            slide.timeline.advance(present);
            data.set_transformed();
            data.mask |= PaintMask::WINDOW_FORCE_BLUR | PaintMask::WINDOW_FORCE_CONTRAST;
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
        let (Some(slide), Some(hint)) = (self.slides.get(&window), self.hint(window)) else {
            next.paint_window(window, mask, region, data);
            return Ok(());
        };
        let ctx = next.ctx();
        let geometry = ctx.windows.geometry(window);
        let screen = ctx.output_geometry;
        let hint = self.sanitize(hint, geometry, screen);

        let size = match hint.edge {
            SlideEdge::Left | SlideEdge::Right => geometry.width(),
            SlideEdge::Top | SlideEdge::Bottom => geometry.height(),
        };
        let t = slide.timeline.value();
        if hint.distance < size {
            data.multiply_opacity(t);
        }
        let amount = interpolate(hint.distance.min(size), 0.0, t);
        data.transform.translate(hint.translation(amount));

        let offset = hint.offset.unwrap_or(0.0);
        let clipped = region.intersected_rect(visible_part(hint.edge, geometry, screen, offset));
        next.paint_window(window, mask, &clipped, data);
        Ok(())
    }

    fn post_paint_window(
        &mut self,
        window: WindowId,
        next: &mut Next<'_, '_>,
    ) -> Result<(), EffectError> {
        if let Some(slide) = self.slides.get(&window) {
            let ctx = next.ctx();
            ctx.repaints.window(window);
            if slide.timeline.is_done() {
                if slide.kind == SlideKind::In
                    && let Some(me) = self.id
                {
                    ctx.windows.release_grab(window, GrabRole::WindowAdded, me);
                }
                self.slides.remove(&window);
            }
        }
        next.post_paint_window(window);
        Ok(())
    }

    fn window_added(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        self.sync(ctx.windows);
        let Some(hint) = self.hint(window) else {
            return;
        };
        if !ctx.windows.try_grab(window, GrabRole::WindowAdded, ctx.effect) {
            return;
        }
        let duration = if hint.in_duration.is_zero() {
            self.slide_in
        } else {
            hint.in_duration
        };
        self.slides.insert(
            window,
            Slide {
                kind: SlideKind::In,
                timeline: Timeline::new(duration, Direction::Forward, Easing::OutCubic),
                _deleted: None,
                _visible: None,
            },
        );
        ctx.repaints.window(window);
    }

    fn window_closed(&mut self, window: WindowId, ctx: &mut LifecycleContext<'_>) {
        self.sync(ctx.windows);
        let Some(hint) = self.hint(window) else {
            return;
        };
        if !ctx.windows.try_grab(window, GrabRole::WindowClosed, ctx.effect) {
            return;
        }
        let duration = if hint.out_duration.is_zero() {
            self.slide_out
        } else {
            hint.out_duration
        };
        // Closing mid slide-in reverses from the current position.
        let timeline = match self.slides.remove(&window) {
            Some(mut slide) => {
                slide.timeline.retarget(Direction::Backward, duration, Easing::InCubic);
                slide.timeline
            }
            None => Timeline::new(duration, Direction::Backward, Easing::InCubic),
        };
        self.slides.insert(
            window,
            Slide {
                kind: SlideKind::Out,
                timeline,
                _deleted: Some(ctx.windows.deleted_ref(window)),
                _visible: Some(ctx.windows.visible_ref(window, VisibilityReasons::DELETED)),
            },
        );
        ctx.repaints.window(window);
    }

    fn window_deleted(&mut self, window: WindowId) {
        self.slides.remove(&window);
        self.hints.borrow_mut().current.remove(&window);
    }
}
