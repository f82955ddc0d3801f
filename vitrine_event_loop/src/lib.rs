// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `calloop` driver for the vitrine compositor core.
//!
//! The core never blocks and never calls itself back synchronously. This
//! crate supplies the event loop it expects:
//!
//! ```text
//!   Compositor::next_deadline ──► calloop Timer ──► Compositor::dispatch_timers
//!   Invoker::invoke_later ──────► ping source ───► one DeferredCall per dispatch
//!                                                    └─► Compositor::dequeue_effect_load
//! ```
//!
//! Platform sources (the X connection, vblank events) are registered on
//! [`EventLoopDriver::handle`] and operate on the same [`CompositorState`].

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod clock;
mod driver;
mod error;
mod invoker;

pub use clock::MonotonicClock;
pub use driver::{CompositorState, EventLoopDriver};
pub use error::DriverError;
pub use invoker::LoopInvoker;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kurbo::Rect;
    use vitrine_core::output::{OutputId, OutputInfo};
    use vitrine_effects::builtin::BuiltinLoader;
    use vitrine_effects::headless::HeadlessGpu;
    use vitrine_effects::{EffectChain, LoadRequest};
    use vitrine_render::{NoSync, RenderConfig};

    use super::*;

    type Driver = EventLoopDriver<HeadlessGpu, NoSync, BuiltinLoader>;

    fn driver() -> Driver {
        EventLoopDriver::new(
            RenderConfig::new(),
            EffectChain::default(),
            HeadlessGpu::new(),
            NoSync,
            BuiltinLoader::new(),
        )
        .unwrap()
    }

    fn settle(driver: &mut Driver) {
        for _ in 0..20 {
            if driver.is_idle() {
                return;
            }
            driver.dispatch(Some(Duration::from_millis(50))).unwrap();
        }
        panic!("driver did not go idle: {driver:?}");
    }

    #[test]
    fn new_driver_is_idle() {
        let driver = driver();
        assert!(driver.is_idle());
        assert_eq!(driver.state().compositor().frame_count(), 0);
    }

    #[test]
    fn queued_effects_load_one_per_dispatch() {
        let mut driver = driver();
        driver.state_mut().enqueue_effect(LoadRequest::new("fade"));
        driver.state_mut().enqueue_effect(LoadRequest::new("blur"));
        assert!(driver.state().compositor().chain().is_empty());

        driver.dispatch(Some(Duration::ZERO)).unwrap();
        assert_eq!(driver.state().compositor().chain().len(), 1);
        assert!(driver.state().compositor().chain().is_loaded("fade"));
        assert_eq!(driver.state().load_queue().len(), 1);

        driver.dispatch(Some(Duration::ZERO)).unwrap();
        assert!(driver.state().compositor().chain().is_loaded("blur"));
        assert!(driver.state().load_queue().is_empty());
    }

    #[test]
    fn unknown_effect_does_not_block_the_queue() {
        let mut driver = driver();
        driver.state_mut().enqueue_effect(LoadRequest::new("wobbly"));
        driver.state_mut().enqueue_effect(LoadRequest::new("fade"));
        driver.dispatch(Some(Duration::ZERO)).unwrap();
        driver.dispatch(Some(Duration::ZERO)).unwrap();
        let chain = driver.state().compositor().chain();
        assert!(!chain.is_loaded("wobbly"));
        assert!(chain.is_loaded("fade"), "next entry still loaded");
    }

    #[test]
    fn damage_is_painted_by_the_repaint_timer() {
        let mut driver = driver();
        let state = driver.state_mut();
        state.compositor_mut().add_output(
            OutputId(1),
            OutputInfo::new(Rect::new(0.0, 0.0, 100.0, 100.0), 60_000),
        );
        state
            .compositor_mut()
            .windows_mut()
            .create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!driver.is_idle(), "new output has a repaint armed");

        settle(&mut driver);
        assert_eq!(driver.state().compositor().frame_count(), 1);
        assert_eq!(driver.state().gpu().drawn_windows().len(), 1);

        driver.state_mut().compositor_mut().schedule_repaint_full();
        settle(&mut driver);
        assert_eq!(driver.state().compositor().frame_count(), 2);
    }

    #[test]
    fn frame_callbacks_are_collected_after_a_painted_frame() {
        let mut driver = driver();
        let state = driver.state_mut();
        state.compositor_mut().add_output(
            OutputId(0),
            OutputInfo::new(Rect::new(0.0, 0.0, 100.0, 100.0), 60_000),
        );
        let w = state
            .compositor_mut()
            .windows_mut()
            .create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        state.compositor_mut().request_frame_callback(w);
        settle(&mut driver);
        assert_eq!(
            driver.state_mut().take_presented(),
            [(OutputId(0), vec![w])]
        );
    }
}
