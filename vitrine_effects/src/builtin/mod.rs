// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effects shipped with vitrine and the loader that builds them by name.
//!
//! | Name            | Type                    | Position |
//! |-----------------|-------------------------|----------|
//! | `blur`          | [`BlurEffect`]          | 20       |
//! | `contrast`      | [`ContrastEffect`]      | 21       |
//! | `slidingpopups` | [`SlidingPopupsEffect`] | 40       |
//! | `fade`          | [`FadeEffect`]          | 60       |

pub mod blur;
pub mod contrast;
pub mod fade;
pub mod slide;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::Rect;
use vitrine_core::region::Region;
use vitrine_core::window::{WindowId, WindowStore};

pub use blur::{BlurEffect, DEFAULT_BLUR_RADIUS};
pub use contrast::ContrastEffect;
pub use fade::FadeEffect;
pub use slide::SlidingPopupsEffect;

use crate::effect::Effect;
use crate::error::LoadError;
use crate::framebuffer::GpuBackend;
use crate::load_queue::EffectLoader;

const NAMES: [&str; 4] = ["blur", "contrast", "fade", "slidingpopups"];

/// [`EffectLoader`] for the built-in effects.
#[derive(Clone, Debug)]
pub struct BuiltinLoader {
    blur_radius: u8,
    disabled_by_default: Vec<String>,
}

impl Default for BuiltinLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinLoader {
    /// Creates a loader with every built-in enabled by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blur_radius: DEFAULT_BLUR_RADIUS,
            disabled_by_default: Vec::new(),
        }
    }

    /// Sets the kernel radius for blur instances built from now on.
    #[must_use]
    pub fn with_blur_radius(mut self, radius: u8) -> Self {
        self.blur_radius = radius;
        self
    }

    /// Marks `name` as not enabled by default.
    #[must_use]
    pub fn disable_by_default(mut self, name: &str) -> Self {
        self.disabled_by_default.push(name.to_string());
        self
    }
}

impl EffectLoader for BuiltinLoader {
    fn has_effect(&self, name: &str) -> bool {
        NAMES.contains(&name)
    }

    fn known_effects(&self) -> Vec<String> {
        NAMES.iter().map(ToString::to_string).collect()
    }

    fn enabled_by_default(&self, name: &str) -> bool {
        !self.disabled_by_default.iter().any(|n| n == name)
    }

    fn load(&mut self, name: &str, gpu: &mut dyn GpuBackend) -> Result<Box<dyn Effect>, LoadError> {
        let init = |source| LoadError::Init {
            name: name.to_string(),
            source,
        };
        let effect: Box<dyn Effect> = match name {
            "blur" => Box::new(BlurEffect::new(gpu, self.blur_radius).map_err(init)?),
            "contrast" => Box::new(ContrastEffect::new(gpu).map_err(init)?),
            "fade" => Box::new(FadeEffect::new()),
            "slidingpopups" => Box::new(SlidingPopupsEffect::new()),
            _ => return Err(LoadError::Unknown(name.to_string())),
        };
        tracing::debug!(effect = name, "built-in effect created");
        Ok(effect)
    }
}

/// Converts a window-local hint region to global coordinates. An empty hint
/// covers the whole window.
pub(crate) fn window_area(windows: &WindowStore, window: WindowId, local: &Region) -> Region {
    let geometry = windows.geometry(window);
    let mut area = if local.is_empty() {
        Region::from_rect(Rect::from_origin_size((0.0, 0.0), geometry.size()))
    } else {
        local.clone()
    };
    area.translate(geometry.origin().to_vec2());
    area
}

/// Grows every rectangle of `region` by `by` on each side.
pub(crate) fn expanded(region: &Region, by: f64) -> Region {
    Region::from_rects(region.rects().iter().map(|r| r.inflate(by, by)))
}

#[cfg(test)]
mod tests {
    use vitrine_core::deferred::DeferredQueue;

    use super::*;
    use crate::chain::EffectChain;
    use crate::effect::Feature;
    use crate::headless::HeadlessGpu;
    use crate::load_queue::{EffectLoadQueue, LoadRequest};

    #[test]
    fn loads_every_builtin_in_position_order() {
        let mut gpu = HeadlessGpu::new();
        let mut chain = EffectChain::default();
        let mut loader = BuiltinLoader::new();
        let mut queue = EffectLoadQueue::new();
        let mut invoker = DeferredQueue::new();
        for name in loader.known_effects() {
            queue.enqueue(LoadRequest::with_default_check(&name), &mut invoker);
        }
        while invoker.pop().is_some() {
            let result = queue.dequeue_into(&mut chain, &mut loader, &mut gpu, &[], &mut invoker);
            assert!(matches!(result, Some(Ok(_))), "{result:?}");
        }
        assert_eq!(
            chain.loaded_effects().collect::<Vec<_>>(),
            ["blur", "contrast", "slidingpopups", "fade"]
        );
        assert!(chain.provides(Feature::Blur));
        assert!(chain.provides(Feature::SlidePopups));
    }

    #[test]
    fn shader_failure_is_an_init_error() {
        let mut gpu = HeadlessGpu::new();
        gpu.fail_shaders = true;
        let mut loader = BuiltinLoader::new();
        assert!(matches!(
            loader.load("blur", &mut gpu),
            Err(LoadError::Init { .. })
        ));
        assert!(loader.load("fade", &mut gpu).is_ok(), "fade needs no shader");
        assert!(matches!(
            loader.load("wobbly", &mut gpu),
            Err(LoadError::Unknown(_))
        ));
    }

    #[test]
    fn disabled_by_default_is_skipped_on_default_check() {
        let mut gpu = HeadlessGpu::new();
        let mut chain = EffectChain::default();
        let mut loader = BuiltinLoader::new().disable_by_default("contrast");
        let mut queue = EffectLoadQueue::new();
        let mut invoker = DeferredQueue::new();
        queue.enqueue(LoadRequest::with_default_check("contrast"), &mut invoker);
        queue.enqueue(LoadRequest::new("fade"), &mut invoker);
        let mut results = Vec::new();
        while invoker.pop().is_some() {
            results.extend(queue.dequeue_into(&mut chain, &mut loader, &mut gpu, &[], &mut invoker));
        }
        assert_eq!(results[0], Err(LoadError::Disabled("contrast".into())));
        assert!(chain.is_loaded("fade"));
    }

    #[test]
    fn empty_hint_covers_whole_window() {
        let mut windows = WindowStore::new();
        let w = windows.create_window(Rect::new(10.0, 10.0, 30.0, 20.0));
        assert_eq!(
            window_area(&windows, w, &Region::new()),
            Region::from_rect(Rect::new(10.0, 10.0, 30.0, 20.0))
        );
        let local = Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(
            window_area(&windows, w, &local),
            Region::from_rect(Rect::new(10.0, 10.0, 15.0, 15.0))
        );
    }
}
