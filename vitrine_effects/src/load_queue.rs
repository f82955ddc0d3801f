// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect load queue.
//!
//! Loading an effect may compile shaders and allocate textures, so the queue
//! loads at most one effect per event-loop iteration:
//!
//! ```text
//!   enqueue(X) ─┬─► invoke_later(DequeueEffectLoad)   (only if none pending)
//!   enqueue(Y) ─┘
//!   ...event loop runs, may paint...
//!   dequeue()  ──► load X ──► invoke_later(DequeueEffectLoad)
//!   ...event loop runs, may paint...
//!   dequeue()  ──► load Y
//! ```
//!
//! A failed load is logged and reported to the caller; it never blocks the
//! entries behind it.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use vitrine_core::deferred::{DeferredCall, Invoker};
use vitrine_core::effect::EffectId;
use vitrine_core::window::WindowId;

use crate::chain::EffectChain;
use crate::effect::Effect;
use crate::error::LoadError;
use crate::framebuffer::GpuBackend;

bitflags::bitflags! {
    /// How a queued effect should be loaded.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LoadFlags: u8 {
        /// Load the effect.
        const LOAD = 1 << 0;
        /// Skip it if the loader reports it is not enabled by default.
        const CHECK_DEFAULT = 1 << 2;
    }
}

/// One queued load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    /// Effect name as known to the loader.
    pub name: String,
    /// Load flags.
    pub flags: LoadFlags,
}

impl LoadRequest {
    /// A plain load of `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: LoadFlags::LOAD,
        }
    }

    /// A load that honours the effect's enabled-by-default setting.
    #[must_use]
    pub fn with_default_check(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: LoadFlags::LOAD | LoadFlags::CHECK_DEFAULT,
        }
    }
}

/// Resolves effect names to instances.
pub trait EffectLoader {
    /// Returns `true` if the loader knows `name`.
    fn has_effect(&self, name: &str) -> bool;

    /// Every effect name the loader knows.
    fn known_effects(&self) -> Vec<String>;

    /// Whether `name` can run on the current backend.
    fn is_supported(&self, name: &str) -> bool {
        self.has_effect(name)
    }

    /// Whether `name` should load when no explicit setting exists.
    fn enabled_by_default(&self, name: &str) -> bool {
        _ = name;
        true
    }

    /// Builds the effect. This is the slow part: shader compilation and
    /// resource allocation happen here.
    fn load(&mut self, name: &str, gpu: &mut dyn GpuBackend) -> Result<Box<dyn Effect>, LoadError>;
}

/// FIFO of pending effect loads.
#[derive(Clone, Debug, Default)]
pub struct EffectLoadQueue {
    queue: VecDeque<LoadRequest>,
    scheduled: bool,
}

impl EffectLoadQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            scheduled: false,
        }
    }

    /// Appends `request` and schedules a dequeue if none is pending.
    pub fn enqueue(&mut self, request: LoadRequest, invoker: &mut dyn Invoker) {
        tracing::trace!(effect = %request.name, "effect load queued");
        self.queue.push_back(request);
        self.schedule(invoker);
    }

    /// Takes exactly one request off the queue and hands it to `load`, then
    /// schedules the next dequeue if more are waiting.
    ///
    /// Call this from the event loop when it runs
    /// [`DeferredCall::DequeueEffectLoad`].
    pub fn dequeue<R>(
        &mut self,
        invoker: &mut dyn Invoker,
        load: impl FnOnce(LoadRequest) -> R,
    ) -> Option<R> {
        self.scheduled = false;
        let request = self.queue.pop_front()?;
        let result = load(request);
        self.schedule(invoker);
        Some(result)
    }

    /// Dequeues one request and loads it into `chain` through `loader`.
    ///
    /// Returns `None` if the queue was empty.
    pub fn dequeue_into(
        &mut self,
        chain: &mut EffectChain,
        loader: &mut dyn EffectLoader,
        gpu: &mut dyn GpuBackend,
        stacking: &[WindowId],
        invoker: &mut dyn Invoker,
    ) -> Option<Result<EffectId, LoadError>> {
        self.dequeue(invoker, |request| {
            let result = load_one(&request, chain, loader, gpu, stacking);
            if let Err(error) = &result {
                tracing::warn!(effect = %request.name, %error, "effect failed to load");
            }
            result
        })
    }

    /// Drops every pending request.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.scheduled = false;
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns `true` while a dequeue is posted and has not run yet.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    fn schedule(&mut self, invoker: &mut dyn Invoker) {
        if self.queue.is_empty() || self.scheduled {
            return;
        }
        self.scheduled = true;
        invoker.invoke_later(DeferredCall::DequeueEffectLoad);
    }
}

fn load_one(
    request: &LoadRequest,
    chain: &mut EffectChain,
    loader: &mut dyn EffectLoader,
    gpu: &mut dyn GpuBackend,
    stacking: &[WindowId],
) -> Result<EffectId, LoadError> {
    let name = request.name.as_str();
    if !request.flags.contains(LoadFlags::LOAD) {
        return Err(LoadError::Disabled(name.to_string()));
    }
    if chain.is_loaded(name) {
        return Err(LoadError::AlreadyLoaded(name.to_string()));
    }
    if !loader.has_effect(name) {
        return Err(LoadError::Unknown(name.to_string()));
    }
    if !loader.is_supported(name) {
        return Err(LoadError::Unsupported(name.to_string()));
    }
    if request.flags.contains(LoadFlags::CHECK_DEFAULT) && !loader.enabled_by_default(name) {
        return Err(LoadError::Disabled(name.to_string()));
    }
    let effect = loader.load(name, gpu)?;
    chain.load(name, effect, stacking)
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::Cell;

    use vitrine_core::deferred::DeferredQueue;

    use super::*;
    use crate::error::EffectError;
    use crate::headless::HeadlessGpu;

    /// Invoker that only queues. Panics if a call is posted while the same
    /// call is still pending.
    #[derive(Default)]
    struct ReentrancyCheck {
        posted: Vec<DeferredCall>,
        posts: Rc<Cell<usize>>,
        inside_dequeue: bool,
        posted_inside_dequeue: usize,
    }

    impl Invoker for ReentrancyCheck {
        fn invoke_later(&mut self, call: DeferredCall) {
            assert!(!self.posted.contains(&call), "{call:?} posted twice");
            self.posts.set(self.posts.get() + 1);
            if self.inside_dequeue {
                self.posted_inside_dequeue += 1;
            }
            self.posted.push(call);
        }
    }

    struct NopEffect;
    impl Effect for NopEffect {}

    struct TestLoader {
        loaded: Vec<String>,
    }

    impl EffectLoader for TestLoader {
        fn has_effect(&self, name: &str) -> bool {
            matches!(name, "x" | "y" | "broken" | "optional")
        }

        fn known_effects(&self) -> Vec<String> {
            vec!["x".into(), "y".into(), "broken".into(), "optional".into()]
        }

        fn enabled_by_default(&self, name: &str) -> bool {
            name != "optional"
        }

        fn load(
            &mut self,
            name: &str,
            gpu: &mut dyn GpuBackend,
        ) -> Result<Box<dyn Effect>, LoadError> {
            self.loaded.push(name.to_string());
            if name == "broken" {
                let error = gpu
                    .compile_shader(crate::framebuffer::ShaderKind::Texture)
                    .err()
                    .unwrap_or(EffectError::Internal("no shader".into()));
                return Err(LoadError::Init {
                    name: name.to_string(),
                    source: error,
                });
            }
            Ok(Box::new(NopEffect))
        }
    }

    #[test]
    fn each_dequeue_loads_exactly_one() {
        let mut queue = EffectLoadQueue::new();
        let mut invoker = ReentrancyCheck::default();
        queue.enqueue(LoadRequest::new("x"), &mut invoker);
        queue.enqueue(LoadRequest::new("y"), &mut invoker);
        assert_eq!(
            invoker.posted,
            vec![DeferredCall::DequeueEffectLoad],
            "second enqueue does not post again"
        );

        let mut seen = Vec::new();
        let mut dequeues = 0;
        let posts = Rc::clone(&invoker.posts);
        while let Some(call) = invoker.posted.pop() {
            assert_eq!(call, DeferredCall::DequeueEffectLoad);
            invoker.inside_dequeue = true;
            let before = posts.get();
            let loaded = queue.dequeue(&mut invoker, |req| {
                assert_eq!(posts.get(), before, "next dequeue posted before this load ran");
                req.name
            });
            invoker.inside_dequeue = false;
            dequeues += 1;
            seen.extend(loaded);
        }
        assert_eq!(
            invoker.posted_inside_dequeue, 1,
            "only the first dequeue posts the next, after its load returned"
        );
        assert_eq!(dequeues, 2, "two separate dequeue invocations");
        assert_eq!(seen, vec!["x".to_string(), "y".to_string()]);
        assert!(queue.is_empty());
        assert!(!queue.is_scheduled());
    }

    #[test]
    fn failed_load_does_not_block_the_queue() {
        let mut queue = EffectLoadQueue::new();
        let mut invoker = DeferredQueue::new();
        let mut chain = EffectChain::default();
        let mut loader = TestLoader { loaded: Vec::new() };
        let mut gpu = HeadlessGpu::new();
        gpu.fail_shaders = true;

        queue.enqueue(LoadRequest::new("broken"), &mut invoker);
        queue.enqueue(LoadRequest::new("x"), &mut invoker);

        let mut results = Vec::new();
        while invoker.pop().is_some() {
            if let Some(r) =
                queue.dequeue_into(&mut chain, &mut loader, &mut gpu, &[], &mut invoker)
            {
                results.push(r);
            }
        }
        assert!(matches!(results[0], Err(LoadError::Init { .. })), "{results:?}");
        assert!(results[1].is_ok(), "x still loads");
        assert!(!chain.is_loaded("broken"), "failed effect not inserted");
        assert!(chain.is_loaded("x"));
    }

    #[test]
    fn rejects_unknown_duplicate_and_disabled() {
        let mut queue = EffectLoadQueue::new();
        let mut invoker = DeferredQueue::new();
        let mut chain = EffectChain::default();
        let mut loader = TestLoader { loaded: Vec::new() };
        let mut gpu = HeadlessGpu::new();

        for req in [
            LoadRequest::new("x"),
            LoadRequest::new("x"),
            LoadRequest::new("nope"),
            LoadRequest::with_default_check("optional"),
        ] {
            queue.enqueue(req, &mut invoker);
        }
        let mut results = Vec::new();
        while invoker.pop().is_some() {
            results.extend(queue.dequeue_into(
                &mut chain,
                &mut loader,
                &mut gpu,
                &[],
                &mut invoker,
            ));
        }
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(LoadError::AlreadyLoaded("x".into())));
        assert_eq!(results[2], Err(LoadError::Unknown("nope".into())));
        assert_eq!(results[3], Err(LoadError::Disabled("optional".into())));
        assert_eq!(loader.loaded, vec!["x".to_string()], "factory only ran once");
    }

    #[test]
    fn clear_drops_pending_requests() {
        let mut queue = EffectLoadQueue::new();
        let mut invoker = DeferredQueue::new();
        queue.enqueue(LoadRequest::new("x"), &mut invoker);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(&mut invoker, |r| r), None, "stale post is harmless");
    }
}
