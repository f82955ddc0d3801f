// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, RegistrationToken};
use vitrine_core::deferred::{DeferredCall, DeferredQueue};
use vitrine_core::output::OutputId;
use vitrine_core::time::{Clock, HostTime};
use vitrine_core::trace::{TraceSink, Tracer};
use vitrine_core::window::WindowId;
use vitrine_effects::{EffectChain, EffectLoadQueue, EffectLoader, GpuBackend, LoadRequest};
use vitrine_render::{Compositor, FrameSync, RenderConfig, RunOutcome, SwapFeedback};

use crate::clock::MonotonicClock;
use crate::error::DriverError;
use crate::invoker::LoopInvoker;

#[derive(Clone, Copy, Debug)]
struct ArmedTimer {
    token: RegistrationToken,
    deadline: HostTime,
}

/// Everything the event loop callbacks operate on.
///
/// Owns the compositor together with the backend pieces a frame needs: the
/// GPU backend `G`, the frame-sync hook `S` and the effect loader `L`.
pub struct CompositorState<G, S, L> {
    compositor: Compositor,
    gpu: G,
    sync: S,
    loader: L,
    load_queue: EffectLoadQueue,
    invoker: LoopInvoker,
    clock: MonotonicClock,
    handle: LoopHandle<'static, Self>,
    timer: Option<ArmedTimer>,
    sink: Option<Box<dyn TraceSink>>,
    painted: Vec<(OutputId, Vec<WindowId>)>,
}

impl<G, S, L> fmt::Debug for CompositorState<G, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorState")
            .field("compositor", &self.compositor)
            .field("load_queue", &self.load_queue)
            .field("invoker", &self.invoker)
            .field("timer", &self.timer)
            .field("tracing", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl<G, S, L> CompositorState<G, S, L>
where
    G: GpuBackend + 'static,
    S: FrameSync + 'static,
    L: EffectLoader + 'static,
{
    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Mutable access to the compositor. New damage is picked up by the
    /// next [`EventLoopDriver::dispatch`].
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// The GPU backend.
    #[must_use]
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// The frame-sync hook.
    #[must_use]
    pub fn sync(&self) -> &S {
        &self.sync
    }

    /// The effect loader.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The effect load queue.
    #[must_use]
    pub fn load_queue(&self) -> &EffectLoadQueue {
        &self.load_queue
    }

    /// Queues an effect load. It runs on a later dispatch.
    pub fn enqueue_effect(&mut self, request: LoadRequest) {
        self.load_queue.enqueue(request, &mut self.invoker);
    }

    /// Installs a trace sink for every frame from now on.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.sink = sink;
    }

    /// Reports that the buffer swap for `id` completed.
    pub fn swap_complete(&mut self, id: OutputId, feedback: SwapFeedback) -> bool {
        self.compositor.swap_complete(id, feedback)
    }

    /// Windows whose frame callbacks were honored, per output, since the
    /// last call.
    pub fn take_presented(&mut self) -> Vec<(OutputId, Vec<WindowId>)> {
        core::mem::take(&mut self.painted)
    }

    fn run_deferred(&mut self) {
        let Some(call) = self.invoker.next() else {
            return;
        };
        match call {
            DeferredCall::DequeueEffectLoad => {
                let result = self.compositor.dequeue_effect_load(
                    &mut self.load_queue,
                    &mut self.loader,
                    &mut self.gpu,
                    &mut self.invoker,
                );
                if let Some(Ok(id)) = result {
                    tracing::debug!(?id, "queued effect loaded");
                }
            }
            other => tracing::warn!(?other, "unhandled deferred call"),
        }
    }

    fn run_due_outputs(&mut self) {
        let mut tracer = match self.sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
        let outcomes = self
            .compositor
            .dispatch_timers(&mut self.gpu, &mut self.sync, &mut tracer);
        for (id, outcome) in outcomes {
            if let RunOutcome::Painted(_) = outcome {
                let windows = self.compositor.take_frame_callbacks(id);
                if !windows.is_empty() {
                    self.painted.push((id, windows));
                }
            }
        }
    }

    /// Keeps exactly one timer source armed at the compositor's earliest
    /// deadline.
    fn rearm(&mut self) -> Result<(), DriverError> {
        let deadline = self.compositor.next_deadline();
        if self.timer.map(|t| t.deadline) == deadline {
            return Ok(());
        }
        if let Some(armed) = self.timer.take() {
            self.handle.remove(armed.token);
        }
        let Some(deadline) = deadline else {
            return Ok(());
        };
        let timer = Timer::from_deadline(self.clock.instant(deadline));
        let token = self
            .handle
            .insert_source(timer, |_, _, state: &mut Self| {
                state.timer = None;
                state.run_due_outputs();
                TimeoutAction::Drop
            })
            .map_err(|err| err.error)?;
        self.timer = Some(ArmedTimer { token, deadline });
        Ok(())
    }
}

/// Runs a [`Compositor`] on a `calloop` event loop.
///
/// Each output's repaint deadline becomes a timer source and queued
/// invocations ([`DeferredCall`]) are delivered through a ping source, one
/// per dispatch.
pub struct EventLoopDriver<G, S, L> {
    event_loop: EventLoop<'static, CompositorState<G, S, L>>,
    state: CompositorState<G, S, L>,
}

impl<G, S, L> fmt::Debug for EventLoopDriver<G, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopDriver")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<G, S, L> EventLoopDriver<G, S, L>
where
    G: GpuBackend + 'static,
    S: FrameSync + 'static,
    L: EffectLoader + 'static,
{
    /// Creates the loop and a compositor running on a [`MonotonicClock`].
    pub fn new(
        config: RenderConfig,
        chain: EffectChain,
        gpu: G,
        sync: S,
        loader: L,
    ) -> Result<Self, DriverError> {
        let event_loop = EventLoop::try_new()?;
        let handle = event_loop.handle();
        let clock = MonotonicClock::new();
        let compositor = Compositor::new(config, chain, Rc::new(clock) as Rc<dyn Clock>);

        let (ping, ping_source) = calloop::ping::make_ping()?;
        handle
            .insert_source(ping_source, |_, _, state: &mut CompositorState<G, S, L>| {
                state.run_deferred();
            })
            .map_err(|err| err.error)?;
        let invoker = LoopInvoker::new(Rc::new(RefCell::new(DeferredQueue::new())), ping);

        let mut state = CompositorState {
            compositor,
            gpu,
            sync,
            loader,
            load_queue: EffectLoadQueue::new(),
            invoker,
            clock,
            handle,
            timer: None,
            sink: None,
            painted: Vec::new(),
        };
        state.rearm()?;
        Ok(Self { event_loop, state })
    }

    /// The callback state.
    #[must_use]
    pub fn state(&self) -> &CompositorState<G, S, L> {
        &self.state
    }

    /// Mutable access to the callback state.
    pub fn state_mut(&mut self) -> &mut CompositorState<G, S, L> {
        &mut self.state
    }

    /// The loop handle, for registering platform sources (X connection,
    /// vblank events) that operate on the same state.
    #[must_use]
    pub fn handle(&self) -> LoopHandle<'static, CompositorState<G, S, L>> {
        self.event_loop.handle()
    }

    /// Waits for at most `timeout` and runs whatever became ready: due
    /// repaints, one queued invocation and any platform sources.
    pub fn dispatch(&mut self, timeout: Option<std::time::Duration>) -> Result<(), DriverError> {
        self.state.rearm()?;
        self.event_loop.dispatch(timeout, &mut self.state)?;
        self.state.rearm()
    }

    /// Returns `true` when no repaint is armed and no invocation is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.compositor.next_deadline().is_none() && self.state.invoker.pending() == 0
    }
}
