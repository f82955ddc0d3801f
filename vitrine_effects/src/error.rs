// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for effects, offscreen targets and effect loading.

use alloc::string::String;

/// A failure inside an effect hook or while it talks to the GPU backend.
///
/// The chain driver never propagates these past the paint-phase boundary:
/// the failing effect is logged and taken out of the chain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// A shader failed to compile or link.
    #[error("shader `{name}` failed to compile: {log}")]
    ShaderCompile {
        /// Shader name.
        name: &'static str,
        /// Driver log.
        log: String,
    },
    /// An offscreen target could not be created or used.
    #[error(transparent)]
    Framebuffer(#[from] FramebufferError),
    /// The effect refers to a GPU resource that no longer exists.
    #[error("missing GPU resource {0}")]
    MissingResource(u32),
    /// Any other effect-internal failure.
    #[error("{0}")]
    Internal(String),
}

/// Misuse of the framebuffer stack or an unusable offscreen target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FramebufferError {
    /// `pop` was called with nothing pushed.
    #[error("framebuffer stack is empty")]
    StackEmpty,
    /// The backend could not allocate a target of the requested size.
    #[error("cannot allocate a {width}x{height} offscreen target")]
    Allocation {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The target exists but is not complete (driver-specific).
    #[error("offscreen target {0} is incomplete")]
    Incomplete(u32),
}

/// Why a queued effect was not inserted into the chain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// No factory is registered under this name.
    #[error("unknown effect `{0}`")]
    Unknown(String),
    /// An effect with this name is already in the chain.
    #[error("effect `{0}` is already loaded")]
    AlreadyLoaded(String),
    /// The request asked for the effect not to load, or it is disabled by
    /// default.
    #[error("effect `{0}` is disabled")]
    Disabled(String),
    /// The effect reports it cannot run on this backend.
    #[error("effect `{0}` is not supported by the current backend")]
    Unsupported(String),
    /// The factory ran but initialization failed.
    #[error("effect `{name}` failed to initialize: {source}")]
    Init {
        /// Effect name.
        name: String,
        /// Underlying failure.
        source: EffectError,
    },
}
