//! Nexus Core - model session and chat routing for the local bridge
//!
//! This crate holds everything between the HTTP surface and the native
//! model libraries:
//!
//! - a registry of model files on disk,
//! - a process-wide [`ModelSession`] owning at most one loaded text model
//!   and one loaded image model,
//! - a [`ChatRouter`] deciding per request between proxying to an external
//!   provider and running local inference,
//! - a streaming relay turning token generation into a channel of typed
//!   frames, and
//! - an [`ImageJobRunner`] for synchronous image generation.
//!
//! Native model bindings are kept behind the capability traits in
//! [`backend`]; the default build ships unavailable implementations so the
//! bridge runs (proxy-only) without any native library present.

pub mod backend;
pub mod config;
pub mod error;
pub mod image;
pub mod registry;
pub mod relay;
pub mod router;
pub mod session;
pub mod types;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use image::ImageJobRunner;
pub use relay::{Frame, FrameStream};
pub use router::{ChatRouter, Routed};
pub use session::ModelSession;
pub use types::{
    ChatMessage, ChatMode, ChatRequest, GenerationParams, GenerationResult, ImageGenRequest,
    ImageGenResult, LoadOutcome, LoadRequest, SessionStatus,
};
