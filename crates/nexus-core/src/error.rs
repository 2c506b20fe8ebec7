//! Core error taxonomy.
//!
//! Every user-visible failure of the bridge maps to one of these variants;
//! the server crate translates them into HTTP status codes. `Upstream` is
//! special: it carries a provider response verbatim so caller diagnostics
//! survive the proxy hop.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Path resolution failed; the message names the path that was tried.
    #[error("model not found at {0}")]
    NotFound(String),

    /// The model library rejected the file, after the one automatic
    /// acceleration-off retry.
    #[error("failed to load model: {0}")]
    LoadFailure(String),

    /// The named optional capability is not compiled into this build.
    #[error("{0} support is not available in this build")]
    NotInstalled(&'static str),

    /// Missing or invalid caller input.
    #[error("{0}")]
    BadRequest(String),

    /// The upstream provider could not be reached at all.
    #[error("could not connect to provider at {url}")]
    Unavailable { url: String },

    /// The upstream provider answered with a non-success status; status and
    /// body are forwarded unchanged.
    #[error("provider returned status {status}")]
    Upstream { status: u16, body: String },

    /// Unexpected failure during generation. Carries a diagnostic trace so
    /// one bad request never crashes the process.
    #[error("{message}")]
    Internal { message: String, trace: String },
}

impl Error {
    pub fn internal(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            trace: trace.into(),
        }
    }
}
