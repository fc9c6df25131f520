//! Error types for ctxbridge.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Bridge failures get their own enum so the gateway can map each kind
//! to a distinct status code.

use thiserror::Error;

/// The top-level error type for all ctxbridge operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // --- Bridge errors ---
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // --- Pipeline errors ---
    #[error("Pipeline failed: {0}")]
    Pipeline(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while crossing a concurrency-model boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Bridge timed out: {policy} after {timeout_ms}ms")]
    Timeout { policy: String, timeout_ms: u64 },

    #[error("Context retrieval failed before bridging: {reason}")]
    ContextRetrievalFailed { reason: String },

    #[error("Bridge target was cancelled: {policy}")]
    Cancelled { policy: String },

    #[error("Blocking bridges are forbidden by configuration")]
    BlockingForbidden,

    #[error("Unknown bridge policy: {0}")]
    UnknownPolicy(String),
}

impl Error {
    /// Shorthand for a failed pipeline stage.
    pub fn pipeline(reason: impl Into<String>) -> Self {
        Self::Pipeline(reason.into())
    }
}
