//! Error types for the braindoc service.

/// Top-level error type for the motivation pipeline and its service shell.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    /// Provider authentication failure (invalid or missing API key).
    #[error("auth error: {0}")]
    Auth(String),

    /// Request rejected by the provider (rate limited, malformed request).
    #[error("request error: {0}")]
    Request(String),

    /// Provider-side failure or unreachable endpoint.
    #[error("provider error: {0}")]
    Provider(String),

    /// Completion payload missing or malformed (no choices, invalid JSON).
    #[error("completion error: {0}")]
    Completion(String),

    /// Configuration load/parse/resolution error.
    #[error("config error: {0}")]
    Config(String),

    /// Session store error.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// HTTP server bind/serve error.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CoachError>;
