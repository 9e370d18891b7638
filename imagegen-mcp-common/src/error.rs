//! Unified error hierarchy for the imagegen MCP server.
//!
//! Error categories mirror how failures propagate:
//!
//! - `ConfigError`: missing or invalid startup configuration
//! - `Error::Validation`: bad tool input, raised before any external call
//! - `Error::Transport`: network/timeout failures talking to the image API,
//!   recorded per sub-request in a batch
//! - `Error::Api`: the remote service returned an error payload, recorded
//!   per sub-request with its endpoint and status
//! - `Error::Io`: filesystem failures, which abort the remaining batch

use thiserror::Error;

/// Unified error type for the imagegen MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-level errors reaching the remote API (timeouts, DNS, resets)
    #[error("Transport error: {0}")]
    Transport(String),

    /// API errors with endpoint and HTTP status context
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(message.into())
    }

    /// Create a new API error with endpoint, status code, and message.
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Whether this error is tied to a single sub-request rather than the
    /// whole batch. Transport and API failures are call-specific; everything
    /// else would recur on the next call.
    pub fn is_per_call(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Api { .. })
    }
}

/// Configuration errors raised while loading environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
