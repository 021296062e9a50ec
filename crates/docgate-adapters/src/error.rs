//! Adapter error types.
//!
//! All adapter subsystems surface errors through [`AdapterError`].  At the
//! data access boundary every error is folded into an error
//! [`Envelope`](crate::Envelope) using its `Display` text, so the messages
//! below are what callers ultimately see.

use docgate_store::StoreError;

/// Unified error type for docgate adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// The document store rejected or failed an operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The remote API did not answer within the request timeout.
    #[error("API request timeout at {url}")]
    Timeout { url: String },

    /// The remote API could not be reached.
    #[error("Cannot connect to API at {url}")]
    Connect { url: String },

    /// Any other failure talking to the remote API.
    #[error("API request failed: {0}")]
    Request(String),

    /// The remote bridge is switched off in configuration.
    #[error("API bridge disabled")]
    Disabled,

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<url::ParseError> for AdapterError {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid API url: {err}"))
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
