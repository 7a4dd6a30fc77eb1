//! Error types for the DDNS reconciler
//!
//! Provider-side failures fall into four kinds (transport, rejection,
//! not-found, malformed response). The HTTP boundary collapses all of them
//! into a single failure signal, but the kind is kept here so it can be logged.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The provider could not be reached (connect, DNS, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered, but its status code signals failure
    #[error("Provider rejected {operation} ({provider}): code {code}: {message}")]
    ProviderRejected {
        /// Provider name
        provider: String,
        /// Provider API operation (e.g. "Record.Modify")
        operation: String,
        /// Raw provider status code
        code: String,
        /// Provider message
        message: String,
    },

    /// An empty result set where exactly one item was expected
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a provider rejection error
    pub fn rejected(
        provider: impl Into<String>,
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderRejected {
            provider: provider.into(),
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Short, stable name of the error kind for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::NotFound(_) => "not_found",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}
