//! Error types for the webcache workspace
//!
//! A single `thiserror` enum shared by the engine, adapters, and gateway.

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webcache operations
#[derive(Error, Debug)]
pub enum Error {
    /// Cache coordination could not make progress within the configured
    /// number of attempts. Mapped to `500 Internal Server Error` at the
    /// gateway boundary.
    #[error("cache contention not resolved: {0}")]
    Consistency(String),

    /// KV store transport failure (connection, protocol, script)
    #[error("store operation failed: {0}")]
    Store(String),

    /// Origin fetch transport failure
    #[error("origin request failed: {0}")]
    Origin(String),

    /// Record encode/decode failure
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a consistency error with a message
    pub fn consistency<S: Into<String>>(msg: S) -> Self {
        Error::Consistency(msg.into())
    }

    /// Create a store error with a message
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Error::Store(msg.into())
    }

    /// Create an origin error with a message
    pub fn origin<S: Into<String>>(msg: S) -> Self {
        Error::Origin(msg.into())
    }

    /// Whether this error is the categorical contention failure that the
    /// transport converts into an empty 500 response
    pub fn is_consistency(&self) -> bool {
        matches!(self, Error::Consistency(_))
    }
}
