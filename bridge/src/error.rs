//! Error types for the platform bridge
//!
//! All errors use thiserror for structured error handling.
//! Bridge-level query failures never surface as `BridgeError`; they are
//! folded into a `QueryResult::Failure` before crossing the channel.

use crate::value::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Host query failed: {0}")]
    Host(String),

    /// Error envelope received from the other side of a channel
    #[error("Platform error {code}: {}", .message.as_deref().unwrap_or(""))]
    Platform {
        code: String,
        message: Option<String>,
        details: Value,
    },

    #[error("No implementation found for method {0}")]
    NotImplemented(String),

    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
