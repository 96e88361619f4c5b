//! Error types for protocol operations

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while parsing or validating protocol values
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The string does not name a known action
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The string does not name a known permission decision
    #[error("unknown permission decision: {0}")]
    UnknownDecision(String),

    /// Resource versions start at 1
    #[error("invalid version for {resource}: {version}")]
    InvalidVersion {
        /// Resource the version was given for
        resource: String,
        /// The rejected version
        version: u32,
    },

    /// Resource names may not be empty
    #[error("resource name is empty")]
    EmptyResource,

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
