//! Shared-process discovery registry
//!
//! A tiny TCP service mapping `(resource, version)` to endpoint URIs, shared
//! by every service process on a host. It speaks newline-delimited JSON
//! (see [`ferrule_protocol::registry`]). The first process to need it starts
//! it, either as a task in-process or by spawning `ferrule-registry`.

mod client;
mod launcher;
mod server;

pub use client::RegistryClient;
pub use launcher::{RegistryLauncher, RegistryStartup};
pub use server::RegistryServer;

use std::time::Duration;
use thiserror::Error;

/// Registry client failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket failure
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No answer in time
    #[error("registry did not answer within {0:?}")]
    Timeout(Duration),

    /// The registry closed the connection without answering
    #[error("registry closed the connection")]
    Closed,

    /// A line could not be decoded
    #[error("registry protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The registry answered with an error
    #[error("registry rejected request: {0}")]
    Rejected(String),

    /// The registry answered with the wrong kind of response
    #[error("unexpected registry response: {0}")]
    Unexpected(String),

    /// The registry is not running and may not be started
    #[error("registry on port {0} is not running")]
    Unavailable(u16),

    /// Starting the registry failed
    #[error("could not launch registry: {0}")]
    Launch(String),

    /// The registry was started but never answered
    #[error("registry on port {port} did not start after {attempts} attempts in {elapsed:?}: {last_error}")]
    StartTimeout {
        /// Registry port
        port: u16,
        /// Ping attempts made
        attempts: u32,
        /// Time spent waiting
        elapsed: Duration,
        /// Last ping failure
        last_error: String,
    },
}
