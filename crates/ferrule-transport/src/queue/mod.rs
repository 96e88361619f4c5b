//! Queue transport
//!
//! A queue call publishes a [`QueueRequest`] to a named queue and waits for
//! the [`QueueResponse`] carrying the same correlation id. The physical bus
//! is hidden behind [`QueueTransport`]; [`MemoryBroker`] is the in-process
//! implementation used for co-hosted services and tests.

mod memory;

pub use memory::{MemoryBroker, QueueConsumer};

use crate::error::Result;
use async_trait::async_trait;
use ferrule_protocol::{QueueRequest, QueueResponse};
use std::time::Duration;

/// Correlated request/reply over a message queue
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish `request` and wait up to `timeout` for its reply.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`](crate::TransportError::Timeout) when no
    /// reply arrives in time; [`TransportError::Connection`](crate::TransportError::Connection)
    /// when the queue cannot be reached.
    async fn request(&self, request: QueueRequest, timeout: Duration) -> Result<QueueResponse>;
}
