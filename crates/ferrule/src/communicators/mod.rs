//! Concurrent fan-out of side-channel messages
//!
//! A [`CommunicatorPool`] delivers each payload to every registered
//! listener:
//!
//! - **Fast** listeners run inline on the caller's thread, in registration order
//! - **Slow** listeners each own a worker thread fed by a bounded mailbox;
//!   when the mailbox is full the newest message is dropped and counted, and
//!   the listener hears about the drop count before its next delivery
//!
//! Listener failures (errors or panics) are logged and never reach the
//! caller of [`CommunicatorPool::communicate`].

mod mailbox;
mod pool;

pub use pool::{CommunicatorId, CommunicatorPool, DEFAULT_MAILBOX_CAPACITY};

use std::sync::Arc;

/// A listener called synchronously on the communicating thread.
pub trait FastCommunicator<T>: Send + Sync {
    /// Handle one payload.
    fn communicate(&self, payload: &T) -> anyhow::Result<()>;
}

/// A listener called asynchronously on its own worker thread.
pub trait SlowCommunicator<T>: Send + Sync {
    /// Handle one payload.
    fn communicate(&self, payload: T) -> anyhow::Result<()>;

    /// Told how many messages were dropped since the last delivery.
    fn dropped(&self, count: usize) -> anyhow::Result<()> {
        let _ = count;
        Ok(())
    }
}

/// A listener of either shape, ready to be added to a pool.
pub enum Communicator<T> {
    /// Runs inline
    Fast(Arc<dyn FastCommunicator<T>>),
    /// Runs on a worker thread
    Slow(Arc<dyn SlowCommunicator<T>>),
}

impl<T> Clone for Communicator<T> {
    fn clone(&self) -> Self {
        match self {
            Communicator::Fast(listener) => Communicator::Fast(Arc::clone(listener)),
            Communicator::Slow(listener) => Communicator::Slow(Arc::clone(listener)),
        }
    }
}

impl<T> Communicator<T> {
    /// Wrap a fast listener
    pub fn fast(listener: impl FastCommunicator<T> + 'static) -> Self {
        Communicator::Fast(Arc::new(listener))
    }

    /// Wrap a slow listener
    pub fn slow(listener: impl SlowCommunicator<T> + 'static) -> Self {
        Communicator::Slow(Arc::new(listener))
    }

    /// Whether this listener runs on a worker thread
    pub fn is_slow(&self) -> bool {
        matches!(self, Communicator::Slow(_))
    }
}
