use super::QueueTransport;
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use ferrule_protocol::{QueueRequest, QueueResponse};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 256;

/// In-process message broker
///
/// Queues are created by [`MemoryBroker::subscribe`]; requests to a queue
/// nobody subscribed to fail immediately. Replies are matched to waiting
/// callers by correlation id, and a reply arriving after its caller gave up
/// is discarded.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Default)]
struct BrokerInner {
    queues: Mutex<HashMap<String, mpsc::Sender<QueueRequest>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<QueueResponse>>>,
}

impl MemoryBroker {
    /// Create an empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start consuming `queue`, replacing any previous consumer.
    pub fn subscribe(&self, queue: impl Into<String>) -> QueueConsumer {
        let queue = queue.into();
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        self.inner.queues.lock().insert(queue.clone(), tx);
        QueueConsumer {
            queue,
            receiver: rx,
            broker: self.clone(),
        }
    }

    /// Consume `queue` on a background task, answering each request with
    /// `handler`.
    pub fn serve<F, Fut>(&self, queue: impl Into<String>, handler: F) -> JoinHandle<()>
    where
        F: Fn(QueueRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueueResponse> + Send + 'static,
    {
        let mut consumer = self.subscribe(queue);
        tokio::spawn(async move {
            while let Some(request) = consumer.recv().await {
                let response = handler(request).await;
                consumer.reply(response);
            }
        })
    }

    /// Deliver a reply to whoever is waiting on its correlation id.
    ///
    /// Returns `false` when nobody is waiting any more.
    pub fn reply(&self, response: QueueResponse) -> bool {
        let waiter = self.inner.pending.lock().remove(&response.correlation_id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => {
                debug!(correlation_id = %response.correlation_id, "discarding late queue reply");
                false
            }
        }
    }

    /// Number of requests still waiting for a reply
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

#[async_trait]
impl QueueTransport for MemoryBroker {
    async fn request(&self, request: QueueRequest, timeout: Duration) -> Result<QueueResponse> {
        let sender = self
            .inner
            .queues
            .lock()
            .get(&request.queue)
            .cloned()
            .ok_or_else(|| TransportError::Connection(format!("no consumer for queue {}", request.queue)))?;

        let correlation_id = request.correlation_id.clone();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(correlation_id.clone(), tx);

        let exchange = async {
            sender
                .send(request)
                .await
                .map_err(|err| TransportError::Connection(format!("queue {} closed", err.0.queue)))?;
            rx.await
                .map_err(|_| TransportError::Connection("reply channel dropped".to_string()))
        };

        let outcome = tokio::time::timeout(timeout, exchange).await;
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                self.inner.pending.lock().remove(&correlation_id);
                Err(err)
            }
            Err(_) => {
                self.inner.pending.lock().remove(&correlation_id);
                warn!(%correlation_id, ?timeout, "queue request timed out");
                Err(TransportError::Timeout)
            }
        }
    }
}

/// Receiving side of one queue
pub struct QueueConsumer {
    queue: String,
    receiver: mpsc::Receiver<QueueRequest>,
    broker: MemoryBroker,
}

impl QueueConsumer {
    /// Name of the consumed queue
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Wait for the next request; `None` once the queue is gone.
    pub async fn recv(&mut self) -> Option<QueueRequest> {
        self.receiver.recv().await
    }

    /// Send a reply back through the broker.
    pub fn reply(&self, response: QueueResponse) -> bool {
        self.broker.reply(response)
    }
}
