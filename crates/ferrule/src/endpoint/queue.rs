use super::http::transport_failure;
use super::{CallResult, Endpoint, EndpointError, EndpointRequest, observed, unexpected};
use crate::discovery::EndpointDescriptor;
use crate::errors::ErrorCatalogue;
use async_trait::async_trait;
use ferrule_protocol::{QueueRequest, ResourceKey, headers};
use ferrule_transport::QueueTransport;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Calls a resource through a message queue and waits for the correlated
/// reply.
pub struct QueueEndpoint {
    key: ResourceKey,
    queue: String,
    path: String,
    transport: Arc<dyn QueueTransport>,
    catalogue: Arc<ErrorCatalogue>,
    timeout: Duration,
}

impl QueueEndpoint {
    /// Endpoint for a queue descriptor.
    ///
    /// # Errors
    ///
    /// [`EndpointError::UnexpectedDescriptor`] for any other descriptor.
    pub fn new(
        descriptor: &EndpointDescriptor,
        transport: Arc<dyn QueueTransport>,
        catalogue: Arc<ErrorCatalogue>,
        timeout: Duration,
    ) -> Result<Self, EndpointError> {
        match descriptor {
            EndpointDescriptor::Queue(queue) => Ok(Self {
                key: queue.key.clone(),
                queue: queue.queue.clone(),
                path: queue.path.clone(),
                transport,
                catalogue,
                timeout,
            }),
            other => Err(unexpected("queue", other)),
        }
    }

    /// Queue addressed
    pub fn queue(&self) -> &str {
        &self.queue
    }

    fn envelope(&self, request: &EndpointRequest) -> QueueRequest {
        let mut envelope_headers = BTreeMap::new();
        envelope_headers.insert(headers::CONTENT_TYPE.to_string(), headers::JSON_CONTENT_TYPE.to_string());
        if let Some(session_id) = &request.session_id {
            envelope_headers.insert(headers::SESSION_ID.to_string(), session_id.clone());
        }
        if let Some(interaction_id) = &request.interaction_id {
            envelope_headers.insert(headers::INTERACTION_ID.to_string(), interaction_id.clone());
        }
        QueueRequest {
            correlation_id: Uuid::new_v4().to_string(),
            queue: self.queue.clone(),
            path: self.path.clone(),
            action: request.action,
            ident: request.ident.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            headers: envelope_headers,
        }
    }

    async fn call(&self, request: &EndpointRequest) -> CallResult {
        match self.transport.request(self.envelope(request), self.timeout).await {
            Ok(response) => CallResult::from_remote(&self.catalogue, request.action, response.status, response.body),
            Err(err) => transport_failure(&self.catalogue, &self.key, err),
        }
    }
}

#[async_trait]
impl Endpoint for QueueEndpoint {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn kind(&self) -> &'static str {
        "queue"
    }

    async fn dispatch(&self, request: EndpointRequest) -> CallResult {
        observed(&self.key, self.kind(), &request, self.call(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::QueueDescriptor;
    use ferrule_protocol::Action;
    use ferrule_transport::MemoryBroker;
    use serde_json::json;

    fn descriptor() -> EndpointDescriptor {
        EndpointDescriptor::Queue(QueueDescriptor {
            key: ResourceKey::new("Purchase", 1),
            queue: "service.purchase".into(),
            path: "/v1/purchases".into(),
        })
    }

    fn endpoint(broker: &Arc<MemoryBroker>, timeout: Duration) -> QueueEndpoint {
        QueueEndpoint::new(
            &descriptor(),
            broker.clone(),
            Arc::new(ErrorCatalogue::default()),
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn replies_are_matched_and_translated() {
        let broker = Arc::new(MemoryBroker::new());
        let mut consumer = broker.subscribe("service.purchase");
        let endpoint = endpoint(&broker, Duration::from_secs(5));

        let call = tokio::spawn(async move {
            endpoint
                .dispatch(EndpointRequest::show("abc").with_session_id("sess"))
                .await
        });

        let request = consumer.recv().await.unwrap();
        assert_eq!(request.action, Action::Show);
        assert_eq!(request.ident.as_deref(), Some("abc"));
        assert_eq!(request.path, "/v1/purchases");
        assert_eq!(request.headers[headers::SESSION_ID], "sess");
        assert!(consumer.reply(request.reply(200, Some(json!({"id": "abc"})))));

        let result = call.await.unwrap();
        assert_eq!(result.payload(), Some(&json!({"id": "abc"})));
    }

    #[tokio::test]
    async fn unanswered_calls_time_out() {
        let broker = Arc::new(MemoryBroker::new());
        let _consumer = broker.subscribe("service.purchase");
        let endpoint = endpoint(&broker, Duration::from_millis(50));

        let result = endpoint.dispatch(EndpointRequest::list()).await;
        let errors = result.errors().unwrap();
        assert_eq!(errors.errors()[0].code, "platform.timeout");
        assert_eq!(errors.http_status(), 408);
    }

    #[tokio::test]
    async fn unknown_queues_are_faults() {
        let broker = Arc::new(MemoryBroker::new());
        let endpoint = endpoint(&broker, Duration::from_millis(50));
        let result = endpoint.dispatch(EndpointRequest::list()).await;
        assert_eq!(result.errors().unwrap().errors()[0].code, "platform.fault");
    }
}
