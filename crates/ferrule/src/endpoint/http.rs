use super::{CallResult, Endpoint, EndpointError, EndpointRequest, observed, unexpected};
use crate::discovery::EndpointDescriptor;
use crate::errors::ErrorCatalogue;
use async_trait::async_trait;
use ferrule_protocol::{ResourceKey, headers};
use ferrule_transport::{HttpRequest, Transport, TransportError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Calls a resource over HTTP.
///
/// `list`/`show` are `GET`, `create` is `POST`, `update` is `PATCH` and
/// `delete` is `DELETE`; identifiers are appended as a path segment.
pub struct HttpEndpoint {
    key: ResourceKey,
    endpoint_uri: String,
    transport: Arc<dyn Transport>,
    catalogue: Arc<ErrorCatalogue>,
    timeout: Duration,
}

impl HttpEndpoint {
    /// Endpoint for an HTTP descriptor.
    ///
    /// # Errors
    ///
    /// [`EndpointError::UnexpectedDescriptor`] for any other descriptor.
    pub fn new(
        descriptor: &EndpointDescriptor,
        transport: Arc<dyn Transport>,
        catalogue: Arc<ErrorCatalogue>,
        timeout: Duration,
    ) -> Result<Self, EndpointError> {
        match descriptor {
            EndpointDescriptor::Http(http) => Ok(Self {
                key: http.key.clone(),
                endpoint_uri: http.endpoint_uri.clone(),
                transport,
                catalogue,
                timeout,
            }),
            other => Err(unexpected("http", other)),
        }
    }

    /// Collection URI called
    pub fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }

    fn build(&self, request: &EndpointRequest) -> Result<HttpRequest, TransportError> {
        let mut url = Url::parse(&self.endpoint_uri)?;
        if let Some(ident) = &request.ident {
            url.path_segments_mut()
                .map_err(|_| TransportError::Http(format!("cannot append to {}", self.endpoint_uri)))?
                .pop_if_empty()
                .push(ident);
        }

        let mut http = HttpRequest::new(request.action.http_method(), url.as_str())
            .with_query(request.query.clone())
            .with_header(headers::CONTENT_TYPE, headers::JSON_CONTENT_TYPE)
            .with_timeout(self.timeout);
        if let Some(session_id) = &request.session_id {
            http = http.with_header(headers::SESSION_ID, session_id.clone());
        }
        if let Some(interaction_id) = &request.interaction_id {
            http = http.with_header(headers::INTERACTION_ID, interaction_id.clone());
        }
        if request.action.carries_body() {
            let body = request.body.clone().unwrap_or_else(|| Value::Object(Default::default()));
            http = http.with_json_body(&body)?;
        }
        Ok(http)
    }

    async fn call(&self, request: &EndpointRequest) -> CallResult {
        let response = match self.build(request) {
            Ok(http) => self.transport.send_http(http).await,
            Err(err) => Err(err),
        };
        match response {
            Ok(response) => {
                let body = if response.body.is_empty() {
                    None
                } else {
                    match serde_json::from_slice::<Value>(&response.body) {
                        Ok(body) => Some(body),
                        Err(err) if response.is_success() => {
                            warn!(uri = %self.endpoint_uri, error = %err, "unparsable response body");
                            return CallResult::platform_error(&self.catalogue, "platform.fault", &[]);
                        }
                        Err(_) => None,
                    }
                };
                CallResult::from_remote(&self.catalogue, request.action, response.status, body)
            }
            Err(err) => transport_failure(&self.catalogue, &self.key, err),
        }
    }
}

/// Result for a call that never got an answer.
pub(super) fn transport_failure(catalogue: &Arc<ErrorCatalogue>, key: &ResourceKey, err: TransportError) -> CallResult {
    if err.is_timeout() {
        warn!(resource = %key.resource, version = key.version, "resource call timed out");
        CallResult::platform_error(catalogue, "platform.timeout", &[])
    } else {
        warn!(resource = %key.resource, version = key.version, error = %err, "resource call failed");
        CallResult::platform_error(catalogue, "platform.fault", &[])
    }
}

#[async_trait]
impl Endpoint for HttpEndpoint {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    async fn dispatch(&self, request: EndpointRequest) -> CallResult {
        observed(&self.key, self.kind(), &request, self.call(&request)).await
    }
}
