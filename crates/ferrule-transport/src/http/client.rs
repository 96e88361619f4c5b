//! HTTP transport client implementation

use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use ferrule_core::retry::BackoffStrategy;
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use super::retry::RetryPolicy;

/// HTTP transport implementation
///
/// Handles HTTP requests with:
/// - Retries of timeouts and connection failures, per the retry policy
/// - Connection pooling
/// - A default timeout, overridable per request
#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<ReqwestClient>,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            retry_policy: config.retry_policy,
            timeout: config.timeout,
        })
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default timeout applied to requests that do not set their own
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn try_send_request(
        &self,
        request: &HttpRequest,
        method: &reqwest::Method,
    ) -> Result<HttpResponse> {
        let url = request.full_url()?;
        let mut req = self
            .client
            .request(method.clone(), url)
            .timeout(request.timeout.unwrap_or(self.timeout));

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let response = req.send().await?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                TransportError::Http(format!("Unsupported HTTP method: {}", request.method))
            })?;

        let mut attempt = 0;
        let max_retries = self.retry_policy.max_retries();

        loop {
            match self.try_send_request(&request, &method).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !RetryPolicy::is_retryable(&err) || attempt >= max_retries {
                        return Err(err);
                    }

                    let delay = self.retry_policy.calculate_delay(attempt);
                    debug!(url = %request.url, attempt, error = %err, "retrying HTTP request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn is_connected(&self) -> bool {
        // HTTP is stateless, always "connected"
        true
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Default request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Retry policy
    pub retry_policy: RetryPolicy,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            retry_policy: RetryPolicy::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_does_not_retry() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(30));
        assert_eq!(transport.retry_policy.max_retries(), 0);
    }

    #[test]
    fn custom_config() {
        let config = HttpTransportConfig {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            pool_max_idle_per_host: 2,
            retry_policy: RetryPolicy::builder().max_retries(2).build(),
        };

        let transport = HttpTransport::with_config(config).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert_eq!(transport.retry_policy.max_retries(), 2);
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected_without_io() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .send_http(HttpRequest::new("FETCH IT", "http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }
}
