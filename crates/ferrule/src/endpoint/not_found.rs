use super::{CallResult, Endpoint, EndpointRequest};
use crate::errors::ErrorCatalogue;
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use std::sync::Arc;

/// Stand-in for a resource discovery could not find. Every call fails with
/// `platform.not_found` without any I/O.
pub struct NotFoundEndpoint {
    key: ResourceKey,
    catalogue: Arc<ErrorCatalogue>,
}

impl NotFoundEndpoint {
    /// Endpoint for the missing `key`
    pub fn new(key: ResourceKey, catalogue: Arc<ErrorCatalogue>) -> Self {
        Self { key, catalogue }
    }
}

#[async_trait]
impl Endpoint for NotFoundEndpoint {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn kind(&self) -> &'static str {
        "not_found"
    }

    async fn dispatch(&self, _request: EndpointRequest) -> CallResult {
        let entity = self.key.to_string();
        CallResult::platform_error(&self.catalogue, "platform.not_found", &[("entity_name", entity.as_str())])
    }
}
