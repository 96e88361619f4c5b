use crate::discovery::{AnnounceOptions, DiscoveryError, DiscoveryStrategy, EndpointDescriptor, HttpDescriptor, naming};
use crate::registry::{RegistryClient, RegistryStartup};
use async_trait::async_trait;
use ferrule_core::resource::LazyResource;
use ferrule_protocol::ResourceKey;
use tracing::debug;

/// HTTP locations shared between processes through the registry service.
///
/// The registry is contacted, and started if nothing answers, on first use.
/// Announcing records `base_uri` plus the resource path (or the URI given in
/// the announce options) unless another process recorded one first.
pub struct ByRegistry {
    registry: LazyResource<RegistryClient>,
    base_uri: Option<String>,
}

impl ByRegistry {
    /// Use the registry described by `startup`
    pub fn new(startup: RegistryStartup) -> Self {
        Self {
            registry: LazyResource::new(startup),
            base_uri: None,
        }
    }

    /// Where this process's resources are served, e.g. `http://127.0.0.1:9292`
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into().trim_end_matches('/').to_string());
        self
    }

    /// The registry client, once connected
    pub async fn client(&self) -> Result<&RegistryClient, DiscoveryError> {
        Ok(self.registry.get().await?)
    }

    fn published_uri(&self, key: &ResourceKey, options: &AnnounceOptions) -> Option<String> {
        options.uri.clone().or_else(|| {
            let path = options.base_path.clone().unwrap_or_else(|| naming::resource_path(key));
            self.base_uri
                .as_ref()
                .map(|base| format!("{base}/{}", path.trim_start_matches('/')))
        })
    }
}

#[async_trait]
impl DiscoveryStrategy for ByRegistry {
    fn name(&self) -> &'static str {
        "by_registry"
    }

    async fn announce_remote(
        &self,
        key: &ResourceKey,
        options: &AnnounceOptions,
    ) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let Some(uri) = self.published_uri(key, options) else {
            debug!(resource = %key.resource, version = key.version, "no URI to publish, announcing locally only");
            return Ok(None);
        };
        let added = self.client().await?.add(key, &uri).await?;
        debug!(resource = %key.resource, version = key.version, %uri, added, "published to registry");
        Ok(Some(EndpointDescriptor::Http(HttpDescriptor {
            key: key.clone(),
            endpoint_uri: uri,
        })))
    }

    async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let uri = self.client().await?.find(key).await?;
        Ok(uri.map(|endpoint_uri| {
            EndpointDescriptor::Http(HttpDescriptor {
                key: key.clone(),
                endpoint_uri,
            })
        }))
    }
}
