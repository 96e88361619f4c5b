//! Resource discovery
//!
//! A [`Discoverer`] resolves a [`ResourceKey`] to an [`EndpointDescriptor`].
//! Resources announced by this process are remembered in a local map that is
//! always consulted first, so a locally hosted resource is never routed
//! remotely. Everything else is delegated to a [`DiscoveryStrategy`]:
//!
//! - [`LocalOnly`]: nothing remote, every remote lookup is an error
//! - [`ByConvention`]: HTTP URIs computed from a base URI and path conventions
//! - [`ByRegistry`]: a shared-process registry, started on demand
//! - [`ByTopology`]: queue names computed by convention; announcements
//!   published to the process environment
//! - [`ByTable`]: a fixed resource to queue table
//!
//! Announcements are permanent for the life of the discoverer.

mod descriptor;
pub mod naming;
mod strategies;

pub use descriptor::{
    EndpointDescriptor, HttpDescriptor, LocalDescriptor, PathMatch, QueueDescriptor, RemoteWrappedDescriptor,
};
pub use strategies::{
    ByConvention, ByRegistry, ByTable, ByTopology, EnvironmentPublisher, LocalOnly, ProcessEnvironment,
    RESOURCE_PATHS_ENV, SERVICE_NAME_ENV, TableRoute,
};

use crate::registry::ClientError;
use crate::service::{InterfaceDeclaration, ResourceImplementation};
use async_trait::async_trait;
use ferrule_protocol::{ProtocolError, ResourceKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Discovery failures
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The strategy has no remote lookup
    #[error("{0} discovery cannot resolve remote resources")]
    NotImplemented(&'static str),

    /// Resource name or version invalid
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `announce` got neither an implementation nor a URI
    #[error("nothing to announce for {0}: no implementation or endpoint URI")]
    NothingToAnnounce(ResourceKey),

    /// A base path could not be turned into a matcher
    #[error("invalid base path: {0:?}")]
    InvalidPath(String),

    /// The shared registry failed
    #[error(transparent)]
    Registry(#[from] ClientError),
}

/// What is being announced.
#[derive(Clone, Default)]
pub struct AnnounceOptions {
    /// Implementation hosted in this process
    pub implementation: Option<Arc<dyn ResourceImplementation>>,
    /// Its interface; defaults to one with no extra permissions
    pub interface: Option<Arc<InterfaceDeclaration>>,
    /// Mount path; defaults to the conventional `/v<version>/<plural>`
    pub base_path: Option<String>,
    /// Externally reachable URI of the resource
    pub uri: Option<String>,
}

impl AnnounceOptions {
    /// Options announcing a local implementation
    pub fn local(implementation: Arc<dyn ResourceImplementation>) -> Self {
        Self {
            implementation: Some(implementation),
            ..Self::default()
        }
    }

    /// Set the interface
    pub fn with_interface(mut self, interface: Arc<InterfaceDeclaration>) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Set the mount path
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Set the external URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// Remote half of a discoverer.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Strategy name for logs and errors
    fn name(&self) -> &'static str;

    /// Publish an announcement beyond this process. Returning a descriptor
    /// makes it the recorded one; `None` records the local descriptor.
    async fn announce_remote(
        &self,
        key: &ResourceKey,
        options: &AnnounceOptions,
    ) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let _ = (key, options);
        Ok(None)
    }

    /// Resolve a resource not announced here.
    async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let _ = key;
        Err(DiscoveryError::NotImplemented(self.name()))
    }
}

/// Resolves resources, local first.
pub struct Discoverer {
    strategy: Arc<dyn DiscoveryStrategy>,
    known_local: RwLock<HashMap<ResourceKey, EndpointDescriptor>>,
}

impl Discoverer {
    /// Discoverer delegating remote work to `strategy`.
    pub fn new(strategy: Arc<dyn DiscoveryStrategy>) -> Self {
        Self {
            strategy,
            known_local: RwLock::new(HashMap::new()),
        }
    }

    /// The remote strategy
    pub fn strategy(&self) -> &Arc<dyn DiscoveryStrategy> {
        &self.strategy
    }

    /// Announce `resource` at `version` as hosted by this process and
    /// return the recorded descriptor.
    ///
    /// The strategy publishes the announcement first. An announcement
    /// carrying an implementation always records the local descriptor;
    /// otherwise the strategy's descriptor is recorded if it returned one.
    ///
    /// # Errors
    ///
    /// Invalid keys, strategy failures and announcements that carry neither
    /// an implementation nor a URI.
    pub async fn announce(
        &self,
        resource: &str,
        version: u32,
        options: AnnounceOptions,
    ) -> Result<EndpointDescriptor, DiscoveryError> {
        let key = ResourceKey::parse(resource, version)?;
        let published = self.strategy.announce_remote(&key, &options).await?;
        let descriptor = match published {
            Some(descriptor) if options.implementation.is_none() => descriptor,
            _ => local_descriptor(&key, options)?,
        };
        debug!(
            resource = %key.resource,
            version = key.version,
            kind = descriptor.kind(),
            strategy = self.strategy.name(),
            "announced resource"
        );
        self.known_local.write().insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Resolve `resource` at `version`. Announced resources are returned
    /// without consulting the strategy.
    ///
    /// # Errors
    ///
    /// Invalid keys and strategy failures; an unknown resource is `Ok(None)`.
    pub async fn discover(&self, resource: &str, version: u32) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let key = ResourceKey::parse(resource, version)?;
        let local = self.known_local.read().get(&key).cloned();
        if local.is_some() {
            return Ok(local);
        }
        self.strategy.discover_remote(&key).await
    }

    /// Whether `resource` at `version` was announced here.
    pub fn is_local(&self, resource: &str, version: u32) -> bool {
        ResourceKey::parse(resource, version).is_ok_and(|key| self.known_local.read().contains_key(&key))
    }

    /// Descriptors of the announced resources hosted in this process
    pub fn local_descriptors(&self) -> Vec<Arc<LocalDescriptor>> {
        let mut locals: Vec<_> = self
            .known_local
            .read()
            .values()
            .filter_map(|descriptor| match descriptor {
                EndpointDescriptor::Local(local) => Some(Arc::clone(local)),
                _ => None,
            })
            .collect();
        locals.sort_by(|a, b| a.key.cmp(&b.key));
        locals
    }

    /// Every announced key
    pub fn announced(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.known_local.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn local_descriptor(key: &ResourceKey, options: AnnounceOptions) -> Result<EndpointDescriptor, DiscoveryError> {
    match (options.implementation, options.uri) {
        (Some(implementation), _) => {
            let interface = options
                .interface
                .unwrap_or_else(|| Arc::new(InterfaceDeclaration::new(key.clone())));
            let base_path = options.base_path.unwrap_or_else(|| naming::resource_path(key));
            let local = LocalDescriptor::new(key.clone(), &base_path, implementation, interface)?;
            Ok(EndpointDescriptor::Local(Arc::new(local)))
        }
        (None, Some(uri)) => Ok(EndpointDescriptor::Http(HttpDescriptor {
            key: key.clone(),
            endpoint_uri: uri,
        })),
        (None, None) => Err(DiscoveryError::NothingToAnnounce(key.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Nothing;
    impl ResourceImplementation for Nothing {}

    /// Resolves everything to a fixed URI and counts lookups.
    #[derive(Default)]
    struct Counting {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryStrategy for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(Some(EndpointDescriptor::Http(HttpDescriptor {
                key: key.clone(),
                endpoint_uri: "http://elsewhere".into(),
            })))
        }
    }

    #[tokio::test]
    async fn locality_wins_over_remote_resolution() {
        let strategy = Arc::new(Counting::default());
        let discoverer = Discoverer::new(strategy.clone());

        let announced = discoverer
            .announce(" Purchase ", 1, AnnounceOptions::local(Arc::new(Nothing)))
            .await
            .unwrap();
        let discovered = discoverer.discover("Purchase", 1).await.unwrap().unwrap();

        assert_eq!(announced.kind(), "local");
        assert_eq!(discovered.kind(), "local");
        assert_eq!(strategy.lookups.load(Ordering::SeqCst), 0);
        assert!(discoverer.is_local("Purchase", 1));

        // Other versions are not local.
        assert!(!discoverer.is_local("Purchase", 2));
        let remote = discoverer.discover("Purchase", 2).await.unwrap().unwrap();
        assert_eq!(remote.kind(), "http");
        assert_eq!(strategy.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_remote_lookup_is_not_implemented() {
        let discoverer = Discoverer::new(Arc::new(LocalOnly));
        let err = discoverer.discover("Purchase", 1).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NotImplemented("local_only")));
    }

    #[tokio::test]
    async fn announcing_needs_something_to_record() {
        let discoverer = Discoverer::new(Arc::new(LocalOnly));
        assert!(matches!(
            discoverer.announce("Purchase", 1, AnnounceOptions::default()).await,
            Err(DiscoveryError::NothingToAnnounce(_))
        ));
        assert!(matches!(
            discoverer.announce("", 1, AnnounceOptions::default()).await,
            Err(DiscoveryError::Protocol(_))
        ));

        let http = discoverer
            .announce("Purchase", 1, AnnounceOptions::default().with_uri("http://svc.local/v1/purchases"))
            .await
            .unwrap();
        assert_eq!(http.kind(), "http");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_announce_and_discover() {
        let discoverer = Arc::new(Discoverer::new(Arc::new(LocalOnly)));
        let mut tasks = Vec::new();
        for version in 1..=20 {
            let discoverer = discoverer.clone();
            tasks.push(tokio::spawn(async move {
                discoverer
                    .announce("Purchase", version, AnnounceOptions::local(Arc::new(Nothing)))
                    .await
                    .unwrap();
                assert!(discoverer.discover("Purchase", version).await.unwrap().is_some());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(discoverer.announced().len(), 20);
    }

    /// Publishes every announcement under a fixed URI.
    struct Publishing;

    #[async_trait]
    impl DiscoveryStrategy for Publishing {
        fn name(&self) -> &'static str {
            "publishing"
        }

        async fn announce_remote(
            &self,
            key: &ResourceKey,
            _options: &AnnounceOptions,
        ) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
            Ok(Some(EndpointDescriptor::Http(HttpDescriptor {
                key: key.clone(),
                endpoint_uri: "http://published".into(),
            })))
        }
    }

    #[tokio::test]
    async fn hosted_implementations_stay_local_after_publication() {
        let discoverer = Discoverer::new(Arc::new(Publishing));
        let hosted = discoverer
            .announce("Purchase", 1, AnnounceOptions::local(Arc::new(Nothing)))
            .await
            .unwrap();
        assert_eq!(hosted.kind(), "local");
        assert_eq!(discoverer.local_descriptors().len(), 1);

        let published = discoverer
            .announce("Refund", 1, AnnounceOptions::default())
            .await
            .unwrap();
        assert_eq!(published.kind(), "http");
        assert_eq!(discoverer.local_descriptors().len(), 1);
    }
}
