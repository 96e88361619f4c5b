use crate::discovery::{AnnounceOptions, DiscoveryError, DiscoveryStrategy, EndpointDescriptor, HttpDescriptor, naming};
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use std::collections::HashMap;

/// HTTP locations computed from a base URI.
///
/// `Purchase` v1 under `http://svc.local` is found at
/// `http://svc.local/v1/purchases`. Routes override the convention for
/// individual resources; a route is either a path below the base URI or an
/// absolute URI.
#[derive(Debug, Clone)]
pub struct ByConvention {
    base_uri: String,
    routes: HashMap<ResourceKey, String>,
}

impl ByConvention {
    /// Convention rooted at `base_uri`
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            routes: HashMap::new(),
        }
    }

    /// Route `resource` at `version` to `route` instead
    pub fn with_route(mut self, resource: &str, version: u32, route: impl Into<String>) -> Self {
        self.routes.insert(ResourceKey::new(resource, version), route.into());
        self
    }

    /// URI for `key`
    pub fn uri_for(&self, key: &ResourceKey) -> String {
        match self.routes.get(key) {
            Some(route) if route.starts_with("http://") || route.starts_with("https://") => route.clone(),
            Some(route) => format!("{}/{}", self.base_uri, route.trim_start_matches('/')),
            None => format!("{}{}", self.base_uri, naming::resource_path(key)),
        }
    }
}

#[async_trait]
impl DiscoveryStrategy for ByConvention {
    fn name(&self) -> &'static str {
        "by_convention"
    }

    /// An explicit URI wins over the convention.
    async fn announce_remote(
        &self,
        key: &ResourceKey,
        options: &AnnounceOptions,
    ) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let endpoint_uri = options.uri.clone().unwrap_or_else(|| self.uri_for(key));
        Ok(Some(EndpointDescriptor::Http(HttpDescriptor {
            key: key.clone(),
            endpoint_uri,
        })))
    }

    async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        Ok(Some(EndpointDescriptor::Http(HttpDescriptor {
            key: key.clone(),
            endpoint_uri: self.uri_for(key),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discoverer;
    use rstest::rstest;
    use std::sync::Arc;

    #[tokio::test]
    async fn purchase_resolves_by_convention() {
        let discoverer = Discoverer::new(Arc::new(ByConvention::new("http://svc.local")));
        match discoverer.discover("Purchase", 1).await.unwrap() {
            Some(EndpointDescriptor::Http(http)) => {
                assert_eq!(http.endpoint_uri, "http://svc.local/v1/purchases");
            }
            other => panic!("expected HTTP descriptor, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn announced_purchase_is_found_at_convention_uri() {
        let discoverer = Discoverer::new(Arc::new(ByConvention::new("http://svc.local")));
        let announced = discoverer
            .announce("Purchase", 1, AnnounceOptions::default())
            .await
            .unwrap();
        assert!(matches!(announced, EndpointDescriptor::Http(_)));
        assert!(discoverer.is_local("Purchase", 1));

        match discoverer.discover("Purchase", 1).await.unwrap() {
            Some(EndpointDescriptor::Http(http)) => {
                assert_eq!(http.endpoint_uri, "http://svc.local/v1/purchases");
            }
            other => panic!("expected HTTP descriptor, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn announced_uri_overrides_convention() {
        let discoverer = Discoverer::new(Arc::new(ByConvention::new("http://svc.local")));
        discoverer
            .announce(
                "Purchase",
                1,
                AnnounceOptions::default().with_uri("http://elsewhere.local/v1/purchases"),
            )
            .await
            .unwrap();

        match discoverer.discover("Purchase", 1).await.unwrap() {
            Some(EndpointDescriptor::Http(http)) => {
                assert_eq!(http.endpoint_uri, "http://elsewhere.local/v1/purchases");
            }
            other => panic!("expected HTTP descriptor, got {other:?}"),
        }
    }

    #[rstest]
    #[case("Purchase", 1, "http://svc.local/custom/purchases")]
    #[case("Voucher", 2, "https://vouchers.example.com/v2/vouchers")]
    #[case("Voucher", 1, "http://svc.local/v1/vouchers")]
    fn routes_override_convention(#[case] resource: &str, #[case] version: u32, #[case] uri: &str) {
        let strategy = ByConvention::new("http://svc.local/")
            .with_route("Purchase", 1, "/custom/purchases")
            .with_route("Voucher", 2, "https://vouchers.example.com/v2/vouchers");
        assert_eq!(strategy.uri_for(&ResourceKey::new(resource, version)), uri);
    }
}
