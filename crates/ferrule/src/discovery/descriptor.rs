use super::DiscoveryError;
use crate::service::{InterfaceDeclaration, ResourceImplementation};
use ferrule_protocol::ResourceKey;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Where a resource can be reached. Immutable once built; re-discovery
/// replaces it wholesale.
#[derive(Debug, Clone)]
pub enum EndpointDescriptor {
    /// Hosted in this process
    Local(Arc<LocalDescriptor>),
    /// Reachable over HTTP
    Http(HttpDescriptor),
    /// Reachable through a message queue
    Queue(QueueDescriptor),
    /// Another descriptor, to be called through the session-augmenting
    /// inter-resource path
    Remote(RemoteWrappedDescriptor),
}

impl EndpointDescriptor {
    /// The described resource
    pub fn key(&self) -> &ResourceKey {
        match self {
            EndpointDescriptor::Local(local) => &local.key,
            EndpointDescriptor::Http(http) => &http.key,
            EndpointDescriptor::Queue(queue) => &queue.key,
            EndpointDescriptor::Remote(remote) => &remote.key,
        }
    }

    /// Short name of the variant, used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            EndpointDescriptor::Local(_) => "local",
            EndpointDescriptor::Http(_) => "http",
            EndpointDescriptor::Queue(_) => "queue",
            EndpointDescriptor::Remote(_) => "remote",
        }
    }

    /// Wrap for an inter-resource call. Wrapping twice is a no-op.
    pub fn wrap(self) -> EndpointDescriptor {
        if let EndpointDescriptor::Remote(_) = self {
            return self;
        }
        EndpointDescriptor::Remote(RemoteWrappedDescriptor {
            key: self.key().clone(),
            inner: Box::new(self),
        })
    }
}

/// A resource implemented in this process.
pub struct LocalDescriptor {
    /// Resource identity
    pub key: ResourceKey,
    /// Path the resource is mounted at, e.g. `/v1/purchases`
    pub base_path: String,
    /// The implementation
    pub implementation: Arc<dyn ResourceImplementation>,
    /// Its interface declaration
    pub interface: Arc<InterfaceDeclaration>,
    matcher: Regex,
}

/// Parts of a path routed to a local resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Item identifier, when present
    pub ident: Option<String>,
    /// Requested format extension, when present
    pub format: Option<String>,
}

impl LocalDescriptor {
    /// Describe `implementation`, mounted at `base_path`.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::InvalidPath`] for an empty path.
    pub fn new(
        key: ResourceKey,
        base_path: &str,
        implementation: Arc<dyn ResourceImplementation>,
        interface: Arc<InterfaceDeclaration>,
    ) -> Result<Self, DiscoveryError> {
        let trimmed = base_path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(DiscoveryError::InvalidPath(base_path.to_string()));
        }
        let pattern = format!(
            r"^/?{}(?:/(?P<ident>[^/.]+))?(?:\.(?P<format>[^/.]+))?/?$",
            regex::escape(trimmed)
        );
        let matcher = Regex::new(&pattern).map_err(|_| DiscoveryError::InvalidPath(base_path.to_string()))?;
        Ok(Self {
            key,
            base_path: format!("/{trimmed}"),
            implementation,
            interface,
            matcher,
        })
    }

    /// Route `path` to this resource, extracting identifier and format.
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let captures = self.matcher.captures(path)?;
        let group = |name| captures.name(name).map(|m| m.as_str().to_string());
        Some(PathMatch {
            ident: group("ident"),
            format: group("format"),
        })
    }
}

impl fmt::Debug for LocalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDescriptor")
            .field("key", &self.key)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

/// A resource served over HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDescriptor {
    /// Resource identity
    pub key: ResourceKey,
    /// Fully qualified collection URI, e.g. `http://svc.local/v1/purchases`
    pub endpoint_uri: String,
}

/// A resource served through a message queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    /// Resource identity
    pub key: ResourceKey,
    /// Queue the requests are addressed to
    pub queue: String,
    /// Path equivalent, e.g. `/v1/purchases`
    pub path: String,
}

/// A descriptor to be called with session augmentation
#[derive(Debug, Clone)]
pub struct RemoteWrappedDescriptor {
    /// Resource identity
    pub key: ResourceKey,
    /// What is actually called
    pub inner: Box<EndpointDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Nothing;
    impl ResourceImplementation for Nothing {}

    fn local(base_path: &str) -> LocalDescriptor {
        let key = ResourceKey::new("Purchase", 1);
        LocalDescriptor::new(
            key.clone(),
            base_path,
            Arc::new(Nothing),
            Arc::new(InterfaceDeclaration::new(key)),
        )
        .unwrap()
    }

    #[rstest]
    #[case("/v1/purchases", None, None)]
    #[case("v1/purchases/", None, None)]
    #[case("/v1/purchases/abc", Some("abc"), None)]
    #[case("/v1/purchases/abc.json", Some("abc"), Some("json"))]
    #[case("/v1/purchases.json", None, Some("json"))]
    fn paths_route_to_the_resource(#[case] path: &str, #[case] ident: Option<&str>, #[case] format: Option<&str>) {
        let matched = local("/v1/purchases").matches(path).unwrap();
        assert_eq!(matched.ident.as_deref(), ident);
        assert_eq!(matched.format.as_deref(), format);
    }

    #[rstest]
    #[case("/v1/purchase")]
    #[case("/v2/purchases")]
    #[case("/v1/purchases/abc/def")]
    #[case("/v1/purchasesx")]
    fn other_paths_do_not_match(#[case] path: &str) {
        assert!(local("/v1/purchases").matches(path).is_none());
    }

    #[test]
    fn base_path_is_normalised() {
        assert_eq!(local("v1/purchases/").base_path, "/v1/purchases");
    }

    #[test]
    fn wrapping_keeps_the_key() {
        let key = ResourceKey::new("Purchase", 1);
        let wrapped = EndpointDescriptor::Http(HttpDescriptor {
            key: key.clone(),
            endpoint_uri: "http://svc.local/v1/purchases".into(),
        })
        .wrap();
        assert_eq!(wrapped.kind(), "remote");
        assert_eq!(wrapped.key(), &key);

        match wrapped.wrap() {
            EndpointDescriptor::Remote(remote) => assert_eq!(remote.inner.kind(), "http"),
            other => panic!("expected remote descriptor, got {other:?}"),
        }
    }
}
