use crate::discovery::{AnnounceOptions, DiscoveryError, DiscoveryStrategy, EndpointDescriptor, QueueDescriptor, naming};
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Comma-separated paths of every resource this process hosts
pub const RESOURCE_PATHS_ENV: &str = "FERRULE_RESOURCE_PATHS";

/// Service name derived from the hosted resources
pub const SERVICE_NAME_ENV: &str = "FERRULE_SERVICE_NAME";

/// Where topology announcements are written.
pub trait EnvironmentPublisher: Send + Sync {
    /// Set `name` to `value`.
    fn publish(&self, name: &str, value: &str);
}

/// Publishes into this process's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentPublisher for ProcessEnvironment {
    #[allow(unsafe_code)]
    fn publish(&self, name: &str, value: &str) {
        // SAFETY: announcements happen while a service starts up, before the
        // message-bus integration spawns threads that read the environment.
        unsafe { std::env::set_var(name, value) };
    }
}

/// Queue routing by convention.
///
/// The message bus routes `service.<resource>` queues itself, so discovery
/// is pure computation. Announcing publishes the full set of hosted paths
/// and the derived service name for the bus integration to pick up.
pub struct ByTopology {
    publisher: Arc<dyn EnvironmentPublisher>,
    hosted: Mutex<BTreeSet<ResourceKey>>,
}

impl ByTopology {
    /// Publish announcements through `publisher`
    pub fn new(publisher: Arc<dyn EnvironmentPublisher>) -> Self {
        Self {
            publisher,
            hosted: Mutex::new(BTreeSet::new()),
        }
    }

    /// Publish announcements to the process environment
    pub fn with_process_environment() -> Self {
        Self::new(Arc::new(ProcessEnvironment))
    }

    fn descriptor(key: &ResourceKey) -> EndpointDescriptor {
        EndpointDescriptor::Queue(QueueDescriptor {
            key: key.clone(),
            queue: naming::queue_name(key),
            path: naming::resource_path(key),
        })
    }
}

#[async_trait]
impl DiscoveryStrategy for ByTopology {
    fn name(&self) -> &'static str {
        "by_topology"
    }

    async fn announce_remote(
        &self,
        key: &ResourceKey,
        _options: &AnnounceOptions,
    ) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        let (paths, service) = {
            let mut hosted = self.hosted.lock();
            hosted.insert(key.clone());
            let mut paths: Vec<String> = hosted.iter().map(naming::resource_path).collect();
            paths.sort();
            (paths.join(","), naming::service_name(hosted.iter()))
        };
        info!(paths = %paths, service = %service, "publishing service topology");
        self.publisher.publish(RESOURCE_PATHS_ENV, &paths);
        self.publisher.publish(SERVICE_NAME_ENV, &service);
        Ok(Some(Self::descriptor(key)))
    }

    async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        Ok(Some(Self::descriptor(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discoverer;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recording(Mutex<HashMap<String, String>>);

    impl EnvironmentPublisher for Recording {
        fn publish(&self, name: &str, value: &str) {
            self.0.lock().insert(name.to_string(), value.to_string());
        }
    }

    #[tokio::test]
    async fn announcing_publishes_paths_and_service_name() {
        let recording = Arc::new(Recording::default());
        let discoverer = Discoverer::new(Arc::new(ByTopology::new(recording.clone())));

        discoverer
            .announce("Voucher", 1, AnnounceOptions::default())
            .await
            .unwrap();
        let announced = discoverer
            .announce("Purchase", 2, AnnounceOptions::default())
            .await
            .unwrap();
        assert_eq!(announced.kind(), "queue");

        let published = recording.0.lock();
        assert_eq!(published[RESOURCE_PATHS_ENV], "/v1/vouchers,/v2/purchases");
        assert_eq!(published[SERVICE_NAME_ENV], "service.purchase_voucher");
    }

    #[tokio::test]
    async fn discovery_is_computed() {
        let strategy = ByTopology::new(Arc::new(Recording::default()));
        match strategy.discover_remote(&ResourceKey::new("PurchaseItem", 1)).await.unwrap() {
            Some(EndpointDescriptor::Queue(queue)) => {
                assert_eq!(queue.queue, "service.purchase_item");
                assert_eq!(queue.path, "/v1/purchase_items");
            }
            other => panic!("expected queue descriptor, got {other:?}"),
        }
    }

    #[test]
    fn process_environment_sets_variables() {
        temp_env::with_var_unset("FERRULE_TOPOLOGY_TEST", || {
            ProcessEnvironment.publish("FERRULE_TOPOLOGY_TEST", "/v1/purchases");
            assert_eq!(std::env::var("FERRULE_TOPOLOGY_TEST").as_deref(), Ok("/v1/purchases"));
        });
    }
}
