use crate::discovery::{DiscoveryError, DiscoveryStrategy, EndpointDescriptor, QueueDescriptor};
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use std::collections::HashMap;

/// Queue location of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRoute {
    /// Queue name
    pub queue: String,
    /// Path equivalent
    pub path: String,
}

/// Queue locations looked up in a fixed table keyed by resource name.
/// Unknown resources are not found.
#[derive(Debug, Clone, Default)]
pub struct ByTable {
    table: HashMap<String, TableRoute>,
}

impl ByTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route for `resource`
    pub fn with_route(mut self, resource: impl Into<String>, queue: impl Into<String>, path: impl Into<String>) -> Self {
        self.table.insert(
            resource.into(),
            TableRoute {
                queue: queue.into(),
                path: path.into(),
            },
        );
        self
    }
}

#[async_trait]
impl DiscoveryStrategy for ByTable {
    fn name(&self) -> &'static str {
        "by_table"
    }

    async fn discover_remote(&self, key: &ResourceKey) -> Result<Option<EndpointDescriptor>, DiscoveryError> {
        Ok(self.table.get(&key.resource).map(|route| {
            EndpointDescriptor::Queue(QueueDescriptor {
                key: key.clone(),
                queue: route.queue.clone(),
                path: route.path.clone(),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_resources_resolve_to_queues() {
        let table = ByTable::new().with_route("Purchase", "service.purchase", "/v1/purchases");

        match table.discover_remote(&ResourceKey::new("Purchase", 1)).await.unwrap() {
            Some(EndpointDescriptor::Queue(queue)) => {
                assert_eq!(queue.queue, "service.purchase");
                assert_eq!(queue.path, "/v1/purchases");
            }
            other => panic!("expected queue descriptor, got {other:?}"),
        }
        assert!(table.discover_remote(&ResourceKey::new("Voucher", 1)).await.unwrap().is_none());
    }
}
