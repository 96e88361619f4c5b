use crate::discovery::DiscoveryStrategy;

/// Only resources announced in this process can be discovered; any other
/// lookup fails with [`DiscoveryError::NotImplemented`](crate::discovery::DiscoveryError::NotImplemented).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnly;

impl DiscoveryStrategy for LocalOnly {
    fn name(&self) -> &'static str {
        "local_only"
    }
}
