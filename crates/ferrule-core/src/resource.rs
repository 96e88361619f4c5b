//! Lazily initialised, shareable resources.
//!
//! Connections to helper services (such as the discovery registry) are only
//! made when first needed. `LazyResource` runs the initialisation once and
//! hands every caller the same instance afterwards; a failed initialisation
//! is not cached, so the next caller tries again.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A resource that can be initialized, health-checked and cleaned up.
#[async_trait]
pub trait Resource: Send + Sync + Sized {
    /// Configuration required to initialize this resource.
    type Config: Clone + Send + Sync;

    /// Error type for initialization failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Initialize the resource with the given configuration.
    async fn initialize(config: Self::Config) -> Result<Self, Self::Error>;

    /// Check if the resource is healthy. Defaults to `true`.
    async fn is_healthy(&self) -> bool {
        true
    }

    /// Release whatever the resource holds.
    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A resource initialized on first access and shared between clones.
pub struct LazyResource<R: Resource> {
    inner: Arc<OnceCell<R>>,
    config: R::Config,
}

impl<R: Resource> LazyResource<R> {
    /// Create a lazy resource; nothing is initialized yet.
    pub fn new(config: R::Config) -> Self {
        Self {
            inner: Arc::new(OnceCell::new()),
            config,
        }
    }

    /// Get the resource, initializing it on first call.
    ///
    /// Concurrent first callers wait on a single initialisation.
    pub async fn get(&self) -> Result<&R, R::Error> {
        self.inner
            .get_or_try_init(|| R::initialize(self.config.clone()))
            .await
    }

    /// Whether initialisation has already succeeded.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized()
    }

    /// Health of the resource, or `None` when not yet initialized.
    pub async fn is_healthy(&self) -> Option<bool> {
        match self.inner.get() {
            Some(resource) => Some(resource.is_healthy().await),
            None => None,
        }
    }

    /// Configuration this resource is (or will be) initialized with.
    pub fn config(&self) -> &R::Config {
        &self.config
    }
}

impl<R: Resource> Clone for LazyResource<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}
