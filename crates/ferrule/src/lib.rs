//! # Ferrule
//!
//! Middleware for services built from uniform resources:
//! - Communicator pools fanning side-channel messages out to fast and slow listeners
//! - Catalogued, structured error collections with a pinned HTTP status
//! - A transient key/value store over pluggable, mirrorable engines
//! - Sessions with permission trees, augmented per inter-resource call
//! - Discovery of local and remote resources through pluggable strategies
//! - A uniform endpoint layer over in-process, HTTP and queue transports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrule::service::{Context, ResourceImplementation};
//! use ferrule::{Platform, async_trait};
//! use std::sync::Arc;
//!
//! struct Purchases;
//!
//! #[async_trait]
//! impl ResourceImplementation for Purchases {
//!     async fn show(&self, context: &mut Context) {
//!         context.response.body = Some(serde_json::json!({ "id": context.request.ident }));
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ferrule::Result<()> {
//!     let platform = Platform::builder().build()?;
//!     platform.announce_local("Purchase", 1, Arc::new(Purchases), None).await?;
//!
//!     let purchases = platform.endpoint("Purchase", 1).await?;
//!     let result = purchases.show("p1", Default::default()).await;
//!     assert!(!result.is_error());
//!
//!     platform.shutdown(std::time::Duration::from_secs(5)).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// Re-export commonly used types
pub use config::PlatformConfig;
pub use discovery::{Discoverer, DiscoveryStrategy, EndpointDescriptor};
pub use endpoint::{CallResult, Endpoint, EndpointRequest};
pub use error::{Error, Result};
pub use errors::{ErrorCatalogue, ErrorCollection};
pub use platform::{Platform, PlatformBuilder};
pub use session::Session;
pub use transient_store::TransientStore;

// Module declarations
pub mod communicators;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod errors;
pub mod logging;
pub mod observability;
pub mod platform;
pub mod registry;
pub mod reporting;
pub mod service;
pub mod session;
pub mod transient_store;

#[cfg(test)]
mod property_tests;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use ferrule_protocol::{Action, PermissionDecision, Permissions, Query, ResourceKey};
pub use serde_json::Value as JsonValue;
