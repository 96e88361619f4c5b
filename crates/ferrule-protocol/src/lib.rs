//! Shared wire and data types for the ferrule resource middleware
//!
//! Everything here is plain data: the types flow between the discovery
//! engine, the endpoint call layer and the transports, and across process
//! boundaries as JSON.
//!
//! # Type Organization
//!
//! - **Resource identity**: [`resource`] - `ResourceKey`, `Action`, query parameters
//! - **Permissions**: [`permissions`] - allow/deny/ask decision trees
//! - **Error payloads**: [`errors`] - rendered error lists as sent over the wire
//! - **Queue envelopes**: [`queue`] - correlated request/response messages
//! - **Shared registry**: [`registry`] - the ping/add/find/flush/stop line protocol
//! - **Headers**: [`headers`] - well-known HTTP header names
//!
//! # Design Principles
//!
//! - **Zero I/O**: all types are pure data structures
//! - **Serialization**: serde-based, JSON on every wire this workspace speaks
//! - **No circular dependencies**: depends only on serde, chrono and uuid

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod errors;
pub mod headers;
pub mod permissions;
pub mod queue;
pub mod registry;
pub mod resource;

pub use error::{ProtocolError, Result};
pub use errors::{ErrorEntry, ErrorPayload, ListBody};
pub use permissions::{PermissionDecision, PermissionRule, Permissions};
pub use queue::{QueueRequest, QueueResponse};
pub use registry::{RegistryRequest, RegistryResponse};
pub use resource::{Action, DEFAULT_VERSION, Query, ResourceKey};
