//! Crate-level error type
//!
//! Each module keeps its own narrow error enum; [`Error`] gathers them so
//! callers working across modules can use `?` throughout.

use crate::discovery::DiscoveryError;
use crate::endpoint::EndpointError;
use crate::errors::CatalogueError;
use crate::registry::ClientError;
use crate::reporting::ReportingError;
use crate::session::SessionError;
use crate::transient_store::{RegistryError, StoreError};
use ferrule_protocol::ProtocolError;
use ferrule_transport::TransportError;
use thiserror::Error;

/// Result type alias for ferrule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any ferrule failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown error code or missing reference data
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// Storage engine failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Storage engine registration or construction failure
    #[error(transparent)]
    StoreRegistry(#[from] RegistryError),

    /// Session creation or persistence failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Announcement or discovery failure
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Endpoint construction failure
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Shared registry failure
    #[error(transparent)]
    Registry(#[from] ClientError),

    /// Exception reporter registration failure
    #[error(transparent)]
    Reporting(#[from] ReportingError),

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Invalid protocol value
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_protocol::ResourceKey;

    #[test]
    fn module_errors_convert_with_question_mark() {
        fn parse() -> Result<ResourceKey> {
            Ok(ResourceKey::parse("  ", 1)?)
        }
        assert!(matches!(parse(), Err(Error::Protocol(_))));

        let err: Error = EndpointError::NoQueueTransport(ResourceKey::new("Refund", 1)).into();
        assert_eq!(err.to_string(), "no queue transport configured for Refund v1");
    }
}
