//! Structured error collections
//!
//! Errors are identified by `domain.code` strings that must be described in
//! an [`ErrorCatalogue`]. The catalogue supplies the default message, the
//! reference fields an error must carry and the HTTP status it implies. An
//! [`ErrorCollection`] accumulates validated errors for one operation and
//! renders them to the wire shape.

mod catalogue;
mod collection;
pub mod reference;

pub use catalogue::{DEFAULT_ERROR_STATUS, ErrorCatalogue, ErrorDescription};
pub use collection::{ErrorCollection, NO_ERROR_STATUS, NO_REFERENCE};

use thiserror::Error;

/// Misuse of the error catalogue. These indicate programming mistakes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogueError {
    /// The code is not described in the catalogue
    #[error("unknown error code: {0}")]
    UnknownCode(String),

    /// A reference field the catalogue requires was not supplied
    #[error("error code {code} requires reference data for: {}", missing.join(", "))]
    MissingReferenceData {
        /// The code being added
        code: String,
        /// Required fields that were absent
        missing: Vec<String>,
    },

    /// Codes take the form `domain.code`
    #[error("malformed error code: {0}")]
    MalformedCode(String),

    /// Rendering needs a UUID correlation id
    #[error("invalid correlation id: {0}")]
    InvalidCorrelationId(String),
}
