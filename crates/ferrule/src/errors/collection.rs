use super::catalogue::DEFAULT_ERROR_STATUS;
use super::{CatalogueError, ErrorCatalogue, reference};
use chrono::{DateTime, Utc};
use ferrule_protocol::errors::{ERRORS_KIND, ErrorEntry, ErrorPayload};
use std::sync::Arc;
use tracing::warn;

/// Status of a collection holding no errors.
pub const NO_ERROR_STATUS: u16 = 200;

/// Empty reference data, for codes that need none.
pub const NO_REFERENCE: [(&str, &str); 0] = [];

/// Ordered errors for one request or operation.
///
/// The collection's HTTP status is pinned by the first error added and
/// only reset by [`clear_errors`](Self::clear_errors).
#[derive(Debug, Clone)]
pub struct ErrorCollection {
    catalogue: Arc<ErrorCatalogue>,
    errors: Vec<ErrorEntry>,
    http_status: u16,
    created_at: Option<DateTime<Utc>>,
}

impl ErrorCollection {
    /// An empty collection validated against `catalogue`.
    pub fn new(catalogue: Arc<ErrorCatalogue>) -> Self {
        Self {
            catalogue,
            errors: Vec::new(),
            http_status: NO_ERROR_STATUS,
            created_at: None,
        }
    }

    /// Add a catalogued error.
    ///
    /// Reference values are recorded with the catalogue's required fields
    /// first, in declared order, followed by any extra fields in the order
    /// given. `message` overrides the catalogue's default message.
    ///
    /// # Errors
    ///
    /// [`CatalogueError::UnknownCode`] for codes missing from the catalogue
    /// and [`CatalogueError::MissingReferenceData`] when a required field is
    /// absent. The collection is unchanged on error.
    pub fn add_error<I, K, V>(
        &mut self,
        code: &str,
        reference: I,
        message: Option<&str>,
    ) -> Result<(), CatalogueError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let description = self.catalogue.description(code)?;
        let mut supplied: Vec<(String, String)> = reference
            .into_iter()
            .map(|(field, value)| (field.into(), value.into()))
            .collect();

        let missing: Vec<String> = description
            .reference
            .iter()
            .filter(|field| !supplied.iter().any(|(name, _)| name == *field))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CatalogueError::MissingReferenceData {
                code: code.to_string(),
                missing,
            });
        }

        let mut ordered = Vec::with_capacity(supplied.len());
        for field in &description.reference {
            if let Some(position) = supplied.iter().position(|(name, _)| name == field) {
                ordered.push(supplied.remove(position).1);
            }
        }
        ordered.extend(supplied.into_iter().map(|(_, value)| value));

        let entry = ErrorEntry {
            code: code.to_string(),
            message: message.map_or_else(|| description.message.clone(), str::to_string),
            reference: (!ordered.is_empty()).then(|| reference::join(&ordered)),
        };
        let status = description.status;
        self.push(entry, status);
        Ok(())
    }

    /// Add a catalogued error that needs no reference data.
    pub fn add(&mut self, code: &str) -> Result<(), CatalogueError> {
        self.add_error(code, NO_REFERENCE, None)
    }

    /// Add a catalogued error, degrading to an uncatalogued 500 entry when
    /// the catalogue cannot describe it.
    ///
    /// Used where the middleware itself reports a failure and a usage error
    /// would hide the original problem.
    pub fn add_lenient(&mut self, code: &str, reference: &[(&str, &str)]) {
        if let Err(err) = self.add_error(code, reference.iter().copied(), None) {
            warn!(code, error = %err, "error not catalogued, adding as precompiled");
            let values: Vec<&str> = reference.iter().map(|(_, value)| *value).collect();
            self.add_precompiled_error(
                code,
                err.to_string(),
                (!values.is_empty()).then(|| reference::join(&values)),
                None,
            );
        }
    }

    /// Add an error without validation.
    ///
    /// For errors already validated elsewhere, such as those received from a
    /// remote resource. `http_status` defaults to 500.
    pub fn add_precompiled_error(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        reference: Option<String>,
        http_status: Option<u16>,
    ) {
        let entry = ErrorEntry {
            code: code.into(),
            message: message.into(),
            reference,
        };
        self.push(entry, http_status.unwrap_or(DEFAULT_ERROR_STATUS));
    }

    /// Append another collection's errors, carrying its status. Returns
    /// whether anything was merged.
    pub fn merge(&mut self, other: &ErrorCollection) -> bool {
        for entry in &other.errors {
            self.add_precompiled_error(
                entry.code.clone(),
                entry.message.clone(),
                entry.reference.clone(),
                Some(other.http_status),
            );
        }
        !other.errors.is_empty()
    }

    /// Whether any error has been added.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Remove every error and reset the status.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.http_status = NO_ERROR_STATUS;
    }

    /// Status implied by the first error, or 200 without errors.
    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    /// Errors in the order they were added.
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// The catalogue this collection validates against.
    pub fn catalogue(&self) -> &Arc<ErrorCatalogue> {
        &self.catalogue
    }

    /// Prefix every message with the resource that produced it.
    pub fn annotate(&mut self, source: &str) {
        for entry in &mut self.errors {
            entry.message = format!("{}: {}", source, entry.message);
        }
    }

    /// Render the collection under `correlation_id`.
    ///
    /// The creation timestamp is fixed by the first render.
    ///
    /// # Errors
    ///
    /// [`CatalogueError::InvalidCorrelationId`] unless `correlation_id` is a
    /// UUID.
    pub fn render(&mut self, correlation_id: &str) -> Result<ErrorPayload, CatalogueError> {
        uuid::Uuid::try_parse(correlation_id)
            .map_err(|_| CatalogueError::InvalidCorrelationId(correlation_id.to_string()))?;

        let created_at = *self.created_at.get_or_insert_with(Utc::now);
        Ok(ErrorPayload {
            id: Some(correlation_id.to_string()),
            kind: ERRORS_KIND.to_string(),
            created_at: Some(created_at),
            errors: self.errors.clone(),
        })
    }

    fn push(&mut self, entry: ErrorEntry, status: u16) {
        if self.errors.is_empty() {
            self.http_status = status;
        }
        self.errors.push(entry);
    }
}
