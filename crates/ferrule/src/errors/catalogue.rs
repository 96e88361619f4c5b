use super::CatalogueError;
use std::collections::BTreeMap;

/// Status used for catalogue entries that do not declare one.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// What the catalogue knows about one error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    /// Default human-readable message
    pub message: String,
    /// Reference fields every error with this code must carry, in order
    pub reference: Vec<String>,
    /// HTTP status implied by the code
    pub status: u16,
}

/// Description catalogue keyed by `domain.code`.
///
/// [`ErrorCatalogue::default`] describes the `platform` and `generic`
/// domains; services add their own domains with [`describe`](Self::describe)
/// or [`extend`](Self::extend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCatalogue {
    codes: BTreeMap<String, ErrorDescription>,
}

impl ErrorCatalogue {
    /// A catalogue with no codes at all.
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Describe a code, replacing any earlier description.
    ///
    /// `status` defaults to [`DEFAULT_ERROR_STATUS`].
    ///
    /// # Errors
    ///
    /// [`CatalogueError::MalformedCode`] unless `code` is `domain.code`.
    pub fn describe(
        &mut self,
        code: &str,
        message: impl Into<String>,
        reference: &[&str],
        status: Option<u16>,
    ) -> Result<&mut Self, CatalogueError> {
        match code.split_once('.') {
            Some((domain, name)) if !domain.is_empty() && !name.is_empty() => {}
            _ => return Err(CatalogueError::MalformedCode(code.to_string())),
        }

        self.codes.insert(
            code.to_string(),
            ErrorDescription {
                message: message.into(),
                reference: reference.iter().map(|field| field.to_string()).collect(),
                status: status.unwrap_or(DEFAULT_ERROR_STATUS),
            },
        );
        Ok(self)
    }

    /// Add every code from `other`; its descriptions win on conflicts.
    pub fn extend(&mut self, other: ErrorCatalogue) {
        self.codes.extend(other.codes);
    }

    /// Whether `code` is described.
    pub fn recognised(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    /// Look up a code.
    pub fn get(&self, code: &str) -> Option<&ErrorDescription> {
        self.codes.get(code)
    }

    /// Look up a code, failing for unknown codes.
    pub fn description(&self, code: &str) -> Result<&ErrorDescription, CatalogueError> {
        self.get(code)
            .ok_or_else(|| CatalogueError::UnknownCode(code.to_string()))
    }

    /// All described codes, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    fn insert_static(&mut self, code: &str, message: &str, reference: &[&str], status: u16) {
        self.codes.insert(
            code.to_string(),
            ErrorDescription {
                message: message.to_string(),
                reference: reference.iter().map(|field| field.to_string()).collect(),
                status,
            },
        );
    }
}

impl Default for ErrorCatalogue {
    fn default() -> Self {
        let mut catalogue = Self::empty();

        // platform
        catalogue.insert_static("platform.not_found", "Not found", &["entity_name"], 404);
        catalogue.insert_static("platform.malformed", "Malformed request", &[], 422);
        catalogue.insert_static("platform.invalid_session", "Invalid session", &[], 401);
        catalogue.insert_static("platform.forbidden", "Action not authorized", &[], 403);
        catalogue.insert_static("platform.method_not_allowed", "Method not allowed", &[], 405);
        catalogue.insert_static("platform.timeout", "Request timeout", &[], 408);
        catalogue.insert_static("platform.fault", "Internal error", &[], 500);

        // generic
        catalogue.insert_static("generic.not_found", "Resource not found", &["ident"], 404);
        catalogue.insert_static(
            "generic.contemporary_exists",
            "Contemporary record exists",
            &["ident"],
            404,
        );
        catalogue.insert_static("generic.malformed", "Malformed payload", &[], 422);
        catalogue.insert_static(
            "generic.required_field_missing",
            "Required field missing",
            &["field_name"],
            422,
        );
        for kind in [
            "string", "integer", "float", "decimal", "boolean", "enum", "date", "time", "datetime",
            "uuid", "array", "object",
        ] {
            catalogue.insert_static(
                &format!("generic.invalid_{kind}"),
                &format!("Field value is not a valid {kind}"),
                &["field_name"],
                422,
            );
        }
        catalogue.insert_static("generic.invalid_parameters", "Invalid parameters", &[], 422);
        catalogue.insert_static(
            "generic.mutually_exclusive_parameters",
            "Mutually exclusive parameters",
            &[],
            422,
        );
        catalogue.insert_static(
            "generic.invalid_duplication",
            "Duplicate values are not allowed",
            &["field_name"],
            422,
        );
        catalogue.insert_static("generic.invalid_state", "State transition not allowed", &[], 422);

        catalogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("platform.not_found", 404, &["entity_name"])]
    #[case("platform.invalid_session", 401, &[])]
    #[case("platform.timeout", 408, &[])]
    #[case("generic.invalid_uuid", 422, &["field_name"])]
    #[case("generic.contemporary_exists", 404, &["ident"])]
    fn default_catalogue_entries(#[case] code: &str, #[case] status: u16, #[case] reference: &[&str]) {
        let catalogue = ErrorCatalogue::default();
        let description = catalogue.description(code).unwrap();
        assert_eq!(description.status, status);
        assert_eq!(description.reference, reference);
    }

    #[test]
    fn described_codes_default_to_500() {
        let mut catalogue = ErrorCatalogue::default();
        catalogue
            .describe("purchase.declined", "Card declined", &["card_id"], None)
            .unwrap();
        assert_eq!(catalogue.description("purchase.declined").unwrap().status, 500);
        assert!(catalogue.recognised("platform.fault"));
    }

    #[test]
    fn describe_rejects_malformed_codes() {
        let mut catalogue = ErrorCatalogue::empty();
        for code in ["declined", ".declined", "purchase."] {
            assert_eq!(
                catalogue.describe(code, "x", &[], None).unwrap_err(),
                CatalogueError::MalformedCode(code.to_string())
            );
        }
    }

    #[test]
    fn extend_overrides() {
        let mut base = ErrorCatalogue::default();
        let mut custom = ErrorCatalogue::empty();
        custom
            .describe("platform.fault", "Something broke", &[], Some(503))
            .unwrap();
        base.extend(custom);
        assert_eq!(base.description("platform.fault").unwrap().status, 503);
    }
}
