//! Error and list payloads as they appear on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of the `kind` field on rendered error payloads.
pub const ERRORS_KIND: &str = "Errors";

/// One rendered error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Machine-readable `domain.code`
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Escaped, comma-joined reference values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A rendered error collection
///
/// Receivers only rely on `errors`; `id` and `created_at` are tolerated as
/// missing so payloads from older peers still parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    /// Correlation id the collection was rendered under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Always [`ERRORS_KIND`]
    #[serde(default = "errors_kind")]
    pub kind: String,

    /// When the collection was first rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Errors in the order they were added
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

fn errors_kind() -> String {
    ERRORS_KIND.to_string()
}

/// Body of a successful `list` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListBody {
    /// The listed items
    #[serde(rename = "_data")]
    pub data: Vec<serde_json::Value>,

    /// Total size of the underlying dataset, when known
    #[serde(rename = "_dataset_size", default, skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_error_body_parses() {
        let payload: ErrorPayload = serde_json::from_value(json!({
            "errors": [{"code": "generic.not_found", "message": "Not found", "reference": "abc"}]
        }))
        .unwrap();

        assert_eq!(payload.kind, ERRORS_KIND);
        assert_eq!(payload.id, None);
        assert_eq!(payload.errors[0].reference.as_deref(), Some("abc"));
    }

    #[test]
    fn list_body_uses_underscored_keys() {
        let body = ListBody {
            data: vec![json!({"id": 1})],
            dataset_size: Some(10),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"_data": [{"id": 1}], "_dataset_size": 10})
        );
    }
}
