use crate::errors::{ErrorCatalogue, ErrorCollection, NO_ERROR_STATUS};
use ferrule_protocol::{Action, ErrorPayload, ListBody};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a resource call: a payload or errors, never both.
///
/// Check [`is_error`](Self::is_error) before trusting the payload.
#[derive(Debug, Clone)]
pub enum CallResult {
    /// The call succeeded
    Success {
        /// Object or array returned
        payload: Value,
        /// Total dataset size, for lists that report one
        dataset_size: Option<u64>,
    },
    /// The call produced errors
    Failure(ErrorCollection),
}

impl CallResult {
    /// Successful result carrying `payload`
    pub fn success(payload: Value) -> Self {
        CallResult::Success {
            payload,
            dataset_size: None,
        }
    }

    /// Failure carrying a single middleware error. Falls back to an
    /// uncatalogued entry if the catalogue lacks `code`.
    pub fn platform_error(catalogue: &Arc<ErrorCatalogue>, code: &str, reference: &[(&str, &str)]) -> Self {
        let mut errors = ErrorCollection::new(Arc::clone(catalogue));
        errors.add_lenient(code, reference);
        CallResult::Failure(errors)
    }

    /// Whether the call produced errors
    pub fn is_error(&self) -> bool {
        matches!(self, CallResult::Failure(_))
    }

    /// The payload of a successful call
    pub fn payload(&self) -> Option<&Value> {
        match self {
            CallResult::Success { payload, .. } => Some(payload),
            CallResult::Failure(_) => None,
        }
    }

    /// Dataset size reported by a list
    pub fn dataset_size(&self) -> Option<u64> {
        match self {
            CallResult::Success { dataset_size, .. } => *dataset_size,
            CallResult::Failure(_) => None,
        }
    }

    /// The errors of a failed call
    pub fn errors(&self) -> Option<&ErrorCollection> {
        match self {
            CallResult::Success { .. } => None,
            CallResult::Failure(errors) => Some(errors),
        }
    }

    /// Mutable access to the errors of a failed call
    pub fn errors_mut(&mut self) -> Option<&mut ErrorCollection> {
        match self {
            CallResult::Success { .. } => None,
            CallResult::Failure(errors) => Some(errors),
        }
    }

    /// HTTP-equivalent status: 200 on success, else the errors' status
    pub fn status(&self) -> u16 {
        self.errors().map_or(NO_ERROR_STATUS, ErrorCollection::http_status)
    }

    /// Split into payload or errors.
    pub fn into_result(self) -> Result<Value, ErrorCollection> {
        match self {
            CallResult::Success { payload, .. } => Ok(payload),
            CallResult::Failure(errors) => Err(errors),
        }
    }

    /// Interpret a status and JSON body received from a remote resource.
    ///
    /// 2xx bodies become payloads, unwrapping list envelopes. Error bodies
    /// are ingested as precompiled errors carrying the received status.
    pub(crate) fn from_remote(
        catalogue: &Arc<ErrorCatalogue>,
        action: Action,
        status: u16,
        body: Option<Value>,
    ) -> Self {
        if (200..300).contains(&status) {
            let body = body.unwrap_or(Value::Null);
            if action == Action::List && body.get("_data").is_some() {
                return match serde_json::from_value::<ListBody>(body) {
                    Ok(list) => CallResult::Success {
                        payload: Value::Array(list.data),
                        dataset_size: list.dataset_size,
                    },
                    Err(err) => {
                        warn!(error = %err, "malformed list body");
                        Self::platform_error(catalogue, "platform.fault", &[])
                    }
                };
            }
            return Self::success(body);
        }

        let mut errors = ErrorCollection::new(Arc::clone(catalogue));
        let payload = body.and_then(|body| serde_json::from_value::<ErrorPayload>(body).ok());
        match payload {
            Some(payload) if !payload.errors.is_empty() => {
                for entry in payload.errors {
                    errors.add_precompiled_error(entry.code, entry.message, entry.reference, Some(status));
                }
            }
            _ => errors.add_precompiled_error(
                "platform.fault",
                format!("Unexpected response status {status}"),
                None,
                Some(status),
            ),
        }
        CallResult::Failure(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalogue() -> Arc<ErrorCatalogue> {
        Arc::new(ErrorCatalogue::default())
    }

    #[test]
    fn list_envelopes_are_unwrapped() {
        let result = CallResult::from_remote(
            &catalogue(),
            Action::List,
            200,
            Some(json!({"_data": [{"id": 1}], "_dataset_size": 10})),
        );
        assert_eq!(result.payload(), Some(&json!([{"id": 1}])));
        assert_eq!(result.dataset_size(), Some(10));
        assert_eq!(result.status(), 200);
    }

    #[test]
    fn error_bodies_keep_remote_status() {
        let result = CallResult::from_remote(
            &catalogue(),
            Action::Show,
            404,
            Some(json!({
                "kind": "Errors",
                "errors": [{"code": "generic.not_found", "message": "Resource not found", "reference": "abc"}]
            })),
        );
        let errors = result.errors().unwrap();
        assert_eq!(errors.http_status(), 404);
        assert_eq!(errors.errors()[0].code, "generic.not_found");
        assert_eq!(errors.errors()[0].reference.as_deref(), Some("abc"));
    }

    #[test]
    fn unreadable_error_bodies_are_faults() {
        let result = CallResult::from_remote(&catalogue(), Action::Show, 502, Some(json!("Bad gateway")));
        let errors = result.errors().unwrap();
        assert_eq!(errors.http_status(), 502);
        assert_eq!(errors.errors()[0].code, "platform.fault");
    }

    #[test]
    fn platform_errors_use_the_catalogue() {
        let result = CallResult::platform_error(&catalogue(), "platform.not_found", &[("entity_name", "Purchase v1")]);
        assert!(result.is_error());
        assert_eq!(result.status(), 404);
        assert!(result.into_result().is_err());
    }
}
