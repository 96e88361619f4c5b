//! Request/response envelopes for queue-based resource calls
//!
//! A queue call carries the same logical fields as an HTTP call plus a
//! correlation id; the reply echoes the id so the caller can match it.

use crate::resource::{Action, Query};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource action sent to a queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueRequest {
    /// Matches the reply to this request
    pub correlation_id: String,

    /// Destination queue
    pub queue: String,

    /// Path equivalent of the target resource, e.g. `/v1/purchases`
    pub path: String,

    /// Requested action
    pub action: Action,

    /// Item identifier for show/update/delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,

    /// Query/filter parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: Query,

    /// Request body for create/update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Header equivalents (session id, interaction id)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl QueueRequest {
    /// Build the reply to this request.
    pub fn reply(&self, status: u16, body: Option<serde_json::Value>) -> QueueResponse {
        QueueResponse {
            correlation_id: self.correlation_id.clone(),
            status,
            body,
            headers: BTreeMap::new(),
        }
    }
}

/// Reply to a [`QueueRequest`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueResponse {
    /// Correlation id copied from the request
    pub correlation_id: String,

    /// HTTP-equivalent status code
    pub status: u16,

    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Header equivalents
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl QueueResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
