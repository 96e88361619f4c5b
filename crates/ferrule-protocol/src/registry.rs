//! Messages for the shared-process discovery registry
//!
//! The registry speaks newline-delimited JSON over TCP: each request is one
//! line, answered by exactly one response line.

use serde::{Deserialize, Serialize};

/// Request sent to the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryRequest {
    /// Liveness check
    Ping,

    /// Record an endpoint URI unless one is already recorded
    Add {
        /// Resource name
        resource: String,
        /// Resource version
        version: u32,
        /// Endpoint URI
        uri: String,
    },

    /// Look up an endpoint URI
    Find {
        /// Resource name
        resource: String,
        /// Resource version
        version: u32,
    },

    /// Forget every entry
    Flush,

    /// Shut the registry down
    Stop,
}

/// Response sent by the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryResponse {
    /// Answer to `ping`
    Pong,

    /// Answer to `add`; `added` is false when an entry already existed
    Added {
        /// Whether this request created the entry
        added: bool,
    },

    /// Answer to `find`
    Found {
        /// The recorded URI, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },

    /// Answer to `flush`
    Flushed,

    /// Answer to `stop`, sent before the server exits
    Stopping,

    /// The request could not be understood
    Error {
        /// What went wrong
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_op() {
        let add = RegistryRequest::Add {
            resource: "Purchase".into(),
            version: 1,
            uri: "http://localhost:9292/v1/purchases".into(),
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            json!({"op": "add", "resource": "Purchase", "version": 1, "uri": "http://localhost:9292/v1/purchases"})
        );
        assert_eq!(
            serde_json::from_value::<RegistryRequest>(json!({"op": "ping"})).unwrap(),
            RegistryRequest::Ping
        );
    }

    #[test]
    fn found_without_uri_omits_it() {
        let found = RegistryResponse::Found { uri: None };
        assert_eq!(serde_json::to_value(&found).unwrap(), json!({"op": "found"}));
    }
}
