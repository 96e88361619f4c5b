//! Well-known HTTP header names.

/// Carries the caller's (possibly augmented) session id.
pub const SESSION_ID: &str = "X-Session-ID";

/// Carries the interaction id shared by every hop of one inbound request.
pub const INTERACTION_ID: &str = "X-Interaction-ID";

/// Standard content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Content type used for every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
