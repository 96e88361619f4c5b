//! Uniform resource calls
//!
//! Every resource is called through an [`Endpoint`], whatever its transport:
//!
//! - [`LocalEndpoint`]: in-process call of the implementation
//! - [`HttpEndpoint`]: JSON over HTTP
//! - [`QueueEndpoint`]: correlated request/reply over a message queue
//! - [`NotFoundEndpoint`]: discovery found nothing; answers `platform.not_found`
//! - [`InterResourceRemote`]: wraps a remote endpoint for a call made while
//!   handling another request, augmenting the caller's session on the way
//! - [`InterResourceLocal`]: hands a co-hosted call to the local dispatcher
//!
//! Runtime failures never escape as errors: timeouts, refused connections
//! and error responses all become a failed [`CallResult`]. Only building an
//! endpoint from the wrong kind of descriptor fails up front.

mod http;
mod inter_resource;
mod local;
mod not_found;
mod queue;
mod result;

pub use http::HttpEndpoint;
pub use inter_resource::{InterResourceLocal, InterResourceRemote};
pub use local::LocalEndpoint;
pub use not_found::NotFoundEndpoint;
pub use queue::QueueEndpoint;
pub use result::CallResult;

use crate::observability::{CallMetadata, CallOutcome, CallTimer};
use async_trait::async_trait;
use ferrule_protocol::{Action, Query, ResourceKey};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Endpoint construction failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The descriptor is for a different transport
    #[error("{endpoint} endpoint cannot be built from a {found} descriptor")]
    UnexpectedDescriptor {
        /// Endpoint being built
        endpoint: &'static str,
        /// Kind of descriptor supplied
        found: &'static str,
    },

    /// A queue descriptor was found but no queue transport is configured
    #[error("no queue transport configured for {0}")]
    NoQueueTransport(ResourceKey),
}

/// One call: action, parameters and the headers that travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    /// Action to run
    pub action: Action,
    /// Identifier, for show/update/delete
    pub ident: Option<String>,
    /// Query/filter parameters
    pub query: Query,
    /// Body, for create/update
    pub body: Option<Value>,
    /// Session to act under
    pub session_id: Option<String>,
    /// Interaction the call belongs to
    pub interaction_id: Option<String>,
}

impl EndpointRequest {
    fn new(action: Action) -> Self {
        Self {
            action,
            ident: None,
            query: Query::new(),
            body: None,
            session_id: None,
            interaction_id: None,
        }
    }

    /// A list request
    pub fn list() -> Self {
        Self::new(Action::List)
    }

    /// A show request
    pub fn show(ident: impl Into<String>) -> Self {
        Self {
            ident: Some(ident.into()),
            ..Self::new(Action::Show)
        }
    }

    /// A create request
    pub fn create(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Action::Create)
        }
    }

    /// An update request
    pub fn update(ident: impl Into<String>, body: Value) -> Self {
        Self {
            ident: Some(ident.into()),
            body: Some(body),
            ..Self::new(Action::Update)
        }
    }

    /// A delete request
    pub fn delete(ident: impl Into<String>) -> Self {
        Self {
            ident: Some(ident.into()),
            ..Self::new(Action::Delete)
        }
    }

    /// Set the query parameters
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Add one query parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set the session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the interaction id
    pub fn with_interaction_id(mut self, interaction_id: impl Into<String>) -> Self {
        self.interaction_id = Some(interaction_id.into());
        self
    }
}

/// A callable resource.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// The resource called
    fn key(&self) -> &ResourceKey;

    /// Transport name, for logs
    fn kind(&self) -> &'static str;

    /// Run `request`.
    async fn dispatch(&self, request: EndpointRequest) -> CallResult;

    /// List the collection
    async fn list(&self, query: Query) -> CallResult {
        self.dispatch(EndpointRequest::list().with_query(query)).await
    }

    /// Show one item
    async fn show(&self, ident: &str, query: Query) -> CallResult {
        self.dispatch(EndpointRequest::show(ident).with_query(query)).await
    }

    /// Create an item
    async fn create(&self, body: Value, query: Query) -> CallResult {
        self.dispatch(EndpointRequest::create(body).with_query(query)).await
    }

    /// Update an item
    async fn update(&self, ident: &str, body: Value, query: Query) -> CallResult {
        self.dispatch(EndpointRequest::update(ident, body).with_query(query)).await
    }

    /// Delete an item
    async fn delete(&self, ident: &str, query: Query) -> CallResult {
        self.dispatch(EndpointRequest::delete(ident).with_query(query)).await
    }
}

/// Run `call`, logging its start and outcome.
pub(crate) async fn observed<F>(key: &ResourceKey, kind: &'static str, request: &EndpointRequest, call: F) -> CallResult
where
    F: Future<Output = CallResult>,
{
    let metadata = CallMetadata::new(key.clone(), request.action, kind)
        .with_interaction_id(request.interaction_id.clone());
    metadata.log_start();
    let timer = CallTimer::start();

    let result = call.await;

    let error_count = result.errors().map_or(0, |errors| errors.errors().len());
    let outcome = CallOutcome::new(result.status(), error_count, timer.elapsed());
    if result.is_error() {
        outcome.log_errors(&metadata);
    } else {
        outcome.log_success(&metadata);
    }
    result
}

fn unexpected(endpoint: &'static str, found: &crate::discovery::EndpointDescriptor) -> EndpointError {
    EndpointError::UnexpectedDescriptor {
        endpoint,
        found: found.kind(),
    }
}
