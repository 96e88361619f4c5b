//! The contract between the middleware and resource implementations
//!
//! A service hosts resources by implementing [`ResourceImplementation`] and
//! announcing them. Each inbound action runs against a [`Context`] carrying
//! the [`Interaction`] (who is calling, as which resource) plus the request
//! and the response being built.

mod interface;

pub use interface::InterfaceDeclaration;

use crate::endpoint::{CallResult, EndpointRequest};
use crate::errors::{ErrorCatalogue, ErrorCollection};
use crate::session::Session;
use async_trait::async_trait;
use ferrule_protocol::{Action, PermissionDecision, Query, ResourceKey};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// One inbound request as seen by the resource handling it.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    /// Correlation id shared by every hop of the request
    pub interaction_id: String,
    /// The caller's session, if authenticated
    pub session: Option<Session>,
    /// Resource handling the request
    pub resource: Option<ResourceKey>,
    /// Action being handled
    pub action: Option<Action>,
    /// Interface of the handling resource
    pub interface: Option<Arc<InterfaceDeclaration>>,
}

impl Interaction {
    /// Fresh interaction with a new UUID.
    pub fn new() -> Self {
        Self {
            interaction_id: Uuid::new_v4().to_string(),
            ..Self::default()
        }
    }

    /// Continue an existing interaction id
    pub fn with_interaction_id(mut self, interaction_id: impl Into<String>) -> Self {
        self.interaction_id = interaction_id.into();
        self
    }

    /// Set the session
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the handling resource
    pub fn with_resource(mut self, resource: ResourceKey) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Set the action
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the handling resource's interface
    pub fn with_interface(mut self, interface: Arc<InterfaceDeclaration>) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Session id, if there is a session
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }
}

/// Inputs to an action
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    /// Item identifier
    pub ident: Option<String>,
    /// Body for create/update
    pub body: Option<Value>,
    /// Query/filter parameters
    pub query: Query,
}

/// What an action produced
#[derive(Debug, Clone)]
pub struct ResponseData {
    /// Object or array payload
    pub body: Option<Value>,
    /// Total size of the listed dataset
    pub dataset_size: Option<u64>,
    /// Errors; if any are present the body is ignored
    pub errors: ErrorCollection,
}

/// Everything an action handler sees.
#[derive(Debug, Clone)]
pub struct Context {
    /// The interaction being served
    pub interaction: Interaction,
    /// Action inputs
    pub request: RequestData,
    /// Action outputs
    pub response: ResponseData,
}

impl Context {
    /// Context with an empty request and response.
    pub fn new(interaction: Interaction, catalogue: Arc<ErrorCatalogue>) -> Self {
        Self {
            interaction,
            request: RequestData::default(),
            response: ResponseData {
                body: None,
                dataset_size: None,
                errors: ErrorCollection::new(catalogue),
            },
        }
    }

    /// Context for handling `request`.
    pub fn for_request(interaction: Interaction, catalogue: Arc<ErrorCatalogue>, request: &EndpointRequest) -> Self {
        let mut context = Self::new(interaction, catalogue);
        context.request = RequestData {
            ident: request.ident.clone(),
            body: request.body.clone(),
            query: request.query.clone(),
        };
        context
    }

    /// The caller's session
    pub fn session(&self) -> Option<&Session> {
        self.interaction.session.as_ref()
    }

    /// Decision for `action` on `resource` under the caller's session; deny
    /// without a session.
    pub fn permitted(&self, resource: &str, action: Action) -> PermissionDecision {
        self.session()
            .map_or(PermissionDecision::Deny, |session| session.permitted(resource, action))
    }

    /// Errors collected so far
    pub fn errors(&mut self) -> &mut ErrorCollection {
        &mut self.response.errors
    }

    /// Convert the response into a call result.
    pub fn into_result(self) -> CallResult {
        if self.response.errors.has_errors() {
            CallResult::Failure(self.response.errors)
        } else {
            CallResult::Success {
                payload: self.response.body.unwrap_or(Value::Null),
                dataset_size: self.response.dataset_size,
            }
        }
    }
}

/// A resource hosted by this process.
///
/// Handlers write into `context.response`. Actions a resource does not
/// support are answered with `platform.method_not_allowed`.
#[async_trait]
pub trait ResourceImplementation: Send + Sync {
    /// List items
    async fn list(&self, context: &mut Context) {
        method_not_allowed(context);
    }

    /// Show one item
    async fn show(&self, context: &mut Context) {
        method_not_allowed(context);
    }

    /// Create an item
    async fn create(&self, context: &mut Context) {
        method_not_allowed(context);
    }

    /// Update an item
    async fn update(&self, context: &mut Context) {
        method_not_allowed(context);
    }

    /// Delete an item
    async fn delete(&self, context: &mut Context) {
        method_not_allowed(context);
    }
}

fn method_not_allowed(context: &mut Context) {
    context.errors().add_lenient("platform.method_not_allowed", &[]);
}

/// Run `action` on `implementation`.
pub async fn invoke(implementation: &dyn ResourceImplementation, action: Action, context: &mut Context) {
    context.interaction.action = Some(action);
    match action {
        Action::List => implementation.list(context).await,
        Action::Show => implementation.show(context).await,
        Action::Create => implementation.create(context).await,
        Action::Update => implementation.update(context).await,
        Action::Delete => implementation.delete(context).await,
    }
}

/// Dispatches an action to a resource hosted in this process, on behalf of
/// a running interaction.
#[async_trait]
pub trait LocalDispatch: Send + Sync {
    /// Run `request` against `target` as part of `interaction`.
    async fn dispatch(&self, interaction: &Interaction, target: &ResourceKey, request: EndpointRequest) -> CallResult;
}
