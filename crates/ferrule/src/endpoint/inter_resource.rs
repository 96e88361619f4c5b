use super::{CallResult, Endpoint, EndpointRequest};
use crate::errors::ErrorCatalogue;
use crate::service::{Interaction, LocalDispatch};
use crate::session::Session;
use crate::transient_store::TransientStore;
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use std::sync::Arc;
use tracing::{debug, warn};

/// Session to use for one inter-resource hop
enum Augmentation {
    /// Use the caller's session as it is
    Unchanged,
    /// Use this temporary session, deleted after the call
    Augmented(Session),
    /// The hop may not be made
    Denied,
}

/// A call to a remote resource made while handling another request.
///
/// When the calling resource's interface declares additional permissions
/// for the action it is handling, the caller's session is copied under a
/// fresh id with those permissions merged in and saved to the store for the
/// length of the call. The copy is deleted afterwards whatever the outcome.
/// If no augmented session can be made, or it still may not perform the
/// target action, the call fails with `platform.invalid_session` and the
/// wrapped endpoint is never called. Errors coming back are annotated with
/// the target resource.
pub struct InterResourceRemote {
    wrapped: Arc<dyn Endpoint>,
    interaction: Interaction,
    store: TransientStore,
    catalogue: Arc<ErrorCatalogue>,
}

impl InterResourceRemote {
    /// Wrap `endpoint` for calls made within `interaction`.
    pub fn new(
        wrapped: Arc<dyn Endpoint>,
        interaction: Interaction,
        store: TransientStore,
        catalogue: Arc<ErrorCatalogue>,
    ) -> Self {
        Self {
            wrapped,
            interaction,
            store,
            catalogue,
        }
    }

    /// The endpoint doing the actual call
    pub fn wrapped(&self) -> &Arc<dyn Endpoint> {
        &self.wrapped
    }

    async fn augment(&self, request: &EndpointRequest) -> Augmentation {
        let additional = match (&self.interaction.interface, self.interaction.action) {
            (Some(interface), Some(action)) => interface.additional_permissions_for(action),
            _ => None,
        };
        let Some(additional) = additional else {
            return Augmentation::Unchanged;
        };
        let Some(session) = &self.interaction.session else {
            debug!(target = %self.wrapped.key(), "additional permissions declared but no session");
            return Augmentation::Denied;
        };

        let augmented = session.augment_with(additional);
        let target = self.wrapped.key();
        if !augmented.permitted(&target.resource, request.action).is_permitted() {
            debug!(%target, action = request.action.as_str(), "augmented session still denied");
            return Augmentation::Denied;
        }
        if let Err(err) = augmented.save_to_store(&self.store).await {
            warn!(%target, error = %err, "could not save augmented session");
            return Augmentation::Denied;
        }
        Augmentation::Augmented(augmented)
    }
}

#[async_trait]
impl Endpoint for InterResourceRemote {
    fn key(&self) -> &ResourceKey {
        self.wrapped.key()
    }

    fn kind(&self) -> &'static str {
        self.wrapped.kind()
    }

    async fn dispatch(&self, mut request: EndpointRequest) -> CallResult {
        let target = self.wrapped.key().to_string();
        let augmentation = self.augment(&request).await;

        request.interaction_id = Some(self.interaction.interaction_id.clone());
        request.session_id = match &augmentation {
            Augmentation::Denied => {
                let mut result = CallResult::platform_error(&self.catalogue, "platform.invalid_session", &[]);
                if let Some(errors) = result.errors_mut() {
                    errors.annotate(&target);
                }
                return result;
            }
            Augmentation::Unchanged => self.interaction.session_id().map(str::to_string),
            Augmentation::Augmented(session) => Some(session.id.clone()),
        };

        let mut result = self.wrapped.dispatch(request).await;

        if let Augmentation::Augmented(session) = &augmentation {
            session.delete_from_store(&self.store).await;
        }
        if let Some(errors) = result.errors_mut() {
            errors.annotate(&target);
        }
        result
    }
}

/// A call to a resource hosted in this process, made while handling another
/// request. Handed straight to the local dispatcher with the current
/// interaction; the target enforces permissions against the existing
/// session.
pub struct InterResourceLocal {
    key: ResourceKey,
    dispatcher: Arc<dyn LocalDispatch>,
    interaction: Interaction,
}

impl InterResourceLocal {
    /// Dispatch calls to `key` through `dispatcher`.
    pub fn new(key: ResourceKey, dispatcher: Arc<dyn LocalDispatch>, interaction: Interaction) -> Self {
        Self {
            key,
            dispatcher,
            interaction,
        }
    }
}

#[async_trait]
impl Endpoint for InterResourceLocal {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    async fn dispatch(&self, request: EndpointRequest) -> CallResult {
        self.dispatcher.dispatch(&self.interaction, &self.key, request).await
    }
}
