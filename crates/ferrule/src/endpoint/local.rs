use super::{CallResult, Endpoint, EndpointError, EndpointRequest, observed, unexpected};
use crate::discovery::{EndpointDescriptor, LocalDescriptor};
use crate::errors::ErrorCatalogue;
use crate::service::{Context, Interaction, invoke};
use async_trait::async_trait;
use ferrule_protocol::ResourceKey;
use std::sync::Arc;

/// Calls an implementation hosted in this process, directly and without
/// serialization, under the caller's interaction.
pub struct LocalEndpoint {
    descriptor: Arc<LocalDescriptor>,
    catalogue: Arc<ErrorCatalogue>,
    interaction: Interaction,
}

impl LocalEndpoint {
    /// Endpoint for a local descriptor, acting within `interaction`.
    ///
    /// # Errors
    ///
    /// [`EndpointError::UnexpectedDescriptor`] for any other descriptor.
    pub fn new(
        descriptor: &EndpointDescriptor,
        catalogue: Arc<ErrorCatalogue>,
        interaction: Interaction,
    ) -> Result<Self, EndpointError> {
        match descriptor {
            EndpointDescriptor::Local(local) => Ok(Self::from_local(Arc::clone(local), catalogue, interaction)),
            other => Err(unexpected("local", other)),
        }
    }

    pub(crate) fn from_local(
        descriptor: Arc<LocalDescriptor>,
        catalogue: Arc<ErrorCatalogue>,
        interaction: Interaction,
    ) -> Self {
        Self {
            descriptor,
            catalogue,
            interaction,
        }
    }

    async fn call(&self, request: &EndpointRequest) -> CallResult {
        let mut interaction = self
            .interaction
            .clone()
            .with_resource(self.descriptor.key.clone())
            .with_action(request.action)
            .with_interface(Arc::clone(&self.descriptor.interface));
        if let Some(interaction_id) = &request.interaction_id {
            interaction.interaction_id = interaction_id.clone();
        }

        let mut context = Context::for_request(interaction, Arc::clone(&self.catalogue), request);
        invoke(self.descriptor.implementation.as_ref(), request.action, &mut context).await;
        context.into_result()
    }
}

#[async_trait]
impl Endpoint for LocalEndpoint {
    fn key(&self) -> &ResourceKey {
        &self.descriptor.key
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    async fn dispatch(&self, request: EndpointRequest) -> CallResult {
        observed(&self.descriptor.key, self.kind(), &request, self.call(&request)).await
    }
}
