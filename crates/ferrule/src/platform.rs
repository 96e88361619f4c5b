//! The platform context object
//!
//! A [`Platform`] owns everything a service process shares between calls:
//!
//! - configuration
//! - the error catalogue
//! - the service logger and exception reporting
//! - the storage-engine registry and the transient store built from it
//! - the discoverer and the transports endpoints are built on
//!
//! It is built explicitly with [`PlatformBuilder`] and passed to whatever
//! needs it; there is no process-global instance.

use crate::config::PlatformConfig;
use crate::discovery::{AnnounceOptions, Discoverer, DiscoveryStrategy, EndpointDescriptor, LocalDescriptor, LocalOnly};
use crate::endpoint::{
    CallResult, Endpoint, EndpointError, EndpointRequest, HttpEndpoint, InterResourceLocal, InterResourceRemote,
    LocalEndpoint, NotFoundEndpoint, QueueEndpoint,
};
use crate::error::Result;
use crate::errors::ErrorCatalogue;
use crate::logging::{LogLevel, Logger};
use crate::reporting::{ExceptionReporting, TracingReporter};
use crate::service::{Interaction, InterfaceDeclaration, LocalDispatch, ResourceImplementation};
use crate::session::Session;
use crate::transient_store::{EngineOptions, StoreRegistry, TransientStore};
use async_trait::async_trait;
use ferrule_protocol::{Action, Permissions, QueueRequest, QueueResponse, ResourceKey, headers};
use ferrule_transport::{HttpTransport, HttpTransportConfig, QueueTransport, RetryPolicy, Transport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builder for [`Platform`].
#[derive(Default)]
pub struct PlatformBuilder {
    config: PlatformConfig,
    strategy: Option<Arc<dyn DiscoveryStrategy>>,
    catalogue: Option<ErrorCatalogue>,
    engines: Option<StoreRegistry>,
    engine_options: EngineOptions,
    http: Option<Arc<dyn Transport>>,
    queue: Option<Arc<dyn QueueTransport>>,
    log_level: Option<LogLevel>,
}

impl PlatformBuilder {
    /// Use `config`
    pub fn with_config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }

    /// Discover remote resources with `strategy`; the default only knows
    /// what this process announces.
    pub fn with_strategy(mut self, strategy: Arc<dyn DiscoveryStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Extend the default catalogue with `catalogue`
    pub fn with_catalogue(mut self, catalogue: ErrorCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Build the transient store from `engines` instead of the built-ins
    pub fn with_store_engines(mut self, engines: StoreRegistry) -> Self {
        self.engines = Some(engines);
        self
    }

    /// Settings handed to the configured storage engine
    pub fn with_engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = options;
        self
    }

    /// Make HTTP calls through `transport`
    pub fn with_http_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.http = Some(transport);
        self
    }

    /// Make queue calls through `transport`
    pub fn with_queue_transport(mut self, transport: Arc<dyn QueueTransport>) -> Self {
        self.queue = Some(transport);
        self
    }

    /// Minimum level of the service logger
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Build the platform.
    ///
    /// # Errors
    ///
    /// An unknown or misconfigured storage engine, or an HTTP client that
    /// cannot be created.
    pub fn build(self) -> Result<Platform> {
        let config = self.config;

        let mut catalogue = ErrorCatalogue::default();
        if let Some(extra) = self.catalogue {
            catalogue.extend(extra);
        }
        let catalogue = Arc::new(catalogue);

        let engines = self.engines.unwrap_or_else(StoreRegistry::with_builtin_engines);
        let engine = engines.build(&config.store_engine, &self.engine_options)?;
        let store = TransientStore::new(engine, config.store_namespace.clone(), config.session_ttl);

        let http = match self.http {
            Some(http) => http,
            None => Arc::new(default_http_transport(&config)?),
        };

        let logger = Logger::tracing(self.log_level.unwrap_or(LogLevel::Info), config.mailbox_capacity);
        let reporting = ExceptionReporting::new(config.mailbox_capacity);
        reporting.add_reporter("tracing", TracingReporter)?;

        let strategy = self.strategy.unwrap_or_else(|| Arc::new(LocalOnly));
        let discoverer = Arc::new(Discoverer::new(strategy));
        let local = Arc::new(LocalServices {
            discoverer: Arc::clone(&discoverer),
            catalogue: Arc::clone(&catalogue),
        });

        info!(
            store_engine = %config.store_engine,
            strategy = discoverer.strategy().name(),
            "platform ready"
        );

        Ok(Platform {
            config,
            catalogue,
            logger,
            reporting,
            engines,
            store,
            discoverer,
            local,
            http,
            queue: self.queue,
        })
    }
}

fn default_http_transport(config: &PlatformConfig) -> Result<HttpTransport> {
    let retry_policy = if config.http_retries == 0 {
        RetryPolicy::none()
    } else {
        RetryPolicy::builder().max_retries(config.http_retries).build()
    };
    Ok(HttpTransport::with_config(HttpTransportConfig {
        timeout: config.http_timeout,
        retry_policy,
        ..HttpTransportConfig::default()
    })?)
}

/// Shared state of a service process.
pub struct Platform {
    config: PlatformConfig,
    catalogue: Arc<ErrorCatalogue>,
    logger: Logger,
    reporting: ExceptionReporting,
    engines: StoreRegistry,
    store: TransientStore,
    discoverer: Arc<Discoverer>,
    local: Arc<LocalServices>,
    http: Arc<dyn Transport>,
    queue: Option<Arc<dyn QueueTransport>>,
}

impl Platform {
    /// Start building a platform
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::default()
    }

    /// Active configuration
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Error catalogue
    pub fn catalogue(&self) -> &Arc<ErrorCatalogue> {
        &self.catalogue
    }

    /// Service logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Exception reporting
    pub fn reporting(&self) -> &ExceptionReporting {
        &self.reporting
    }

    /// Registered storage engines
    pub fn store_engines(&self) -> &StoreRegistry {
        &self.engines
    }

    /// Transient store
    pub fn store(&self) -> &TransientStore {
        &self.store
    }

    /// Discoverer
    pub fn discoverer(&self) -> &Arc<Discoverer> {
        &self.discoverer
    }

    /// Announce an implementation hosted by this process.
    ///
    /// # Errors
    ///
    /// An invalid key or path, or a failure of the discovery strategy.
    pub async fn announce_local(
        &self,
        resource: &str,
        version: u32,
        implementation: Arc<dyn ResourceImplementation>,
        interface: Option<Arc<InterfaceDeclaration>>,
    ) -> Result<EndpointDescriptor> {
        let mut options = AnnounceOptions::local(implementation);
        options.interface = interface;
        self.announce(resource, version, options).await
    }

    /// Announce a resource with full control over the options.
    ///
    /// # Errors
    ///
    /// See [`Discoverer::announce`].
    pub async fn announce(&self, resource: &str, version: u32, options: AnnounceOptions) -> Result<EndpointDescriptor> {
        Ok(self.discoverer.announce(resource, version, options).await?)
    }

    /// Endpoint for a call that does not originate in another resource.
    ///
    /// Unknown resources get an endpoint answering `platform.not_found`.
    ///
    /// # Errors
    ///
    /// Discovery failures, and a queue descriptor with no queue transport.
    pub async fn endpoint(&self, resource: &str, version: u32) -> Result<Arc<dyn Endpoint>> {
        match self.discoverer.discover(resource, version).await? {
            Some(descriptor) => self.build_endpoint(&descriptor, Interaction::new()),
            None => Ok(self.not_found(resource, version)),
        }
    }

    /// Endpoint for a call made while handling `interaction`.
    ///
    /// Co-hosted resources are dispatched locally with the caller's
    /// session. Anything else is wrapped so the caller's interface can
    /// augment the session for the duration of the call.
    ///
    /// # Errors
    ///
    /// As [`Platform::endpoint`].
    pub async fn inter_resource_endpoint(
        &self,
        interaction: &Interaction,
        resource: &str,
        version: u32,
    ) -> Result<Arc<dyn Endpoint>> {
        let key = ResourceKey::parse(resource, version)?;
        let Some(descriptor) = self.discoverer.discover(resource, version).await? else {
            return Ok(self.not_found(resource, version));
        };
        if let EndpointDescriptor::Local(_) = descriptor {
            return Ok(Arc::new(InterResourceLocal::new(
                key,
                Arc::clone(&self.local) as Arc<dyn LocalDispatch>,
                interaction.clone(),
            )));
        }
        self.build_endpoint(&descriptor.wrap(), interaction.clone())
    }

    fn build_endpoint(&self, descriptor: &EndpointDescriptor, interaction: Interaction) -> Result<Arc<dyn Endpoint>> {
        let catalogue = Arc::clone(&self.catalogue);
        let endpoint: Arc<dyn Endpoint> = match descriptor {
            EndpointDescriptor::Local(_) => Arc::new(LocalEndpoint::new(descriptor, catalogue, interaction)?),
            EndpointDescriptor::Http(_) => Arc::new(HttpEndpoint::new(
                descriptor,
                Arc::clone(&self.http),
                catalogue,
                self.config.http_timeout,
            )?),
            EndpointDescriptor::Queue(queue) => {
                let transport = self
                    .queue
                    .clone()
                    .ok_or_else(|| EndpointError::NoQueueTransport(queue.key.clone()))?;
                Arc::new(QueueEndpoint::new(
                    descriptor,
                    transport,
                    catalogue,
                    self.config.queue_timeout,
                )?)
            }
            EndpointDescriptor::Remote(remote) => {
                let wrapped = self.build_endpoint(&remote.inner, interaction.clone())?;
                Arc::new(InterResourceRemote::new(wrapped, interaction, self.store.clone(), catalogue))
            }
        };
        Ok(endpoint)
    }

    fn not_found(&self, resource: &str, version: u32) -> Arc<dyn Endpoint> {
        Arc::new(NotFoundEndpoint::new(
            ResourceKey::new(resource, version),
            Arc::clone(&self.catalogue),
        ))
    }

    /// Create and store a session valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// The session could not be written to the store.
    pub async fn create_session(
        &self,
        caller_id: &str,
        caller_version: &str,
        permissions: Permissions,
    ) -> Result<Session> {
        let session = Session::new(caller_id, caller_version, permissions, self.config.session_ttl)?;
        session.save_to_store(&self.store).await?;
        Ok(session)
    }

    /// Interaction for an incoming call carrying `session_id`; a missing,
    /// expired or unknown session leaves the interaction without one.
    pub async fn interaction_for(&self, session_id: Option<&str>, interaction_id: Option<&str>) -> Interaction {
        let mut interaction = Interaction::new();
        if let Some(interaction_id) = interaction_id {
            interaction.interaction_id = interaction_id.to_string();
        }
        if let Some(id) = session_id {
            interaction.session = Session::load_from_store(&self.store, id).await;
        }
        interaction
    }

    /// Answer a queue request addressed to a resource hosted here.
    ///
    /// The request path is routed to the announced local resource it
    /// matches; the session header is resolved through the transient store.
    pub async fn serve_queue_request(&self, request: QueueRequest) -> QueueResponse {
        let interaction = self
            .interaction_for(
                request.headers.get(headers::SESSION_ID).map(String::as_str),
                request.headers.get(headers::INTERACTION_ID).map(String::as_str),
            )
            .await;
        let correlation_id = interaction.interaction_id.clone();

        let result = match self.route(&request.path) {
            Some((descriptor, ident)) => {
                let endpoint = LocalEndpoint::from_local(descriptor, Arc::clone(&self.catalogue), interaction);
                endpoint.dispatch(queue_call(&request, ident)).await
            }
            None => CallResult::platform_error(
                &self.catalogue,
                "platform.not_found",
                &[("entity_name", request.path.as_str())],
            ),
        };

        let status = result.status();
        match result {
            CallResult::Success { payload, dataset_size } => {
                let body = match (request.action, dataset_size) {
                    (Action::List, Some(size)) => serde_json::json!({ "_data": payload, "_dataset_size": size }),
                    (Action::List, None) => serde_json::json!({ "_data": payload }),
                    _ => payload,
                };
                request.reply(status, Some(body))
            }
            CallResult::Failure(mut errors) => {
                let body = match errors.render(&correlation_id) {
                    Ok(payload) => serde_json::to_value(payload).ok(),
                    Err(err) => {
                        warn!(error = %err, "could not render queue error payload");
                        None
                    }
                };
                request.reply(status, body)
            }
        }
    }

    fn route(&self, path: &str) -> Option<(Arc<LocalDescriptor>, Option<String>)> {
        self.discoverer.local_descriptors().into_iter().find_map(|local| {
            let matched = local.matches(path)?;
            Some((local, matched.ident))
        })
    }

    /// Drain and stop the logger and exception reporting, then close the
    /// transient store. Returns whether everything stopped within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let logger = self.logger.terminate(timeout);
        let reporting = self.reporting.terminate(timeout);
        if let Err(err) = self.store.close().await {
            warn!(error = %err, "transient store did not close cleanly");
        }
        info!(logger, reporting, "platform shut down");
        logger && reporting
    }
}

fn queue_call(request: &QueueRequest, ident: Option<String>) -> EndpointRequest {
    EndpointRequest {
        action: request.action,
        ident: request.ident.clone().or(ident),
        query: request.query.clone(),
        body: request.body.clone().filter(|body| *body != Value::Null),
        session_id: request.headers.get(headers::SESSION_ID).cloned(),
        interaction_id: request.headers.get(headers::INTERACTION_ID).cloned(),
    }
}

/// Dispatches co-hosted inter-resource calls.
struct LocalServices {
    discoverer: Arc<Discoverer>,
    catalogue: Arc<ErrorCatalogue>,
}

#[async_trait]
impl LocalDispatch for LocalServices {
    async fn dispatch(&self, interaction: &Interaction, target: &ResourceKey, request: EndpointRequest) -> CallResult {
        match self.discoverer.discover(&target.resource, target.version).await {
            Ok(Some(EndpointDescriptor::Local(local))) => {
                LocalEndpoint::from_local(local, Arc::clone(&self.catalogue), interaction.clone())
                    .dispatch(request)
                    .await
            }
            Ok(_) => {
                let entity = target.to_string();
                CallResult::platform_error(&self.catalogue, "platform.not_found", &[("entity_name", entity.as_str())])
            }
            Err(err) => {
                warn!(%target, error = %err, "local dispatch could not resolve target");
                CallResult::platform_error(&self.catalogue, "platform.fault", &[])
            }
        }
    }
}
