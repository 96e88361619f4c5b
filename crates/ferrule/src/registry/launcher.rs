use super::{ClientError, RegistryClient, RegistryServer};
use crate::config::{PlatformConfig, REGISTRY_PORT_ENV};
use async_trait::async_trait;
use ferrule_core::resource::Resource;
use ferrule_core::retry::ExponentialBackoff;
use ferrule_transport::{ProcessConfig, ProcessHandle};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{error, info};

/// How to start the registry when nothing answers on its port.
#[derive(Debug, Clone)]
pub enum RegistryLauncher {
    /// Run the server as a task of the current runtime. The registry then
    /// lives only as long as that runtime.
    InProcess,
    /// Spawn a detached helper process; the port is passed in the environment
    Spawn(ProcessConfig),
    /// Never start it; a missing registry is an error
    Disabled,
}

impl RegistryLauncher {
    /// Start a registry listening on `port`.
    pub async fn launch(&self, port: u16) -> Result<(), ClientError> {
        match self {
            RegistryLauncher::InProcess => {
                let server = RegistryServer::bind((Ipv4Addr::LOCALHOST, port)).await?;
                tokio::spawn(async move {
                    if let Err(err) = server.run().await {
                        error!(error = %err, "in-process discovery registry failed");
                    }
                });
                Ok(())
            }
            RegistryLauncher::Spawn(config) => {
                let config = config.clone().with_env(REGISTRY_PORT_ENV, port.to_string());
                ProcessHandle::spawn(config)
                    .map(|_| ())
                    .map_err(|err| ClientError::Launch(err.to_string()))
            }
            RegistryLauncher::Disabled => Err(ClientError::Unavailable(port)),
        }
    }
}

/// Where the registry lives and how to bring it up.
#[derive(Debug, Clone)]
pub struct RegistryStartup {
    /// Registry port on the loopback interface
    pub port: u16,
    /// Start strategy
    pub launcher: RegistryLauncher,
    /// How long to poll a freshly started registry
    pub start_timeout: Duration,
}

impl RegistryStartup {
    /// Port and start timeout from `config`, spawning
    /// [`PlatformConfig::registry_program`] when the registry is missing.
    pub fn from_config(config: &PlatformConfig) -> Self {
        let program = ProcessConfig::new(config.registry_program.clone())
            .inherit_env(true)
            .with_startup_timeout(config.registry_start_timeout);
        Self {
            port: config.registry_port,
            launcher: RegistryLauncher::Spawn(program),
            start_timeout: config.registry_start_timeout,
        }
    }

    /// Start with `launcher` instead
    pub fn with_launcher(mut self, launcher: RegistryLauncher) -> Self {
        self.launcher = launcher;
        self
    }
}

#[async_trait]
impl Resource for RegistryClient {
    type Config = RegistryStartup;
    type Error = ClientError;

    /// Connect to the registry, starting it first if nothing answers.
    async fn initialize(config: RegistryStartup) -> Result<Self, ClientError> {
        let client = RegistryClient::local(config.port);
        if client.ping().await.is_ok() {
            return Ok(client);
        }

        info!(port = config.port, "starting discovery registry");
        // Another process may win the race for the port; polling covers that.
        match config.launcher.launch(config.port).await {
            Ok(()) => {}
            Err(ClientError::Io(err)) => {
                info!(port = config.port, error = %err, "registry port taken, waiting for it");
            }
            Err(other) => return Err(other),
        }

        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(20))
            .max_delay(Duration::from_millis(500))
            .build();
        backoff
            .poll_until(config.start_timeout, || client.ping())
            .await
            .map_err(|timeout| ClientError::StartTimeout {
                port: config.port,
                attempts: timeout.attempts,
                elapsed: timeout.elapsed,
                last_error: timeout.last_error.to_string(),
            })?;
        Ok(client)
    }

    async fn is_healthy(&self) -> bool {
        self.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::resource::LazyResource;

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn lazy_start_launches_in_process() {
        let startup = RegistryStartup {
            port: free_port(),
            launcher: RegistryLauncher::InProcess,
            start_timeout: Duration::from_secs(5),
        };
        let registry: LazyResource<RegistryClient> = LazyResource::new(startup);
        assert!(!registry.is_initialized());

        let client = tokio_test::assert_ok!(registry.get().await);
        tokio_test::assert_ok!(client.ping().await);
        assert_eq!(registry.is_healthy().await, Some(true));
        client.stop().await.unwrap();
    }

    #[test]
    fn configured_program_is_spawned_by_default() {
        let config = PlatformConfig::default().with_registry_program("/opt/ferrule/bin/ferrule-registry");
        match RegistryStartup::from_config(&config).launcher {
            RegistryLauncher::Spawn(process) => {
                assert_eq!(process.program, "/opt/ferrule/bin/ferrule-registry");
                assert!(process.inherit_env);
            }
            other => panic!("expected a spawning launcher, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_registry_program_is_a_launch_error() {
        let config = PlatformConfig::default()
            .with_registry_port(free_port())
            .with_registry_program("/nonexistent/ferrule-registry");
        let err = RegistryClient::initialize(RegistryStartup::from_config(&config))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Launch(_)));
    }

    #[tokio::test]
    async fn disabled_launcher_fails_fast() {
        let config = PlatformConfig::default().with_registry_port(free_port());
        let startup = RegistryStartup::from_config(&config).with_launcher(RegistryLauncher::Disabled);
        let err = RegistryClient::initialize(startup).await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unresponsive_spawn_times_out() {
        let startup = RegistryStartup {
            port: free_port(),
            launcher: RegistryLauncher::Spawn(ProcessConfig::new("true").inherit_env(true)),
            start_timeout: Duration::from_millis(200),
        };
        let err = RegistryClient::initialize(startup).await.unwrap_err();
        assert!(matches!(err, ClientError::StartTimeout { attempts, .. } if attempts > 1));
    }
}
