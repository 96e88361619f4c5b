//! Configuration for the platform context

use std::time::Duration;

/// Default transient-store key namespace.
pub const DEFAULT_STORE_NAMESPACE: &str = "ferrule_transient_store_";

/// Default port of the shared discovery registry.
pub const DEFAULT_REGISTRY_PORT: u16 = 8787;

/// Environment variable overriding the shared discovery registry port.
pub const REGISTRY_PORT_ENV: &str = "FERRULE_DISCOVERY_REGISTRY_PORT_OVERRIDE";

/// Registry server executable, looked up on `PATH` unless absolute.
pub const DEFAULT_REGISTRY_PROGRAM: &str = "ferrule-registry";

/// Configuration for a [`Platform`](crate::Platform).
///
/// Every field has a working default, so `PlatformConfig::default()` is a
/// valid configuration for a single process hosting its own resources.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    /// Timeout for HTTP inter-resource calls
    pub http_timeout: Duration,

    /// Timeout for queue inter-resource calls
    pub queue_timeout: Duration,

    /// Retries of connection-level HTTP failures
    pub http_retries: u32,

    /// Lifetime of newly created sessions
    pub session_ttl: Duration,

    /// Prefix applied to every transient-store key
    pub store_namespace: String,

    /// Storage engine backing the transient store
    pub store_engine: String,

    /// Mailbox capacity of each slow communicator
    pub mailbox_capacity: usize,

    /// Per-listener timeout for pool wait/terminate
    pub pool_timeout: Duration,

    /// Port of the shared discovery registry
    pub registry_port: u16,

    /// How long to wait for a lazily started registry to answer
    pub registry_start_timeout: Duration,

    /// Executable started when no registry answers on its port
    pub registry_program: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            queue_timeout: Duration::from_secs(30),
            http_retries: 0,
            session_ttl: Duration::from_secs(48 * 60 * 60),
            store_namespace: DEFAULT_STORE_NAMESPACE.to_string(),
            store_engine: "memory".to_string(),
            mailbox_capacity: 50,
            pool_timeout: Duration::from_secs(5),
            registry_port: DEFAULT_REGISTRY_PORT,
            registry_start_timeout: Duration::from_secs(5),
            registry_program: DEFAULT_REGISTRY_PROGRAM.to_string(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `FERRULE_HTTP_TIMEOUT` HTTP call timeout (seconds)
    /// - `FERRULE_QUEUE_TIMEOUT` queue call timeout (seconds)
    /// - `FERRULE_HTTP_RETRIES` retries of connection failures
    /// - `FERRULE_SESSION_TTL` session lifetime (seconds)
    /// - `FERRULE_STORE_NAMESPACE` transient-store key prefix
    /// - `FERRULE_STORE_ENGINE` storage engine name
    /// - `FERRULE_MAILBOX_CAPACITY` slow communicator mailbox size
    /// - `FERRULE_DISCOVERY_REGISTRY_PORT_OVERRIDE` shared registry port
    /// - `FERRULE_REGISTRY_PROGRAM` registry server executable
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        use std::env;

        let mut config = Self::default();

        if let Ok(value) = env::var("FERRULE_HTTP_TIMEOUT")
            && let Ok(secs) = value.parse::<u64>()
        {
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Ok(value) = env::var("FERRULE_QUEUE_TIMEOUT")
            && let Ok(secs) = value.parse::<u64>()
        {
            config.queue_timeout = Duration::from_secs(secs);
        }

        if let Ok(value) = env::var("FERRULE_HTTP_RETRIES")
            && let Ok(retries) = value.parse::<u32>()
        {
            config.http_retries = retries;
        }

        if let Ok(value) = env::var("FERRULE_SESSION_TTL")
            && let Ok(secs) = value.parse::<u64>()
        {
            config.session_ttl = Duration::from_secs(secs);
        }

        if let Ok(namespace) = env::var("FERRULE_STORE_NAMESPACE")
            && !namespace.is_empty()
        {
            config.store_namespace = namespace;
        }

        if let Ok(engine) = env::var("FERRULE_STORE_ENGINE")
            && !engine.is_empty()
        {
            config.store_engine = engine;
        }

        if let Ok(value) = env::var("FERRULE_MAILBOX_CAPACITY")
            && let Ok(capacity) = value.parse::<usize>()
            && capacity > 0
        {
            config.mailbox_capacity = capacity;
        }

        if let Some(port) = registry_port_override() {
            config.registry_port = port;
        }

        if let Ok(program) = env::var("FERRULE_REGISTRY_PROGRAM")
            && !program.is_empty()
        {
            config.registry_program = program;
        }

        config
    }

    /// Merge this configuration with another; values in `other` that
    /// differ from the defaults win.
    pub fn merge(mut self, other: PlatformConfig) -> Self {
        let defaults = PlatformConfig::default();

        if other.http_timeout != defaults.http_timeout {
            self.http_timeout = other.http_timeout;
        }
        if other.queue_timeout != defaults.queue_timeout {
            self.queue_timeout = other.queue_timeout;
        }
        if other.http_retries != defaults.http_retries {
            self.http_retries = other.http_retries;
        }
        if other.session_ttl != defaults.session_ttl {
            self.session_ttl = other.session_ttl;
        }
        if other.store_namespace != defaults.store_namespace {
            self.store_namespace = other.store_namespace;
        }
        if other.store_engine != defaults.store_engine {
            self.store_engine = other.store_engine;
        }
        if other.mailbox_capacity != defaults.mailbox_capacity {
            self.mailbox_capacity = other.mailbox_capacity;
        }
        if other.pool_timeout != defaults.pool_timeout {
            self.pool_timeout = other.pool_timeout;
        }
        if other.registry_port != defaults.registry_port {
            self.registry_port = other.registry_port;
        }
        if other.registry_start_timeout != defaults.registry_start_timeout {
            self.registry_start_timeout = other.registry_start_timeout;
        }
        if other.registry_program != defaults.registry_program {
            self.registry_program = other.registry_program;
        }

        self
    }

    /// Set the HTTP call timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the queue call timeout
    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    /// Set the session lifetime
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the storage engine name
    pub fn with_store_engine(mut self, engine: impl Into<String>) -> Self {
        self.store_engine = engine.into();
        self
    }

    /// Set the registry port
    pub fn with_registry_port(mut self, port: u16) -> Self {
        self.registry_port = port;
        self
    }

    /// Set the registry server executable
    pub fn with_registry_program(mut self, program: impl Into<String>) -> Self {
        self.registry_program = program.into();
        self
    }
}

/// Registry port from [`REGISTRY_PORT_ENV`], if set and valid.
pub fn registry_port_override() -> Option<u16> {
    std::env::var(REGISTRY_PORT_ENV)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlatformConfig::default();
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.http_retries, 0);
        assert_eq!(config.session_ttl, Duration::from_secs(172_800));
        assert_eq!(config.store_namespace, "ferrule_transient_store_");
        assert_eq!(config.mailbox_capacity, 50);
        assert_eq!(config.registry_port, 8787);
        assert_eq!(config.registry_program, "ferrule-registry");
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("FERRULE_HTTP_TIMEOUT", Some("5")),
                ("FERRULE_SESSION_TTL", Some("60")),
                ("FERRULE_STORE_NAMESPACE", Some("other_")),
                ("FERRULE_MAILBOX_CAPACITY", Some("0")),
                (REGISTRY_PORT_ENV, Some("9999")),
                ("FERRULE_REGISTRY_PROGRAM", Some("/opt/ferrule/bin/ferrule-registry")),
            ],
            || {
                let config = PlatformConfig::from_env();
                assert_eq!(config.http_timeout, Duration::from_secs(5));
                assert_eq!(config.session_ttl, Duration::from_secs(60));
                assert_eq!(config.store_namespace, "other_");
                assert_eq!(config.mailbox_capacity, 50);
                assert_eq!(config.registry_port, 9999);
                assert_eq!(config.registry_program, "/opt/ferrule/bin/ferrule-registry");
            },
        );
    }

    #[test]
    fn test_from_env_ignores_garbage() {
        temp_env::with_vars(
            [
                ("FERRULE_QUEUE_TIMEOUT", Some("soon")),
                (REGISTRY_PORT_ENV, Some("not-a-port")),
            ],
            || {
                let config = PlatformConfig::from_env();
                assert_eq!(config.queue_timeout, Duration::from_secs(30));
                assert_eq!(config.registry_port, DEFAULT_REGISTRY_PORT);
            },
        );
    }

    #[test]
    fn test_config_merge() {
        let base = PlatformConfig::default().with_registry_port(9000);
        let overlay = PlatformConfig::default().with_http_timeout(Duration::from_secs(3));

        let merged = base.merge(overlay);
        assert_eq!(merged.registry_port, 9000);
        assert_eq!(merged.http_timeout, Duration::from_secs(3));
    }
}
