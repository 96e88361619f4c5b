use super::{DEFAULT_MEMCACHED_ADDRESS, MemcachedEngine, MemoryEngine, MirrorEngine, MirrorReadPolicy, StoreEngine, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default `capacity` setting for the `memory` engine.
pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Engine registration and construction failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A factory is already registered under this name
    #[error("storage engine already registered: {0}")]
    AlreadyRegistered(String),

    /// No factory is registered under this name
    #[error("unknown storage engine: {0}")]
    UnknownEngine(String),

    /// The engine options could not be used
    #[error("storage engine {engine} misconfigured: {reason}")]
    Misconfigured {
        /// Engine name
        engine: String,
        /// What was wrong
        reason: String,
    },

    /// The engine failed while being created
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Free-form settings handed to an engine factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Setting name to value
    pub settings: BTreeMap<String, String>,
}

impl EngineOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    /// Look up a setting
    pub fn get(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }
}

/// Builds an engine. Receives the registry so composite engines can build
/// their parts by name.
pub type EngineFactory =
    Arc<dyn Fn(&StoreRegistry, &EngineOptions) -> Result<Arc<dyn StoreEngine>, RegistryError> + Send + Sync>;

/// Name to engine-factory table.
///
/// Owned by the platform context rather than held globally; clone the
/// registry behind an `Arc` to share it.
#[derive(Default)]
pub struct StoreRegistry {
    factories: Mutex<HashMap<String, EngineFactory>>,
}

impl StoreRegistry {
    /// Registry with no engines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `memory`, `memcached` and `mirror` engines.
    pub fn with_builtin_engines() -> Self {
        let registry = Self::new();
        // Fresh registry, names cannot collide.
        let _ = registry.register("memory", Arc::new(build_memory));
        let _ = registry.register("memcached", Arc::new(build_memcached));
        let _ = registry.register("mirror", Arc::new(build_mirror));
        registry
    }

    /// Register `factory` under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] when the name is taken.
    pub fn register(&self, name: impl Into<String>, factory: EngineFactory) -> Result<(), RegistryError> {
        let name = name.into();
        let mut factories = self.factories.lock();
        if factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(engine = %name, "registered storage engine");
        factories.insert(name, factory);
        Ok(())
    }

    /// Remove `name`; returns whether it was registered.
    pub fn deregister(&self, name: &str) -> bool {
        self.factories.lock().remove(name).is_some()
    }

    /// Names of all registered engines.
    pub fn supported_storage_engines(&self) -> BTreeSet<String> {
        self.factories.lock().keys().cloned().collect()
    }

    /// Build the engine registered as `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownEngine`] for unregistered names, or whatever
    /// the factory reports.
    pub fn build(&self, name: &str, options: &EngineOptions) -> Result<Arc<dyn StoreEngine>, RegistryError> {
        let factory = self
            .factories
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownEngine(name.to_string()))?;
        // The lock is released so factories may build other engines.
        factory(self, options)
    }
}

fn build_memory(_: &StoreRegistry, options: &EngineOptions) -> Result<Arc<dyn StoreEngine>, RegistryError> {
    let capacity = match options.get("capacity") {
        Some(raw) => raw.parse().map_err(|_| RegistryError::Misconfigured {
            engine: "memory".into(),
            reason: format!("capacity is not a number: {raw}"),
        })?,
        None => DEFAULT_MEMORY_CAPACITY,
    };
    Ok(Arc::new(MemoryEngine::new(capacity)))
}

/// Settings: `address` (default `127.0.0.1:11211`) and `timeout_ms`.
fn build_memcached(_: &StoreRegistry, options: &EngineOptions) -> Result<Arc<dyn StoreEngine>, RegistryError> {
    let address = options.get("address").unwrap_or(DEFAULT_MEMCACHED_ADDRESS);
    if address.is_empty() {
        return Err(RegistryError::Misconfigured {
            engine: "memcached".into(),
            reason: "empty address".into(),
        });
    }
    let mut engine = MemcachedEngine::new(address);
    if let Some(raw) = options.get("timeout_ms") {
        let millis: u64 = raw.parse().map_err(|_| RegistryError::Misconfigured {
            engine: "memcached".into(),
            reason: format!("timeout_ms is not a number: {raw}"),
        })?;
        engine = engine.with_timeout(Duration::from_millis(millis));
    }
    Ok(Arc::new(engine))
}

/// Settings: `primary` and `secondary` engine names (default `memory`) and
/// `read` (`both`, `primary` or `secondary`; default `both`). Settings
/// prefixed `primary.` / `secondary.` are passed to the inner engines.
fn build_mirror(registry: &StoreRegistry, options: &EngineOptions) -> Result<Arc<dyn StoreEngine>, RegistryError> {
    let misconfigured = |reason: String| RegistryError::Misconfigured {
        engine: "mirror".into(),
        reason,
    };
    let policy = match options.get("read").unwrap_or("both") {
        "both" => MirrorReadPolicy::Both,
        "primary" => MirrorReadPolicy::Primary,
        "secondary" => MirrorReadPolicy::Secondary,
        other => return Err(misconfigured(format!("unknown read policy: {other}"))),
    };

    let mut parts = Vec::with_capacity(2);
    for side in ["primary", "secondary"] {
        let engine = options.get(side).unwrap_or("memory");
        if engine == "mirror" {
            return Err(misconfigured(format!("{side} cannot itself be a mirror")));
        }
        parts.push(registry.build(engine, &scoped(options, side))?);
    }
    let secondary = parts.pop();
    let primary = parts.pop();
    match (primary, secondary) {
        (Some(primary), Some(secondary)) => Ok(Arc::new(MirrorEngine::new(primary, secondary, policy))),
        _ => Err(misconfigured("missing backend".into())),
    }
}

fn scoped(options: &EngineOptions, side: &str) -> EngineOptions {
    let prefix = format!("{side}.");
    EngineOptions {
        settings: options
            .settings
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|k| (k.to_string(), v.clone())))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builtin_engines_are_supported() {
        let registry = StoreRegistry::with_builtin_engines();
        let names: Vec<_> = registry.supported_storage_engines().into_iter().collect();
        assert_eq!(
            names,
            vec!["memcached".to_string(), "memory".to_string(), "mirror".to_string()]
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = StoreRegistry::with_builtin_engines();
        let err = registry.register("memory", Arc::new(build_memory)).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("memory".into()));
    }

    #[test]
    fn deregistered_engines_cannot_be_built() {
        let registry = StoreRegistry::with_builtin_engines();
        assert!(registry.deregister("memory"));
        assert!(!registry.deregister("memory"));
        assert!(matches!(
            registry.build("memory", &EngineOptions::new()),
            Err(RegistryError::UnknownEngine(_))
        ));
    }

    #[test]
    fn bad_settings_are_misconfiguration() {
        let registry = StoreRegistry::with_builtin_engines();
        let options = EngineOptions::new().with_setting("capacity", "lots");
        assert!(matches!(
            registry.build("memory", &options),
            Err(RegistryError::Misconfigured { .. })
        ));

        let options = EngineOptions::new().with_setting("timeout_ms", "soon");
        assert!(matches!(
            registry.build("memcached", &options),
            Err(RegistryError::Misconfigured { .. })
        ));

        let options = EngineOptions::new().with_setting("read", "sometimes");
        assert!(matches!(
            registry.build("mirror", &options),
            Err(RegistryError::Misconfigured { .. })
        ));
    }

    #[tokio::test]
    async fn mirror_builds_from_registered_parts() {
        let registry = StoreRegistry::with_builtin_engines();
        let options = EngineOptions::new()
            .with_setting("primary", "memory")
            .with_setting("primary.capacity", "4");
        let engine = registry.build("mirror", &options).unwrap();

        engine.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(engine.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn mirror_over_an_unreachable_memcached_fails_writes() {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = unused.local_addr().unwrap().to_string();
        drop(unused);

        let registry = StoreRegistry::with_builtin_engines();
        let options = EngineOptions::new()
            .with_setting("secondary", "memcached")
            .with_setting("secondary.address", address)
            .with_setting("secondary.timeout_ms", "500");
        let engine = registry.build("mirror", &options).unwrap();

        assert!(matches!(
            engine.set("k", "v", Duration::from_secs(60)).await,
            Err(StoreError::Transport(_))
        ));
    }

    #[test]
    fn scoped_settings_strip_prefix() {
        let options = EngineOptions::new()
            .with_setting("primary.capacity", "4")
            .with_setting("secondary.capacity", "8")
            .with_setting("read", "both");
        assert_eq!(scoped(&options, "primary").get("capacity"), Some("4"));
        assert_eq!(scoped(&options, "secondary").settings.len(), 1);
    }
}
