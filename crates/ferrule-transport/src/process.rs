//! Helper process management
//!
//! Used to launch long-lived helpers such as the shared discovery registry.
//! Helpers are detached: dropping the handle does not kill the process.

use crate::error::{Result, TransportError};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::info;

/// Configuration for spawning a helper process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Path to the executable
    pub program: String,

    /// Arguments to pass
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Keep the parent's environment instead of starting from an empty one
    pub inherit_env: bool,

    /// How long callers should wait for the helper to become ready
    pub startup_timeout: Duration,
}

impl ProcessConfig {
    /// Create a new process configuration
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            inherit_env: false,
            startup_timeout: Duration::from_secs(5),
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable
    ///
    /// Unless [`ProcessConfig::inherit_env`] is enabled the child sees only
    /// the variables set here.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pass the parent's environment through to the child
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the startup timeout
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

/// Handle to a running helper process
#[derive(Clone)]
pub struct ProcessHandle {
    process: Arc<Mutex<Child>>,
    pid: Option<u32>,
    config: ProcessConfig,
}

impl ProcessHandle {
    /// Spawn the helper with stdio detached.
    pub fn spawn(config: ProcessConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);

        if !config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&config.env);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(false);

        let process = cmd
            .spawn()
            .map_err(|e| TransportError::Process(format!("Failed to spawn {}: {}", config.program, e)))?;
        let pid = process.id();
        info!(program = %config.program, ?pid, "spawned helper process");

        Ok(Self {
            process: Arc::new(Mutex::new(process)),
            pid,
            config,
        })
    }

    /// OS process id, if the process was still running when spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Check if the process is still alive
    pub async fn is_alive(&self) -> bool {
        let mut process = self.process.lock().await;
        process.try_wait().ok().flatten().is_none()
    }

    /// Kill the process
    pub async fn kill(&self) -> Result<()> {
        let mut process = self.process.lock().await;
        process
            .kill()
            .await
            .map_err(|e| TransportError::Process(format!("Failed to kill process: {}", e)))
    }

    /// Get the process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = ProcessConfig::new("ferrule-registry")
            .with_arg("--port")
            .with_arg("8787")
            .with_env("RUST_LOG", "info")
            .with_startup_timeout(Duration::from_secs(2));

        assert_eq!(config.program, "ferrule-registry");
        assert_eq!(config.args, vec!["--port", "8787"]);
        assert_eq!(config.env.get("RUST_LOG").map(String::as_str), Some("info"));
        assert!(!config.inherit_env);
        assert_eq!(config.startup_timeout, Duration::from_secs(2));
    }

    #[test]
    fn spawning_a_missing_program_fails() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(async {
            ProcessHandle::spawn(ProcessConfig::new("/nonexistent/ferrule-helper"))
        });
        assert!(matches!(result, Err(TransportError::Process(_))));
    }
}
