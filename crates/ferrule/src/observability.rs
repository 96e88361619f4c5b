//! Structured logging for inter-resource calls
//!
//! Every endpoint call goes through [`CallMetadata::log_start`] and one of
//! the [`CallOutcome`] log methods so a multi-hop interaction can be followed
//! by `interaction_id`.

use ferrule_protocol::{Action, ResourceKey};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What is being called
#[derive(Debug, Clone)]
pub struct CallMetadata {
    /// Target resource
    pub target: ResourceKey,
    /// Action invoked
    pub action: Action,
    /// Transport kind (`local`, `http`, `queue`, `not_found`)
    pub transport: &'static str,
    /// Interaction the call belongs to
    pub interaction_id: Option<String>,
}

impl CallMetadata {
    /// Create new call metadata
    pub fn new(target: ResourceKey, action: Action, transport: &'static str) -> Self {
        Self {
            target,
            action,
            transport,
            interaction_id: None,
        }
    }

    /// Set the interaction id
    pub fn with_interaction_id(mut self, interaction_id: Option<String>) -> Self {
        self.interaction_id = interaction_id;
        self
    }

    /// Log the call being made
    pub fn log_start(&self) {
        debug!(
            resource = %self.target.resource,
            version = self.target.version,
            action = self.action.as_str(),
            transport = self.transport,
            interaction_id = self.interaction_id.as_deref(),
            "Calling resource"
        );
    }
}

/// How a call ended
#[derive(Debug, Clone)]
pub struct CallOutcome {
    /// HTTP-equivalent status
    pub status: u16,
    /// Number of errors returned
    pub error_count: usize,
    /// Time taken
    pub elapsed: Duration,
}

impl CallOutcome {
    /// Create a new outcome
    pub fn new(status: u16, error_count: usize, elapsed: Duration) -> Self {
        Self {
            status,
            error_count,
            elapsed,
        }
    }

    /// Log a successful call
    pub fn log_success(&self, call: &CallMetadata) {
        info!(
            resource = %call.target.resource,
            version = call.target.version,
            action = call.action.as_str(),
            transport = call.transport,
            interaction_id = call.interaction_id.as_deref(),
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            "Resource call succeeded"
        );
    }

    /// Log a call that returned errors
    pub fn log_errors(&self, call: &CallMetadata) {
        warn!(
            resource = %call.target.resource,
            version = call.target.version,
            action = call.action.as_str(),
            transport = call.transport,
            interaction_id = call.interaction_id.as_deref(),
            status = self.status,
            error_count = self.error_count,
            elapsed_ms = self.elapsed.as_millis(),
            "Resource call returned errors"
        );
    }
}

/// Timer for measuring call duration
pub struct CallTimer {
    start: Instant,
}

impl CallTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
