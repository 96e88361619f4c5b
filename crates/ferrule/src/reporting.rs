//! Exception reporting
//!
//! Unexpected failures are handed to every registered [`ExceptionReporter`]
//! through a [`CommunicatorPool`]. Reporters are slow communicators: each
//! runs on its own worker thread so a slow error-tracking service never
//! delays the request that failed.

use crate::communicators::{CommunicatorId, CommunicatorPool, SlowCommunicator};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Reporter registration failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportingError {
    /// A reporter with this name is already registered
    #[error("exception reporter already registered: {0}")]
    AlreadyRegistered(String),
}

/// A captured failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionReport {
    /// Top-level error message
    pub message: String,
    /// Messages of the error's sources, outermost first
    pub chain: Vec<String>,
    /// Interaction during which the failure happened
    pub interaction_id: Option<String>,
    /// When the report was made
    pub reported_at: DateTime<Utc>,
}

impl ExceptionReport {
    /// Capture `error` and its source chain.
    pub fn capture(error: &(dyn StdError + 'static), interaction_id: Option<&str>) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            chain,
            interaction_id: interaction_id.map(str::to_string),
            reported_at: Utc::now(),
        }
    }
}

/// Destination for exception reports.
pub trait ExceptionReporter: Send + Sync {
    /// Deliver one report.
    fn report(&self, report: &ExceptionReport) -> anyhow::Result<()>;
}

struct ReporterListener(Arc<dyn ExceptionReporter>, String);

impl SlowCommunicator<ExceptionReport> for ReporterListener {
    fn communicate(&self, report: ExceptionReport) -> anyhow::Result<()> {
        self.0.report(&report)
    }

    fn dropped(&self, count: usize) -> anyhow::Result<()> {
        warn!(reporter = %self.1, count, "exception reports dropped");
        Ok(())
    }
}

/// Named set of reporters.
pub struct ExceptionReporting {
    pool: CommunicatorPool<ExceptionReport>,
    reporters: Mutex<BTreeMap<String, CommunicatorId>>,
}

impl ExceptionReporting {
    /// No reporters; mailboxes of `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: CommunicatorPool::with_capacity(capacity),
            reporters: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register `reporter` as `name`.
    ///
    /// # Errors
    ///
    /// [`ReportingError::AlreadyRegistered`] if the name is taken.
    pub fn add_reporter(
        &self,
        name: impl Into<String>,
        reporter: impl ExceptionReporter + 'static,
    ) -> Result<(), ReportingError> {
        let name = name.into();
        let mut reporters = self.reporters.lock();
        if reporters.contains_key(&name) {
            return Err(ReportingError::AlreadyRegistered(name));
        }
        let id = self
            .pool
            .add_slow(ReporterListener(Arc::new(reporter), name.clone()));
        reporters.insert(name, id);
        Ok(())
    }

    /// Remove the reporter registered as `name`.
    pub fn remove_reporter(&self, name: &str) -> bool {
        let id = self.reporters.lock().remove(name);
        id.is_some_and(|id| self.pool.remove(id))
    }

    /// Names of registered reporters
    pub fn reporter_names(&self) -> Vec<String> {
        self.reporters.lock().keys().cloned().collect()
    }

    /// Send `error` to every reporter.
    pub fn report(&self, error: &(dyn StdError + 'static), interaction_id: Option<&str>) {
        self.report_captured(ExceptionReport::capture(error, interaction_id));
    }

    /// Send an already captured report to every reporter.
    pub fn report_captured(&self, report: ExceptionReport) {
        self.pool.communicate(report);
    }

    /// Wait for pending reports to be delivered.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.pool.wait(timeout)
    }

    /// Deliver pending reports and stop the reporter threads.
    pub fn terminate(&self, timeout: Duration) -> bool {
        self.pool.terminate(timeout)
    }
}

/// Reports exceptions as `tracing` error events.
pub struct TracingReporter;

impl ExceptionReporter for TracingReporter {
    fn report(&self, report: &ExceptionReport) -> anyhow::Result<()> {
        error!(
            message = %report.message,
            chain = ?report.chain,
            interaction_id = report.interaction_id.as_deref(),
            "exception reported"
        );
        Ok(())
    }
}
