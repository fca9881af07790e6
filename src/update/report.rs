// ABOUTME: Outcome of one update cycle, including isolated per-container failures.
// ABOUTME: Failures are logged as they are recorded and never abort the cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What an update cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Containers that passed the eligibility filter.
    pub scanned: usize,
    /// Containers flagged stale, in dependency order.
    pub stale: Vec<String>,
    /// Of those, how many were only stale through a dependency.
    pub propagated: usize,
    pub stopped: Vec<String>,
    pub started: Vec<String>,
    pub images_removed: Vec<String>,
    failures: Vec<Failure>,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            scanned: 0,
            stale: Vec::new(),
            propagated: 0,
            stopped: Vec::new(),
            started: Vec::new(),
            images_removed: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record a failure, logging it via tracing.
    pub fn record_failure(&mut self, failure: Failure) {
        tracing::error!(
            container = %failure.container,
            kind = %failure.kind,
            "{}",
            failure.message
        );
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One-line summary for logs and terminal output.
    pub fn summary(&self) -> String {
        format!(
            "{} scanned, {} stale, {} restarted, {} failed",
            self.scanned,
            self.stale.len(),
            self.started.len(),
            self.failures.len()
        )
    }
}

/// A container operation that failed without stopping the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub container: String,
    pub message: String,
}

impl Failure {
    pub fn stop(container: &str, error: impl fmt::Display) -> Self {
        Self::new(FailureKind::Stop, container, error)
    }

    pub fn start(container: &str, error: impl fmt::Display) -> Self {
        Self::new(FailureKind::Start, container, error)
    }

    pub fn remove_image(container: &str, error: impl fmt::Display) -> Self {
        Self::new(FailureKind::RemoveImage, container, error)
    }

    fn new(kind: FailureKind, container: &str, error: impl fmt::Display) -> Self {
        Self {
            kind,
            container: container.to_string(),
            message: format!("failed to {} {}: {}", kind, container, error),
        }
    }
}

/// Which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Stop,
    Start,
    RemoveImage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Stop => write!(f, "stop"),
            FailureKind::Start => write!(f, "start"),
            FailureKind::RemoveImage => write!(f, "remove image of"),
        }
    }
}
