use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::task::TaskOutcome;
use crate::source::TopicId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sequential,
    Concurrent,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Sequential => f.write_str("sequential"),
            RunMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every discovered topic has an outcome.
    Completed,
    /// Stopped early; some topics were never started.
    Cancelled,
}

/// Result of one pipeline run. Outcomes are in discovery order.
#[derive(Debug, Clone)]
pub struct RunReport {
    mode: RunMode,
    status: RunStatus,
    started_at: DateTime<Utc>,
    elapsed: Duration,
    outcomes: Vec<TaskOutcome>,
    not_started: Vec<TopicId>,
}

impl RunReport {
    pub(crate) fn new(
        mode: RunMode,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        outcomes: Vec<TaskOutcome>,
        not_started: Vec<TopicId>,
    ) -> Self {
        let status = if not_started.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Cancelled
        };
        Self {
            mode,
            status,
            started_at,
            elapsed,
            outcomes,
            not_started,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    pub fn not_started(&self) -> &[TopicId] {
        &self.not_started
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            mode: self.mode,
            status: self.status,
            started_at: self.started_at,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            total: self.outcomes.len() + self.not_started.len(),
            succeeded: 0,
            ambiguous: 0,
            not_found: 0,
            other: 0,
            not_started: self.not_started.len(),
        };
        for outcome in &self.outcomes {
            match outcome {
                TaskOutcome::Success { .. } => summary.succeeded += 1,
                TaskOutcome::SkippedAmbiguous { .. } => summary.ambiguous += 1,
                TaskOutcome::SkippedNotFound { .. } => summary.not_found += 1,
                TaskOutcome::SkippedOther { .. } => summary.other += 1,
            }
        }
        summary
    }
}

/// Per-kind counts of a run, suitable for logging or printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total: usize,
    pub succeeded: usize,
    pub ambiguous: usize,
    pub not_found: usize,
    pub other: usize,
    pub not_started: usize,
}
