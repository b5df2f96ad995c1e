use super::report::{RunMode, RunReport};
use super::task::TaskOutcome;
use crate::source::TopicId;

/// Progress side channel for a run.
///
/// Calls are informational only and never influence the returned report.
/// In concurrent mode `on_outcome` fires in completion order.
pub trait ProgressObserver: Send + Sync {
    fn on_discovered(&self, _mode: RunMode, _topics: &[TopicId]) {}

    fn on_outcome(&self, mode: RunMode, topic: &TopicId, outcome: &TaskOutcome);

    fn on_finished(&self, _report: &RunReport) {}
}

/// Emits one structured `tracing` event per task and per run.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_discovered(&self, mode: RunMode, topics: &[TopicId]) {
        tracing::info!(mode = %mode, count = topics.len(), "Topics discovered");
    }

    fn on_outcome(&self, mode: RunMode, topic: &TopicId, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Success {
                title,
                reference_count,
            } => tracing::info!(
                mode = %mode,
                topic = %topic,
                outcome = outcome.kind(),
                title = %title,
                references = reference_count,
                "Saved references"
            ),
            TaskOutcome::SkippedAmbiguous { option_count, .. } => tracing::warn!(
                mode = %mode,
                topic = %topic,
                outcome = outcome.kind(),
                options = option_count,
                "Skipped ambiguous topic"
            ),
            TaskOutcome::SkippedNotFound { .. } => tracing::warn!(
                mode = %mode,
                topic = %topic,
                outcome = outcome.kind(),
                "Skipped missing topic"
            ),
            TaskOutcome::SkippedOther { message, .. } => tracing::warn!(
                mode = %mode,
                topic = %topic,
                outcome = outcome.kind(),
                error = %message,
                "Skipped topic after unexpected failure"
            ),
        }
    }

    fn on_finished(&self, report: &RunReport) {
        let summary = report.summary();
        tracing::info!(
            mode = %summary.mode,
            status = ?summary.status,
            elapsed_ms = summary.elapsed_ms,
            total = summary.total,
            succeeded = summary.succeeded,
            ambiguous = summary.ambiguous,
            not_found = summary.not_found,
            other = summary.other,
            not_started = summary.not_started,
            "Run finished in {:.2} seconds",
            report.elapsed().as_secs_f64()
        );
    }
}
