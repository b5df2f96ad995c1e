use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::AbortHandle;

use crate::error::FetchError;
use crate::sink::FileSink;
use crate::source::{DocumentSource, TopicId};

/// What happened to one topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        title: String,
        reference_count: usize,
    },
    SkippedAmbiguous {
        topic: TopicId,
        option_count: usize,
    },
    SkippedNotFound {
        topic: TopicId,
    },
    SkippedOther {
        topic: TopicId,
        message: String,
    },
}

impl TaskOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskOutcome::Success { .. } => "success",
            TaskOutcome::SkippedAmbiguous { .. } => "skipped_ambiguous",
            TaskOutcome::SkippedNotFound { .. } => "skipped_not_found",
            TaskOutcome::SkippedOther { .. } => "skipped_other",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TaskOutcome::Success {
                title,
                reference_count,
            } => format!("Saved {reference_count} references for {title}"),
            TaskOutcome::SkippedAmbiguous {
                topic,
                option_count,
            } => format!("Skipped ambiguous topic {topic} ({option_count} options)"),
            TaskOutcome::SkippedNotFound { topic } => format!("Skipped missing topic {topic}"),
            TaskOutcome::SkippedOther { topic, message } => {
                format!("Skipped {topic}: {message}")
            }
        }
    }
}

/// Everything a task needs, shared by all tasks of a run.
pub struct TaskContext {
    pub source: Arc<dyn DocumentSource>,
    pub sink: Arc<FileSink>,
    pub fetch_timeout: Option<Duration>,
}

/// Fetch one topic and persist its references.
///
/// Never fails: every error path ends in a skipped outcome.
pub async fn execute(ctx: &TaskContext, topic: &TopicId) -> TaskOutcome {
    let fetched = match ctx.fetch_timeout {
        Some(limit) => match tokio::time::timeout(limit, ctx.source.fetch(topic)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Other(format!(
                "fetch timed out after {}s",
                limit.as_secs_f64()
            ))),
        },
        None => ctx.source.fetch(topic).await,
    };

    let document = match fetched {
        Ok(document) => document,
        Err(FetchError::Ambiguous { option_count }) => {
            return TaskOutcome::SkippedAmbiguous {
                topic: topic.clone(),
                option_count,
            }
        }
        Err(FetchError::NotFound) => {
            return TaskOutcome::SkippedNotFound {
                topic: topic.clone(),
            }
        }
        Err(FetchError::Other(message)) => {
            return TaskOutcome::SkippedOther {
                topic: topic.clone(),
                message,
            }
        }
    };

    match ctx.sink.write(&document.title, &document.references).await {
        Ok(_) => TaskOutcome::Success {
            reference_count: document.references.len(),
            title: document.title,
        },
        Err(e) => TaskOutcome::SkippedOther {
            topic: topic.clone(),
            message: e.to_string(),
        },
    }
}

/// Run [`execute`] on its own tokio task so a panic inside a source or the
/// sink is reported as `SkippedOther` instead of taking the runner down.
///
/// The spawned task is aborted if this future is dropped before it finishes.
pub async fn execute_isolated(ctx: Arc<TaskContext>, topic: TopicId) -> TaskOutcome {
    let task_topic = topic.clone();
    let handle = tokio::spawn(async move { execute(&ctx, &task_topic).await });
    let _guard = AbortOnDrop(handle.abort_handle());

    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(topic = %topic, error = %e, "Task panicked");
            TaskOutcome::SkippedOther {
                topic,
                message: format!("task failed: {e}"),
            }
        }
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
