use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::observer::ProgressObserver;
use super::report::RunMode;
use super::task::{self, TaskContext, TaskOutcome};
use crate::source::TopicId;

/// Run every topic one after another, in discovery order.
///
/// Task N's file write and progress event both happen before task N+1 starts.
/// Once `cancel` fires, the remaining topics are returned as not started.
pub(crate) async fn run(
    ctx: Arc<TaskContext>,
    observer: &dyn ProgressObserver,
    topics: Vec<TopicId>,
    cancel: &CancellationToken,
) -> (Vec<TaskOutcome>, Vec<TopicId>) {
    let mut outcomes = Vec::with_capacity(topics.len());
    let mut pending = topics.into_iter();

    while !cancel.is_cancelled() {
        let Some(topic) = pending.next() else {
            break;
        };
        let outcome = task::execute_isolated(Arc::clone(&ctx), topic.clone()).await;
        observer.on_outcome(RunMode::Sequential, &topic, &outcome);
        outcomes.push(outcome);
    }

    let not_started: Vec<TopicId> = pending.collect();
    if !not_started.is_empty() {
        tracing::info!(
            remaining = not_started.len(),
            "Sequential run cancelled, skipping remaining topics"
        );
    }

    (outcomes, not_started)
}
