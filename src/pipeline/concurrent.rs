use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::observer::ProgressObserver;
use super::report::RunMode;
use super::task::{self, TaskContext, TaskOutcome};
use crate::source::TopicId;

/// A topic together with its position in discovery order.
struct Job {
    index: usize,
    topic: TopicId,
}

struct Finished {
    index: usize,
    topic: TopicId,
    outcome: TaskOutcome,
}

/// Run topics on a fixed pool of `max_workers` workers.
///
/// Jobs fan out through a bounded queue, outcomes fan back in over a channel
/// and land in a slot per discovery index, so the returned outcomes are in
/// discovery order no matter how the tasks interleave. On cancellation no new
/// task starts, in-flight tasks finish, and unstarted topics are returned
/// separately.
pub(crate) async fn run(
    ctx: Arc<TaskContext>,
    observer: &dyn ProgressObserver,
    topics: Vec<TopicId>,
    max_workers: usize,
    cancel: CancellationToken,
) -> (Vec<TaskOutcome>, Vec<TopicId>) {
    let total = topics.len();
    let worker_count = max_workers.min(total);

    let (job_tx, job_rx) = mpsc::channel::<Job>(worker_count.max(1));
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();

    let mut workers = JoinSet::new();
    for worker_id in 0..worker_count {
        workers.spawn(worker_loop(
            worker_id,
            Arc::clone(&ctx),
            Arc::clone(&job_rx),
            done_tx.clone(),
            cancel.clone(),
        ));
    }
    // Workers hold the only senders now; the collector ends when they all exit.
    drop(done_tx);

    tracing::debug!(workers = worker_count, topics = total, "Worker pool started");

    let dispatch = {
        let topics = &topics;
        let cancel = &cancel;
        async move {
            for (index, topic) in topics.iter().enumerate() {
                let job = Job {
                    index,
                    topic: topic.clone(),
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = job_tx.send(job) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            // job_tx is dropped here, which lets idle workers exit.
        }
    };

    let collect = async {
        let mut slots: Vec<Option<TaskOutcome>> = vec![None; total];
        while let Some(done) = done_rx.recv().await {
            observer.on_outcome(RunMode::Concurrent, &done.topic, &done.outcome);
            slots[done.index] = Some(done.outcome);
        }
        slots
    };

    let ((), slots) = tokio::join!(dispatch, collect);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Worker exited abnormally");
        }
    }

    let cancelled = cancel.is_cancelled();
    let mut outcomes = Vec::with_capacity(total);
    let mut not_started = Vec::new();
    for (slot, topic) in slots.into_iter().zip(topics) {
        match slot {
            Some(outcome) => outcomes.push(outcome),
            None if cancelled => not_started.push(topic),
            None => outcomes.push(TaskOutcome::SkippedOther {
                topic,
                message: "worker exited before reporting an outcome".to_string(),
            }),
        }
    }

    if !not_started.is_empty() {
        tracing::info!(
            remaining = not_started.len(),
            "Concurrent run cancelled, skipping remaining topics"
        );
    }

    (outcomes, not_started)
}

async fn worker_loop(
    worker_id: usize,
    ctx: Arc<TaskContext>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    done: mpsc::UnboundedSender<Finished>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            match rx.recv().await {
                // Decided under the lock: once one job is left unstarted,
                // every job received after it is too.
                Some(_) if cancel.is_cancelled() => continue,
                job => job,
            }
        };
        let Some(Job { index, topic }) = job else {
            break;
        };

        tracing::debug!(worker = worker_id, topic = %topic, "Starting task");
        let outcome = task::execute_isolated(Arc::clone(&ctx), topic.clone()).await;

        if done
            .send(Finished {
                index,
                topic,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
    tracing::debug!(worker = worker_id, "Worker finished");
}
