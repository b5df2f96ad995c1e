//! Batch retrieval: discover topics for a query, fetch each one, save its
//! references, and report what happened to every topic.
//!
//! Both runners share discovery, the per-topic [`task::execute`] step and the
//! report shape. They differ only in how tasks are scheduled, so for a
//! deterministic source they return the same outcomes in the same order.

pub mod concurrent;
pub mod observer;
pub mod report;
pub mod sequential;
pub mod task;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::{PipelineConfig, DEFAULT_MAX_WORKERS};
use crate::error::{AppError, Result};
use crate::sink::FileSink;
use crate::source::{DocumentSource, TopicId};

pub use observer::{ProgressObserver, TracingObserver};
pub use report::{RunMode, RunReport, RunStatus, RunSummary};
pub use task::TaskOutcome;

pub struct Pipeline {
    source: Arc<dyn DocumentSource>,
    sink: Arc<FileSink>,
    observer: Arc<dyn ProgressObserver>,
    fetch_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn DocumentSource>, sink: FileSink) -> Self {
        Self {
            source,
            sink: Arc::new(sink),
            observer: Arc::new(TracingObserver),
            fetch_timeout: None,
        }
    }

    pub fn from_config(source: Arc<dyn DocumentSource>, config: &PipelineConfig) -> Self {
        let sink = FileSink::new(config.output_dir.clone(), config.extension.clone());
        Self::new(source, sink).with_fetch_timeout(config.task_timeout())
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Fetch and save every topic for `query`, one at a time.
    pub async fn run_sequential(&self, query: &str) -> Result<RunReport> {
        self.run_sequential_with_cancel(query, CancellationToken::new())
            .await
    }

    pub async fn run_sequential_with_cancel(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let topics = self.discover(RunMode::Sequential, query).await?;
        let (outcomes, not_started) =
            sequential::run(self.task_context(), self.observer.as_ref(), topics, &cancel).await;

        Ok(self.finish(RunMode::Sequential, started_at, start, outcomes, not_started))
    }

    /// Fetch and save every topic for `query` on at most `max_workers`
    /// concurrent tasks. Outcomes come back in discovery order.
    pub async fn run_concurrent(&self, query: &str, max_workers: usize) -> Result<RunReport> {
        self.run_concurrent_with_cancel(query, max_workers, CancellationToken::new())
            .await
    }

    /// [`run_concurrent`](Self::run_concurrent) with the default pool size.
    pub async fn run_concurrent_default(&self, query: &str) -> Result<RunReport> {
        self.run_concurrent(query, DEFAULT_MAX_WORKERS).await
    }

    pub async fn run_concurrent_with_cancel(
        &self,
        query: &str,
        max_workers: usize,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        if max_workers == 0 {
            return Err(AppError::InvalidArgument(
                "max_workers must be at least 1".to_string(),
            ));
        }

        let started_at = Utc::now();
        let start = Instant::now();

        let topics = self.discover(RunMode::Concurrent, query).await?;
        let (outcomes, not_started) = concurrent::run(
            self.task_context(),
            self.observer.as_ref(),
            topics,
            max_workers,
            cancel,
        )
        .await;

        Ok(self.finish(RunMode::Concurrent, started_at, start, outcomes, not_started))
    }

    async fn discover(&self, mode: RunMode, query: &str) -> Result<Vec<TopicId>> {
        tracing::info!(mode = %mode, query = query, "Discovering topics");

        let topics = self.source.search(query).await.map_err(|e| {
            tracing::error!(mode = %mode, query = query, error = %e, "Topic discovery failed");
            match e {
                AppError::Discovery(_) => e,
                other => AppError::Discovery(other.to_string()),
            }
        })?;

        self.observer.on_discovered(mode, &topics);
        Ok(topics)
    }

    fn task_context(&self) -> Arc<task::TaskContext> {
        Arc::new(task::TaskContext {
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            fetch_timeout: self.fetch_timeout,
        })
    }

    fn finish(
        &self,
        mode: RunMode,
        started_at: chrono::DateTime<Utc>,
        start: Instant,
        outcomes: Vec<TaskOutcome>,
        not_started: Vec<TopicId>,
    ) -> RunReport {
        let report = RunReport::new(mode, started_at, start.elapsed(), outcomes, not_started);
        self.observer.on_finished(&report);
        report
    }
}
