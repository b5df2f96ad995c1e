#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use refharvest::pipeline::ProgressObserver;
use refharvest::{
    AppError, Document, DocumentSource, FetchError, RunMode, RunReport, TaskOutcome, TopicId,
};

/// What the scripted source answers for one topic.
#[derive(Clone)]
pub enum Reply {
    Page(Document),
    Fail(FetchError),
    Panic,
}

/// Deterministic in-memory source that records how it is called.
pub struct ScriptedSource {
    search: Result<Vec<TopicId>, String>,
    replies: HashMap<TopicId, Reply>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches: AtomicUsize,
    searches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(topics: &[&str]) -> Self {
        Self {
            search: Ok(topics.iter().map(|t| TopicId::from(*t)).collect()),
            replies: HashMap::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn failing_search(message: &str) -> Self {
        let mut source = Self::new(&[]);
        source.search = Err(message.to_string());
        source
    }

    pub fn page(mut self, topic: &str, title: &str, references: &[&str]) -> Self {
        self.replies.insert(
            TopicId::from(topic),
            Reply::Page(Document {
                title: title.to_string(),
                references: references.iter().map(|r| r.to_string()).collect(),
            }),
        );
        self
    }

    pub fn fail(mut self, topic: &str, error: FetchError) -> Self {
        self.replies.insert(TopicId::from(topic), Reply::Fail(error));
        self
    }

    pub fn panic_on(mut self, topic: &str) -> Self {
        self.replies.insert(TopicId::from(topic), Reply::Panic);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentSource for ScriptedSource {
    async fn search(&self, _query: &str) -> refharvest::Result<Vec<TopicId>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.search.clone().map_err(AppError::Discovery)
    }

    async fn fetch(&self, topic: &TopicId) -> Result<Document, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.replies.get(topic) {
            Some(Reply::Page(doc)) => Ok(doc.clone()),
            Some(Reply::Fail(err)) => Err(err.clone()),
            Some(Reply::Panic) => panic!("scripted panic for {topic}"),
            None => Err(FetchError::NotFound),
        }
    }
}

/// Observer that keeps every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    pub outcomes: Mutex<Vec<(RunMode, TopicId, TaskOutcome)>>,
    pub finished: Mutex<Vec<RunReport>>,
}

impl ProgressObserver for RecordingObserver {
    fn on_outcome(&self, mode: RunMode, topic: &TopicId, outcome: &TaskOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((mode, topic.clone(), outcome.clone()));
    }

    fn on_finished(&self, report: &RunReport) {
        self.finished.lock().unwrap().push(report.clone());
    }
}

pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn shared(source: ScriptedSource) -> Arc<ScriptedSource> {
    Arc::new(source)
}
