pub mod rate_limit;
pub mod types;
pub mod wikipedia;

use async_trait::async_trait;

use crate::error::{FetchError, Result};
pub use types::{Document, TopicId};

/// Remote service that turns a query into topics and topics into documents.
///
/// Implementations are shared across worker tasks, so they must be cheap to call
/// concurrently and do any throttling themselves.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Resolve a query into candidate topics, in relevance order.
    ///
    /// An error here means there is nothing to iterate, so callers treat it as fatal.
    async fn search(&self, query: &str) -> Result<Vec<TopicId>>;

    /// Fetch the document for one topic.
    async fn fetch(&self, topic: &TopicId) -> std::result::Result<Document, FetchError>;
}
