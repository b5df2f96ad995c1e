pub mod config;
pub mod error;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod source;

pub use error::{AppError, FetchError, Result};
pub use pipeline::{Pipeline, RunMode, RunReport, RunStatus, RunSummary, TaskOutcome};
pub use sink::FileSink;
pub use source::{Document, DocumentSource, TopicId};
