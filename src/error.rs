use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Topic discovery failed: {0}")]
    Discovery(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Why a single topic could not be fetched.
///
/// This is the closed set of failures a [`DocumentSource`](crate::source::DocumentSource)
/// may report. Anything a source cannot classify goes into `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("ambiguous title with {option_count} candidate pages")]
    Ambiguous { option_count: usize },

    #[error("page not found")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Other(format!("malformed response: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
