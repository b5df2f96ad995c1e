use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Worker-pool size used when nothing else is configured.
pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Minimum gap between two request starts against the API.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Upper bound on a single fetch. Unset means no pipeline-level timeout.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            search_limit: default_search_limit(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            output_dir: default_output_dir(),
            extension: default_extension(),
            task_timeout_secs: None,
        }
    }
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_search_limit() -> u32 {
    10
}

fn default_min_request_interval_ms() -> u64 {
    50
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "txt".to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("refharvest").required(false));
        }

        // Environment variable overrides with REFHARVEST_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("REFHARVEST")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_workers == 0 {
            return Err(AppError::Config(
                "pipeline.max_workers must be at least 1".to_string(),
            ));
        }
        if self.pipeline.extension.is_empty() || self.pipeline.extension.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "pipeline.extension is not a valid file extension: {:?}",
                self.pipeline.extension
            )));
        }
        if self.source.search_limit == 0 {
            return Err(AppError::Config(
                "source.search_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

impl PipelineConfig {
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}
