use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Characters Windows rejects in file names, plus ASCII control characters.
static FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F\x7F]+"#).expect("valid regex"));

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const FALLBACK_NAME: &str = "untitled";

/// Turn a document title into a name that is legal on common filesystems.
///
/// Each run of forbidden characters becomes a single `_`, then surrounding
/// whitespace is trimmed.
pub fn sanitize_title(title: &str) -> String {
    let replaced = FORBIDDEN.replace_all(title, "_");
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes one reference file per document into a directory.
pub struct FileSink {
    output_dir: PathBuf,
    extension: String,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    /// Where the file for `title` lands.
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", sanitize_title(title), self.extension))
    }

    /// Write `references` one per line to the file for `title`, replacing any
    /// previous content.
    ///
    /// Content goes to a temporary sibling first and is renamed into place, so
    /// the target is either the old file or the complete new one.
    pub async fn write(&self, title: &str, references: &[String]) -> Result<PathBuf> {
        let path = self.path_for(title);
        let temp_path = self.temp_path();

        if let Err(source) = write_lines(&temp_path, references).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(AppError::Sink { path, source });
        }

        if let Err(source) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(AppError::Sink { path, source });
        }

        tracing::debug!(
            path = %path.display(),
            lines = references.len(),
            "Wrote reference file"
        );
        Ok(path)
    }

    /// A sibling temp name that does not grow with the title, so any final
    /// name the filesystem accepts also has a writable temp file.
    fn temp_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.output_dir.join(format!(
            ".{}.{}.{n}.tmp",
            env!("CARGO_PKG_NAME"),
            std::process::id()
        ))
    }
}

async fn write_lines(path: &Path, references: &[String]) -> std::io::Result<()> {
    let mut buf = String::new();
    for reference in references {
        // A reference must stay on its own line.
        buf.push_str(&reference.replace(['\r', '\n'], " "));
        buf.push('\n');
    }

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(buf.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
