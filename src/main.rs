use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use refharvest::config::AppConfig;
use refharvest::shutdown::cancel_on_shutdown;
use refharvest::source::wikipedia::WikipediaSource;
use refharvest::{Pipeline, RunReport, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sequential,
    Concurrent,
    Both,
}

#[derive(Parser)]
#[command(name = "refharvest", about = "Save the external references of every page matching a search")]
struct Cli {
    /// Search query used to discover pages
    #[arg(default_value = "generative artificial intelligence")]
    query: String,

    /// Which runner(s) to use
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Worker-pool size for the concurrent runner
    #[arg(short, long)]
    workers: Option<usize>,

    /// Directory the reference files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Print run summaries as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.pipeline.max_workers = workers;
    }
    if let Some(dir) = cli.output_dir {
        config.pipeline.output_dir = dir;
    }
    config.validate()?;

    tokio::fs::create_dir_all(&config.pipeline.output_dir).await?;

    tracing::info!(
        query = %cli.query,
        mode = ?cli.mode,
        max_workers = config.pipeline.max_workers,
        output_dir = %config.pipeline.output_dir.display(),
        api = %config.source.api_url,
        "Starting refharvest"
    );

    let source = Arc::new(WikipediaSource::new(&config.source)?);
    let pipeline = Pipeline::from_config(source, &config.pipeline);

    let cancel = CancellationToken::new();
    let listener = cancel_on_shutdown(cancel.clone());

    let mut reports = Vec::new();
    if matches!(cli.mode, Mode::Sequential | Mode::Both) {
        let report = pipeline
            .run_sequential_with_cancel(&cli.query, cancel.clone())
            .await?;
        reports.push(report);
    }
    if matches!(cli.mode, Mode::Concurrent | Mode::Both) && !cancel.is_cancelled() {
        let report = pipeline
            .run_concurrent_with_cancel(&cli.query, config.pipeline.max_workers, cancel.clone())
            .await?;
        reports.push(report);
    }

    listener.abort();

    for report in &reports {
        print_report(report, cli.json)?;
    }

    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    let summary = report.summary();
    if json {
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!(
        "[{}] {} topics in {:.2}s: {} saved, {} ambiguous, {} not found, {} failed",
        summary.mode,
        summary.total,
        report.elapsed().as_secs_f64(),
        summary.succeeded,
        summary.ambiguous,
        summary.not_found,
        summary.other,
    );
    if report.status() == RunStatus::Cancelled {
        println!(
            "[{}] cancelled, {} topics not started",
            summary.mode, summary.not_started
        );
    }
    for outcome in report.outcomes() {
        println!("[{}]   {}", summary.mode, outcome.describe());
    }
    Ok(())
}
