//! kb-ingest main entry point
//!
//! This is the command-line interface for the knowledge base ingestion service.

use anyhow::{bail, Context};
use clap::Parser;
use kb_ingest::config::{load_config, Config};
use kb_ingest::output::{export_markdown, load_statistics, print_statistics};
use kb_ingest::pipeline::{PdfRequest, PipelineOutcome, UrlRequest};
use kb_ingest::storage::{self, SqliteStorage};
use kb_ingest::{Pipeline, ProgressEvent};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// kb-ingest: turn URLs and PDFs into knowledge base items
///
/// By default the HTTP API is served. The other modes run a single
/// operation against the configured database and exit.
#[derive(Parser, Debug)]
#[command(name = "kb-ingest")]
#[command(version)]
#[command(about = "Knowledge base ingestion service", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and exit
    #[arg(long, conflicts_with_all = ["stats", "export", "extract", "pdf"])]
    check_config: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["export", "extract", "pdf"])]
    stats: bool,

    /// Export the knowledge base as markdown to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["extract", "pdf"])]
    export: Option<PathBuf>,

    /// Ingest a single URL and exit
    #[arg(long, value_name = "URL", requires = "team", conflicts_with = "pdf")]
    extract: Option<String>,

    /// Ingest a single PDF file and exit
    #[arg(long, value_name = "FILE", requires = "team")]
    pdf: Option<PathBuf>,

    /// Team the operation belongs to (filters --stats and --export)
    #[arg(long, value_name = "TEAM")]
    team: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    if cli.check_config {
        handle_check_config(&config);
    } else if cli.stats {
        handle_stats(&config, cli.team.as_deref())?;
    } else if let Some(path) = &cli.export {
        handle_export(&config, cli.team.as_deref(), path)?;
    } else if let Some(url) = cli.extract {
        let team_id = cli.team.unwrap_or_default();
        handle_extract(&config, UrlRequest { url, team_id }).await?;
    } else if let Some(path) = &cli.pdf {
        handle_pdf(&config, cli.team.unwrap_or_default(), path).await?;
    } else {
        handle_serve(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kb_ingest=info,tower_http=info,warn"),
            1 => EnvFilter::new("kb_ingest=debug,tower_http=debug,info"),
            2 => EnvFilter::new("kb_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    storage::open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

fn build_pipeline(config: &Config) -> anyhow::Result<Arc<Pipeline>> {
    let storage = Arc::new(Mutex::new(open_storage(config)?));
    Ok(Arc::new(Pipeline::new(config, storage)?))
}

/// Handles the --check-config mode: prints the effective configuration
fn handle_check_config(config: &Config) {
    println!("=== kb-ingest Configuration ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_address);
    println!("  Max upload: {} bytes", config.server.max_upload_bytes);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nExtraction:");
    println!("  Freshness window: {} days", config.extraction.freshness_days);
    println!("  Step delay: {}ms", config.extraction.step_delay_ms);
    println!("  Fetch pages: {}", config.extraction.fetch_pages);
    println!("  User agent: {}", config.extraction.user_agent);
    println!("  Max page size: {} bytes", config.extraction.max_page_bytes);

    println!("\nEnhancer:");
    println!("  Enabled: {}", config.enhancer.enabled);
    println!("  API base: {}", config.enhancer.api_base);
    println!("  Model: {}", config.enhancer.model);
    let key_state = if config.enhancer.api_key().is_some() {
        "set"
    } else {
        "not set, heuristics only"
    };
    println!("  API key ({}): {}", config.enhancer.api_key_env, key_state);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, team: Option<&str>) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage, team)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes the knowledge base as markdown
fn handle_export(config: &Config, team: Option<&str>, path: &Path) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    tracing::info!("Exporting knowledge base to {}", path.display());
    let count = export_markdown(&storage, team, path)?;

    println!("✓ Exported {} item(s) to: {}", count, path.display());
    Ok(())
}

/// Handles the --extract mode: ingests one URL, printing progress
async fn handle_extract(config: &Config, request: UrlRequest) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let (tx, rx) = mpsc::channel(32);

    let printer = tokio::spawn(print_events(rx));
    let outcome = pipeline.run_url(request, tx).await;
    printer.await?;

    report_outcome(outcome)
}

/// Handles the --pdf mode: ingests one PDF file, printing progress
async fn handle_pdf(config: &Config, team_id: String, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let pipeline = build_pipeline(config)?;
    let (tx, rx) = mpsc::channel(32);

    let printer = tokio::spawn(print_events(rx));
    let request = PdfRequest {
        team_id,
        filename,
        bytes,
    };
    let outcome = pipeline.run_pdf(request, tx).await;
    printer.await?;

    report_outcome(outcome)
}

async fn print_events(mut rx: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        if let ProgressEvent::Progress {
            progress, message, ..
        } = event
        {
            println!("[{:>3}%] {}", progress, message);
        }
    }
}

fn report_outcome(outcome: PipelineOutcome) -> anyhow::Result<()> {
    match outcome {
        PipelineOutcome::Completed {
            job_id,
            items,
            cached,
        } => {
            if cached {
                println!("\n✓ Reused recent job {} ({} item(s))", job_id, items.len());
            } else {
                println!("\n✓ Job {} completed ({} item(s))", job_id, items.len());
            }
            for item in &items {
                println!(
                    "  - {} [{}; {} words; {} min; {}]",
                    item.title,
                    item.content_kind,
                    item.word_count,
                    item.read_time_minutes,
                    item.topics.join(", ")
                );
            }
            Ok(())
        }
        PipelineOutcome::Failed { job_id, message } => match job_id {
            Some(job_id) => bail!("Job {} failed: {}", job_id, message),
            None => bail!("Request rejected: {}", message),
        },
    }
}

/// Handles the default mode: serves the HTTP API
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;

    if pipeline.ai_enabled() {
        tracing::info!("AI enhancement enabled (model {})", config.enhancer.model);
    } else {
        tracing::info!("AI enhancement unavailable, using heuristics");
    }

    kb_ingest::server::serve(config, pipeline).await?;
    Ok(())
}
