//! # multi_source_ingest
//!
//! Command-line driver for the ingestion pipeline. Loads `.env`, sets up
//! tracing, resolves the configuration once and dispatches to the library.
//!
//! ## Usage
//!
//! ```sh
//! multi_source_ingest --config ingest.yaml all
//! multi_source_ingest web https://example.com/story
//! multi_source_ingest list --limit 20
//! ```

use clap::Parser;
use multi_source_ingest::cli::{Cli, Command, watch_interval};
use multi_source_ingest::pipeline::{self, ALL_SOURCES, RunSummary};
use multi_source_ingest::utils::{ensure_writable_dir, truncate_chars};
use multi_source_ingest::{IngestConfig, SourceKind, Store};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Must run before Cli::parse so env-backed flags see .env values
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(command = ?args.command, "Parsed CLI arguments");

    let config = args.resolve_config()?;
    let store = Store::new(&config.store_path);
    info!(store = %store.path().display(), "Using store");

    if writes_store(&args.command) {
        if let Some(dir) = store.path().parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = ensure_writable_dir(dir) {
                error!(
                    path = %dir.display(),
                    error = %e,
                    "Store directory is not writable (fix perms or choose a different path)"
                );
                return Err(e.into());
            }
        }
    }

    match args.command {
        Command::Api { .. } => run_once(&config, &store, &[SourceKind::Newsapi]).await?,
        Command::Csv { .. } => run_once(&config, &store, &[SourceKind::Csv]).await?,
        Command::Web { .. } => run_once(&config, &store, &[SourceKind::Web]).await?,
        Command::All => run_once(&config, &store, &ALL_SOURCES).await?,
        Command::Watch { interval_minutes } => {
            watch(&config, &store, watch_interval(interval_minutes)).await?
        }
        Command::List { limit } => list(&store, limit),
        Command::Clear => {
            store.clear()?;
            println!("Store cleared");
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), millis = elapsed.subsec_millis(), "Execution complete");
    Ok(())
}

fn writes_store(command: &Command) -> bool {
    !matches!(command, Command::List { .. })
}

async fn run_once(
    config: &IngestConfig,
    store: &Store,
    sources: &[SourceKind],
) -> Result<(), Box<dyn Error>> {
    let summary = pipeline::run_sources(config, store, sources).await?;
    print_summary(&summary);
    Ok(())
}

/// Run every source, wait, repeat. Ctrl-C stops the loop at the next await
/// point; store writes have none, so the file is always complete.
#[instrument(level = "info", skip(config, store))]
async fn watch(
    config: &IngestConfig,
    store: &Store,
    interval: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut run = 0u64;
    loop {
        run += 1;
        println!("\n=== Auto Run #{run} ===");
        tokio::select! {
            summary = pipeline::run_sources(config, store, &ALL_SOURCES) => print_summary(&summary?),
            _ = tokio::signal::ctrl_c() => break,
        }

        println!("Next run in {} minute(s)...", interval.as_secs() / 60);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nAuto loop stopped");
    println!("Total records collected: {}", store.len());
    info!(runs = run, "Watch loop stopped");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nResults Summary:");
    for report in &summary.reports {
        println!("  {report}");
    }
    println!("Total records in store: {}", summary.final_total);
    println!("New records added: {}", summary.added());
}

fn list(store: &Store, limit: usize) {
    let records = store.records();
    println!("\nTotal records: {}\n", records.len());
    for (i, record) in records.iter().take(limit).enumerate() {
        let title = if record.title.is_empty() {
            "No title"
        } else {
            record.title.as_str()
        };
        println!("{}. [{}] {}", i + 1, record.source, truncate_chars(title, 60));
    }
    if records.len() > limit {
        println!("... and {} more", records.len() - limit);
    }
}
