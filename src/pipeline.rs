//! Ingestion driver: adapters → normalizer → store.
//!
//! Sources run one after another, never concurrently. Each source is fetched
//! in full, normalized with a single `fetched_at` stamp and merged into the
//! store in one read-merge-write cycle. A source that yields nothing leaves
//! the store untouched.

use crate::config::{ApiConfig, CsvConfig, IngestConfig, WebConfig};
use crate::models::{RawRecord, SourceKind};
use crate::normalize::normalize_all;
use crate::sources::{api, csv, web};
use crate::store::{MergeOutcome, Store, StoreError};
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// What one source contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: SourceKind,
    /// Raw records the adapter produced.
    pub fetched: usize,
    /// Inputs (files, URLs) that failed and contributed nothing.
    pub failures: usize,
    /// `None` when there was nothing to merge.
    pub merge: Option<MergeOutcome>,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.merge.is_some()
    }

    pub fn added(&self) -> usize {
        self.merge.map(|m| m.added).unwrap_or(0)
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.succeeded() { "✓" } else { "✗" };
        write!(
            f,
            "{mark} {}: fetched {}, added {}",
            self.source,
            self.fetched,
            self.added()
        )?;
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        Ok(())
    }
}

/// Reports of a multi-source run plus the store size before and after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
    pub initial_total: usize,
    pub final_total: usize,
}

impl RunSummary {
    pub fn added(&self) -> usize {
        self.reports.iter().map(SourceReport::added).sum()
    }
}

/// Raw records from every configured API listing, in listing order.
pub async fn collect_api(config: &ApiConfig) -> Vec<RawRecord> {
    api::fetch_listings(config)
        .await
        .into_iter()
        .map(RawRecord::Api)
        .collect()
}

/// Raw records from every configured CSV path.
///
/// Returns the rows and the number of paths that yielded nothing.
pub fn collect_csv(config: &CsvConfig) -> (Vec<RawRecord>, usize) {
    if config.paths.is_empty() {
        warn!("No CSV paths configured; skipping CSV");
        return (Vec::new(), 0);
    }

    let mut rows = Vec::new();
    let mut failures = 0;
    for path in &config.paths {
        if !path.exists() {
            warn!(path = %path.display(), "CSV path does not exist; skipping");
            failures += 1;
            continue;
        }
        let found = csv::read_path(path, &config.required_columns);
        if found.is_empty() {
            failures += 1;
        }
        rows.extend(found.into_iter().map(RawRecord::Csv));
    }
    (rows, failures)
}

/// Raw records from every configured URL that could be scraped.
///
/// Returns the pages and the number of URLs that were rejected or failed.
pub async fn collect_web(config: &WebConfig) -> (Vec<RawRecord>, usize) {
    let (targets, rejected) = web::parse_targets(&config.urls);
    if targets.is_empty() {
        warn!("No valid URLs configured; skipping web");
        return (Vec::new(), rejected.len());
    }

    let outcomes = web::scrape(config, &targets).await;
    let mut failures = rejected.len();
    let mut pages = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(page) => pages.push(RawRecord::Web(page)),
            Err(_) => failures += 1,
        }
    }
    (pages, failures)
}

/// Fetch, normalize and merge a single source.
#[instrument(level = "info", skip(config, store))]
pub async fn ingest(
    config: &IngestConfig,
    store: &Store,
    source: SourceKind,
) -> Result<SourceReport, StoreError> {
    let t0 = Instant::now();
    let (raws, failures) = match source {
        SourceKind::Newsapi => (collect_api(&config.api).await, 0),
        SourceKind::Csv => collect_csv(&config.csv),
        SourceKind::Web => collect_web(&config.web).await,
    };
    let fetched = raws.len();

    let merge = if raws.is_empty() {
        warn!("Source produced no records; nothing to merge");
        None
    } else {
        Some(store.merge(normalize_all(raws))?)
    };

    info!(
        fetched,
        failures,
        added = merge.map(|m| m.added).unwrap_or(0),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Source ingested"
    );
    Ok(SourceReport {
        source,
        fetched,
        failures,
        merge,
    })
}

/// Run the given sources in order against one store.
#[instrument(level = "info", skip(config, store))]
pub async fn run_sources(
    config: &IngestConfig,
    store: &Store,
    sources: &[SourceKind],
) -> Result<RunSummary, StoreError> {
    let initial_total = store.len();
    info!(initial_total, "Starting ingestion run");

    let mut reports = Vec::with_capacity(sources.len());
    for &source in sources {
        reports.push(ingest(config, store, source).await?);
    }

    let final_total = store.len();
    let summary = RunSummary {
        reports,
        initial_total,
        final_total,
    };
    info!(
        final_total,
        added = summary.added(),
        "Ingestion run complete"
    );
    Ok(summary)
}

/// Every source, in the order API, CSV, web.
pub const ALL_SOURCES: [SourceKind; 3] = [SourceKind::Newsapi, SourceKind::Csv, SourceKind::Web];
