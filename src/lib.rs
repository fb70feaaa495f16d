//! # multi_source_ingest
//!
//! Pulls records from a NewsAPI-compatible listing service, local CSV files
//! and arbitrary web pages, normalizes them into one [`models::Record`]
//! shape and appends them to a JSON store, skipping URLs it already holds.
//!
//! ## Architecture
//!
//! 1. **Adapters** ([`sources`]): produce raw records or fail soft
//! 2. **Normalizer** ([`normalize`]): one mapping per raw variant
//! 3. **Aggregator** ([`store`]): URL de-duplication and atomic rewrite
//! 4. **Driver** ([`pipeline`]): runs the adapters in sequence
//!
//! Remote calls in the API adapter go through [`retry::RetryPolicy`].

pub mod cli;
pub mod config;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod sources;
pub mod store;
pub mod utils;

pub use config::IngestConfig;
pub use models::{RawRecord, Record, SourceKind};
pub use store::{MergeOutcome, Store};
