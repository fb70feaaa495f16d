//! Source adapters, one per medium.
//!
//! Each adapter turns its input into raw records and keeps its own failures
//! to itself: the pipeline only ever sees a (possibly empty) list.
//!
//! # Supported Sources
//!
//! | Source | Module | Input | Failure handling |
//! |--------|--------|-------|------------------|
//! | NewsAPI | [`api`] | API key + listings | retried with backoff, then empty |
//! | CSV | [`csv`] | files or directories | per file, siblings keep going |
//! | Web | [`web`] | list of URLs | per URL, batch keeps going |

pub mod api;
pub mod csv;
pub mod web;
