//! Mapping of adapter output into the canonical [`Record`] shape.
//!
//! There is one mapping function per [`RawRecord`] variant. Raw fields that
//! have a canonical counterpart are consumed; everything else lands in
//! `metadata` under its original name.

use crate::models::{ApiItem, ApiListing, CsvRow, RawRecord, Record, SourceKind, WebPage};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

/// Hex characters of the SHA-256 digest kept in a record id.
const ID_HASH_LEN: usize = 16;

/// CSV columns with a canonical counterpart (matched case-insensitively).
const CSV_CANONICAL: [&str; 5] = ["title", "content", "author", "url", "published_at"];

/// Current UTC time as ISO-8601 with a `Z` suffix.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize a batch, stamping every record with the same `fetched_at`.
#[instrument(level = "debug", skip_all, fields(count = raws.len()))]
pub fn normalize_all(raws: Vec<RawRecord>) -> Vec<Record> {
    let fetched_at = utc_timestamp();
    raws.into_iter()
        .map(|raw| normalize(raw, &fetched_at))
        .collect()
}

/// Normalize one raw record.
pub fn normalize(raw: RawRecord, fetched_at: &str) -> Record {
    let mut record = match raw {
        RawRecord::Api(item) => from_api(item),
        RawRecord::Csv(row) => from_csv(row),
        RawRecord::Web(page) => from_web(page),
    };
    record.fetched_at = fetched_at.to_string();
    if !record.url.is_empty() {
        record.url = canonical_url(&record.url);
    }
    record.id = record_id(record.source, &record.url, &record.title, &record.content);
    debug!(id = %record.id, url = %record.url, "Normalized record");
    record
}

/// Deterministic id for a record.
///
/// Hashes the canonical URL when there is one, otherwise the
/// `(source, title, content)` tuple with whitespace collapsed.
pub fn record_id(source: SourceKind, url: &str, title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    let url = url.trim();
    if url.is_empty() {
        hasher.update(b"tuple\0");
        hasher.update(source.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(collapse(title).as_bytes());
        hasher.update(b"\0");
        hasher.update(collapse(content).as_bytes());
    } else {
        hasher.update(b"url\0");
        hasher.update(canonical_url(url).as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}", source, &digest[..ID_HASH_LEN])
}

/// Parse and re-serialize a URL so that trivially different spellings
/// (host case, default port, fragment) hash the same.
pub fn canonical_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn empty_record(source: SourceKind) -> Record {
    Record {
        id: String::new(),
        title: String::new(),
        content: String::new(),
        author: String::new(),
        url: String::new(),
        source,
        published_at: String::new(),
        fetched_at: String::new(),
        metadata: Map::new(),
    }
}

/// Text form of a JSON value; `null` is empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn from_api(item: ApiItem) -> Record {
    let mut record = empty_record(SourceKind::Newsapi);
    let mut fields = item.fields;
    let mut take = |key: &str| fields.remove(key).map(|v| value_text(&v)).unwrap_or_default();

    match item.listing {
        ApiListing::Sources => {
            record.title = take("name");
            record.content = take("description");
            record.url = take("url");
        }
        ApiListing::Articles => {
            record.title = take("title");
            record.author = take("author");
            record.url = take("url");
            record.published_at = take("publishedAt");
            record.content = take("content");
            if record.content.is_empty() {
                if let Some(description) = fields.get("description") {
                    record.content = value_text(description);
                }
            }
        }
    }

    record.metadata = fields;
    record
}

fn from_csv(row: CsvRow) -> Record {
    let mut record = empty_record(SourceKind::Csv);
    record.metadata.insert(
        "csv_file".to_string(),
        Value::String(row.file.display().to_string()),
    );

    for (column, value) in row.fields {
        let canonical = CSV_CANONICAL
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&column));
        let value = value.trim().to_string();
        match canonical.copied() {
            Some("title") => record.title = value,
            Some("content") => record.content = value,
            Some("author") => record.author = value,
            Some("url") => record.url = value,
            Some("published_at") => record.published_at = value,
            _ => {
                record.metadata.insert(column, Value::String(value));
            }
        }
    }
    record
}

fn from_web(page: WebPage) -> Record {
    let mut record = empty_record(SourceKind::Web);
    record.title = page.title;
    record.content = page.content;
    record.url = page.url;
    record
        .metadata
        .insert("http_status".to_string(), Value::from(page.status));
    record
}
