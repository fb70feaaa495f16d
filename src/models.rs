//! Data models shared by the adapters, the normalizer and the store.
//!
//! - [`RawRecord`]: what an adapter hands back, one variant per medium
//! - [`Record`]: the canonical shape every raw record is normalized into
//! - [`SourceKind`]: the fixed set of adapter names a record can come from
//!
//! Raw records keep the adapter's own field names. Only the normalizer
//! decides which of them become canonical fields and which are parked
//! under [`Record::metadata`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// The adapter a canonical record was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Newsapi,
    Csv,
    Web,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Newsapi => "newsapi",
            SourceKind::Csv => "csv",
            SourceKind::Web => "web",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized record as persisted in the store.
///
/// Every field except `source` defaults to empty when missing so that a
/// store written by an older build still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable content hash, see [`crate::normalize::record_id`].
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    /// De-duplication key. Empty means "no identity", such records are never
    /// treated as duplicates.
    #[serde(default)]
    pub url: String,
    pub source: SourceKind,
    #[serde(default)]
    pub published_at: String,
    /// ISO-8601 UTC timestamp set by the normalizer.
    #[serde(default)]
    pub fetched_at: String,
    /// Raw fields with no canonical counterpart.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Which listing an API item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiListing {
    /// Publisher directory (`/sources`).
    Sources,
    /// Article listing (`/top-headlines`).
    Articles,
}

impl ApiListing {
    /// Name of the array field holding the items in the response body.
    pub fn list_field(&self) -> &'static str {
        match self {
            ApiListing::Sources => "sources",
            ApiListing::Articles => "articles",
        }
    }
}

/// One element of an API listing, with the fields exactly as the service
/// returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiItem {
    pub listing: ApiListing,
    pub fields: Map<String, Value>,
}

/// One non-blank data row of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// File the row was read from.
    pub file: PathBuf,
    /// `(column, value)` pairs in header order.
    pub fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Readable text extracted from a successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub status: u16,
}

/// A record as produced by an adapter, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Api(ApiItem),
    Csv(CsvRow),
    Web(WebPage),
}

impl RawRecord {
    pub fn source(&self) -> SourceKind {
        match self {
            RawRecord::Api(_) => SourceKind::Newsapi,
            RawRecord::Csv(_) => SourceKind::Csv,
            RawRecord::Web(_) => SourceKind::Web,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SourceKind::Newsapi).unwrap();
        assert_eq!(json, "\"newsapi\"");
        let kind: SourceKind = serde_json::from_str("\"web\"").unwrap();
        assert_eq!(kind, SourceKind::Web);
    }

    #[test]
    fn test_record_deserialization_fills_missing_fields() {
        let json = r#"{ "url": "https://example.com/a", "source": "csv" }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.url, "https://example.com/a");
        assert_eq!(record.source, SourceKind::Csv);
        assert!(record.title.is_empty());
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_record_rejects_unknown_source() {
        let json = r#"{ "url": "x", "source": "rss" }"#;
        assert!(serde_json::from_str::<Record>(json).is_err());
    }

    #[test]
    fn test_csv_row_get() {
        let row = CsvRow {
            file: PathBuf::from("a.csv"),
            fields: vec![
                ("title".to_string(), "Hello".to_string()),
                ("url".to_string(), "".to_string()),
            ],
        };
        assert_eq!(row.get("title"), Some("Hello"));
        assert_eq!(row.get("url"), Some(""));
        assert_eq!(row.get("author"), None);
    }

    #[test]
    fn test_raw_record_source() {
        let raw = RawRecord::Web(WebPage {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            content: String::new(),
            status: 200,
        });
        assert_eq!(raw.source(), SourceKind::Web);
        assert_eq!(ApiListing::Articles.list_field(), "articles");
    }
}
