//! CSV file adapter.
//!
//! [`read_file`] parses one delimited file with a header row into
//! [`CsvRow`]s and reports each way a file can be unusable as its own
//! [`CsvError`] variant. [`read_path`] is the soft-failing boundary used by
//! the pipeline: it accepts a file or a directory, logs failures and keeps
//! going.
//!
//! # Encodings
//!
//! The raw bytes are decoded with the first candidate of [`CANDIDATES`] that
//! accepts them:
//!
//! | Encoding | Accepted when |
//! |----------|---------------|
//! | UTF-8 | bytes are valid UTF-8 (a BOM is stripped) |
//! | UTF-16 | the file starts with a UTF-16 LE/BE BOM |
//! | Windows-1252 | no byte is one of the five the code page leaves undefined |
//! | ISO-8859-1 | always |

use crate::models::CsvRow;
use crate::utils::is_blank;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV file is empty: {0}")]
    Empty(PathBuf),
    #[error("failed to decode {0} with any known encoding")]
    Undecodable(PathBuf),
    #[error("CSV file has no header row: {0}")]
    MissingHeader(PathBuf),
    #[error("missing required columns {missing:?} in {path}")]
    MissingColumns { path: PathBuf, missing: Vec<String> },
    #[error("malformed CSV in {path}: {source}")]
    Parse { path: PathBuf, source: ::csv::Error },
    #[error("CSV contains no valid data rows: {0}")]
    NoDataRows(PathBuf),
}

/// Text encodings tried, in order, when decoding a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16,
    Windows1252,
    Latin1,
}

pub const CANDIDATES: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Utf16,
    TextEncoding::Windows1252,
    TextEncoding::Latin1,
];

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }

    /// Decode `bytes`, or `None` if they are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                strict_decode(UTF_8, body)
            }
            TextEncoding::Utf16 => match Encoding::for_bom(bytes) {
                Some((encoding, bom_len)) if encoding == UTF_16LE || encoding == UTF_16BE => {
                    strict_decode(encoding, &bytes[bom_len..])
                }
                _ => None,
            },
            TextEncoding::Windows1252 => {
                // encoding_rs maps these to C1 controls instead of rejecting them.
                if bytes.iter().any(|b| UNDEFINED_1252.contains(b)) {
                    return None;
                }
                strict_decode(WINDOWS_1252, bytes)
            }
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Bytes with no assigned character in the Windows-1252 code page.
const UNDEFINED_1252: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

fn strict_decode(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Decode with the first candidate encoding that accepts the bytes.
pub fn decode_text(bytes: &[u8]) -> Option<(TextEncoding, String)> {
    CANDIDATES.iter().find_map(|encoding| {
        let text = encoding.decode(bytes);
        if text.is_none() {
            debug!(encoding = encoding.name(), "Decode failed; trying next encoding");
        }
        text.map(|text| (*encoding, text))
    })
}

/// Read one CSV file.
///
/// Blank rows are skipped. Every returned row carries `path` as provenance.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn read_file(path: &Path, required_columns: &[String]) -> Result<Vec<CsvRow>, CsvError> {
    if !path.is_file() {
        return Err(CsvError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(CsvError::Empty(path.to_path_buf()));
    }

    let (encoding, text) =
        decode_text(&bytes).ok_or_else(|| CsvError::Undecodable(path.to_path_buf()))?;
    debug!(encoding = encoding.name(), "Decoded CSV");

    let rows = parse_rows(path, &text, required_columns)?;
    info!(encoding = encoding.name(), count = rows.len(), "CSV read successfully");
    Ok(rows)
}

/// Parse already-decoded CSV text.
pub fn parse_rows(
    path: &Path,
    text: &str,
    required_columns: &[String],
) -> Result<Vec<CsvRow>, CsvError> {
    let parse_err = |source| CsvError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::MissingHeader(path.to_path_buf()));
    }

    let missing: Vec<String> = required_columns
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(parse_err)?;
        if record.iter().all(is_blank) {
            skipped += 1;
            continue;
        }

        let mut fields: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        for (i, extra) in record.iter().enumerate().skip(headers.len()) {
            fields.push((format!("field_{}", i + 1), extra.to_string()));
        }

        rows.push(CsvRow {
            file: path.to_path_buf(),
            fields,
        });
    }
    debug!(skipped, "Skipped blank rows");

    if rows.is_empty() {
        return Err(CsvError::NoDataRows(path.to_path_buf()));
    }
    Ok(rows)
}

/// `*.csv` files directly inside `dir`, sorted by name.
pub fn csv_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read a file or every CSV file in a directory. Never fails: problems are
/// logged and the affected file contributes nothing.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn read_path(path: &Path, required_columns: &[String]) -> Vec<CsvRow> {
    if path.is_dir() {
        let files = match csv_files_in(path) {
            Ok(files) => files,
            Err(e) => {
                error!(error = %e, "Failed to list CSV directory");
                return Vec::new();
            }
        };
        if files.is_empty() {
            warn!("No CSV files found in directory");
        }

        let mut rows = Vec::new();
        for file in files {
            match read_file(&file, required_columns) {
                Ok(mut file_rows) => rows.append(&mut file_rows),
                Err(e) => error!(file = %file.display(), error = %e, "Skipping CSV file"),
            }
        }
        info!(count = rows.len(), "Read CSV directory");
        return rows;
    }

    match read_file(path, required_columns) {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "CSV read failed");
            Vec::new()
        }
    }
}
