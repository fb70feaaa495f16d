//! Run configuration.
//!
//! Everything a run needs is resolved once into an [`IngestConfig`] and then
//! passed by reference to each component. Values come from three layers,
//! highest precedence first:
//!
//! 1. command-line flags and their environment variables (see [`crate::cli`])
//! 2. an optional YAML file ([`FileConfig`])
//! 3. the defaults below
//!
//! ```yaml
//! store: output/articles.json
//! api:
//!   sources: true
//!   headlines: true
//!   query: ai
//!   country: us
//!   page_size: 20
//! csv:
//!   paths: [data/]
//!   required_columns: [title, content]
//! web:
//!   urls: [https://example.com]
//!   delay_ms: 500
//! ```

use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_STORE_PATH: &str = "output/articles.json";
pub const DEFAULT_API_BASE_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HEADLINE_COUNTRY: &str = "us";
pub const DEFAULT_WEB_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WEB_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 2000;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; multi_source_ingest/0.1)";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Query parameters of the headline listing. `None` leaves a parameter out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlineParams {
    pub query: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub page_size: Option<u32>,
}

impl HeadlineParams {
    /// Replace the parameters that are given.
    pub fn overlay(
        &mut self,
        query: Option<String>,
        language: Option<String>,
        country: Option<String>,
        page_size: Option<u32>,
    ) {
        if query.is_some() {
            self.query = query;
        }
        if language.is_some() {
            self.language = language;
        }
        if country.is_some() {
            self.country = country;
        }
        if page_size.is_some() {
            self.page_size = page_size;
        }
    }
}

/// One API listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiQuery {
    Sources,
    TopHeadlines(HeadlineParams),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Absent key means the API adapter is skipped without a network call.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Fetch the publisher directory.
    pub sources: bool,
    /// Fetch top headlines; `None` skips the listing.
    pub headlines: Option<HeadlineParams>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Listings to request, publisher directory first.
    pub fn queries(&self) -> Vec<ApiQuery> {
        let mut queries = Vec::with_capacity(2);
        if self.sources {
            queries.push(ApiQuery::Sources);
        }
        if let Some(params) = &self.headlines {
            queries.push(ApiQuery::TopHeadlines(params.clone()));
        }
        queries
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            sources: true,
            headlines: Some(HeadlineParams {
                country: Some(DEFAULT_HEADLINE_COUNTRY.to_string()),
                ..HeadlineParams::default()
            }),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Files or directories; directories contribute every `*.csv` inside.
    pub paths: Vec<PathBuf>,
    pub required_columns: Vec<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            required_columns: vec!["title".to_string(), "content".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub urls: Vec<String>,
    /// Pause between two consecutive URLs of a batch.
    pub delay: Duration,
    pub timeout: Duration,
    pub max_content_chars: usize,
    pub user_agent: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            delay: Duration::from_millis(DEFAULT_WEB_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_WEB_TIMEOUT_SECS),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub store_path: PathBuf,
    pub api: ApiConfig,
    pub csv: CsvConfig,
    pub web: WebConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            api: ApiConfig::default(),
            csv: CsvConfig::default(),
            web: WebConfig::default(),
        }
    }
}

/// On-disk YAML layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub store: Option<PathBuf>,
    pub api: ApiSection,
    pub csv: CsvSection,
    pub web: WebSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub sources: Option<bool>,
    pub headlines: Option<bool>,
    pub query: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub page_size: Option<u32>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvSection {
    pub paths: Vec<PathBuf>,
    pub required_columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebSection {
    pub urls: Vec<String>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_content_chars: Option<usize>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::parse(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration file");
        Ok(parsed)
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

impl From<FileConfig> for IngestConfig {
    fn from(file: FileConfig) -> Self {
        let mut config = IngestConfig::default();
        if let Some(store) = file.store {
            config.store_path = store;
        }

        let api = file.api;
        if let Some(base_url) = api.base_url {
            config.api.base_url = base_url;
        }
        if let Some(sources) = api.sources {
            config.api.sources = sources;
        }
        if api.headlines == Some(false) {
            config.api.headlines = None;
        } else if let Some(params) = config.api.headlines.as_mut() {
            params.overlay(api.query, api.language, api.country, api.page_size);
        }
        if let Some(max_attempts) = api.max_attempts {
            config.api.retry = RetryPolicy::with_attempts(max_attempts);
        }
        if let Some(secs) = api.timeout_secs {
            config.api.timeout = Duration::from_secs(secs);
        }

        config.csv.paths = file.csv.paths;
        if let Some(columns) = file.csv.required_columns {
            config.csv.required_columns = columns;
        }

        let web = file.web;
        config.web.urls = web.urls;
        if let Some(ms) = web.delay_ms {
            config.web.delay = Duration::from_millis(ms);
        }
        if let Some(secs) = web.timeout_secs {
            config.web.timeout = Duration::from_secs(secs);
        }
        if let Some(chars) = web.max_content_chars {
            config.web.max_content_chars = chars;
        }
        if let Some(user_agent) = web.user_agent {
            config.web.user_agent = user_agent;
        }
        config
    }
}
