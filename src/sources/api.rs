//! NewsAPI listing adapter.
//!
//! Fetches the publisher directory (`/sources`) and the article listing
//! (`/top-headlines`), in that order, and returns the listed items untouched.
//! A listing that fails does not stop the next one. Every request
//! goes through [`crate::retry::RetryPolicy::run`], so timeouts and connection failures are
//! retried while anything else (bad key, rate limit, unexpected body) ends
//! the fetch on the first attempt.
//!
//! The adapter never fails: a missing key, an exhausted retry budget or a
//! response of the wrong shape all produce an empty list.

use crate::config::{ApiConfig, ApiQuery, HeadlineParams};
use crate::models::{ApiItem, ApiListing};
use crate::retry::Transient;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("service reported {code}: {message}")]
    Service { code: String, message: String },
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if e.is_connect() {
            ApiError::Connection(e.to_string())
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

impl Transient for ApiError {
    fn is_transient(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::Connection(_))
    }
}

impl ApiQuery {
    pub fn listing(&self) -> ApiListing {
        match self {
            ApiQuery::Sources => ApiListing::Sources,
            ApiQuery::TopHeadlines(_) => ApiListing::Articles,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            ApiQuery::Sources => "sources",
            ApiQuery::TopHeadlines(_) => "top-headlines",
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let ApiQuery::TopHeadlines(HeadlineParams {
            query,
            language,
            country,
            page_size,
        }) = self
        {
            if let Some(q) = query {
                params.push(("q", q.clone()));
            }
            if let Some(language) = language {
                params.push(("language", language.clone()));
            }
            if let Some(country) = country {
                params.push(("country", country.clone()));
            }
            if let Some(size) = page_size {
                params.push(("pageSize", size.to_string()));
            }
        }
        params
    }
}

/// Thin authenticated client for a NewsAPI-compatible service.
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// One request, no retries. Returns the decoded response body.
    #[instrument(level = "debug", skip_all, fields(endpoint = query.path()))]
    pub async fn request_once(&self, query: &ApiQuery) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, query.path());
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&query.params())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!(%status, bytes = body.len(), "API response received");

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: truncate_for_log(&body, 200),
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        if value.get("status").and_then(Value::as_str) == Some("error") {
            let field = |name: &str| {
                value
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            };
            return Err(ApiError::Service {
                code: field("code"),
                message: field("message"),
            });
        }
        Ok(value)
    }
}

/// Pull the items out of a listing response.
///
/// Anything other than an object whose list field is an array is treated as
/// "no data". Non-object array elements are skipped.
pub fn extract_items(listing: ApiListing, body: Value) -> Vec<ApiItem> {
    let Value::Object(mut map) = body else {
        warn!("API response is not a JSON object; treating as no data");
        return Vec::new();
    };
    let Some(Value::Array(items)) = map.remove(listing.list_field()) else {
        warn!(
            field = listing.list_field(),
            "API response has no list field; treating as no data"
        );
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(ApiItem { listing, fields }),
            _ => None,
        })
        .collect()
}

/// Fetch every configured listing in order. Soft-fails to an empty list.
#[instrument(level = "info", skip_all, fields(base_url = %config.base_url))]
pub async fn fetch_listings(config: &ApiConfig) -> Vec<ApiItem> {
    let Some(client) = authorized_client(config) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for query in config.queries() {
        items.extend(fetch_with(&client, config, &query).await);
    }
    items
}

/// Fetch a single listing. Soft-fails to an empty list.
pub async fn fetch_listing(config: &ApiConfig, query: &ApiQuery) -> Vec<ApiItem> {
    match authorized_client(config) {
        Some(client) => fetch_with(&client, config, query).await,
        None => Vec::new(),
    }
}

fn authorized_client(config: &ApiConfig) -> Option<NewsApiClient> {
    let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        warn!("No API key configured; skipping API fetch");
        return None;
    };
    match NewsApiClient::new(config, api_key) {
        Ok(client) => Some(client),
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            None
        }
    }
}

async fn fetch_with(client: &NewsApiClient, config: &ApiConfig, query: &ApiQuery) -> Vec<ApiItem> {
    let listing = query.listing();
    let Some(body) = config
        .retry
        .run(listing.list_field(), || client.request_once(query))
        .await
    else {
        warn!(listing = listing.list_field(), "Listing unavailable; moving on");
        return Vec::new();
    };

    let items = extract_items(listing, body);
    info!(count = items.len(), listing = listing.list_field(), "Retrieved API items");
    items
}
