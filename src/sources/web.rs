//! Ad-hoc web page adapter.
//!
//! Fetches each URL of a batch in turn and extracts a readable title and
//! body text. URLs are isolated from each other: whatever happens to one of
//! them is recorded in its own [`ScrapeOutcome`] and the batch moves on.
//!
//! # Extraction
//!
//! Non-content subtrees (`script`, `style`, `nav`, `footer`, `header`,
//! `aside`, `noscript`) are removed first. The title is the first non-empty
//! `h1`, else `title`, else `h2`, else [`NO_TITLE`]. The body text keeps one
//! line per text run, whitespace collapsed, and is cut to the configured
//! maximum number of characters.

use crate::config::WebConfig;
use crate::models::WebPage;
use crate::utils::{collapse_whitespace, normalize_lines, truncate_chars};
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const NO_TITLE: &str = "No Title Found";

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, footer, header, aside, noscript").expect("valid selector")
});
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static H2: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Why a single URL produced no page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    /// 403 or 404.
    #[error("HTTP {code}")]
    Status { code: u16 },
    /// Any other non-2xx status.
    #[error("unexpected HTTP status {code}")]
    Http { code: u16 },
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout
        } else if e.is_connect() {
            ScrapeError::Connection(e.to_string())
        } else {
            ScrapeError::Request(e.to_string())
        }
    }
}

/// Result slot for one input URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub url: String,
    pub result: Result<WebPage, ScrapeError>,
}

impl ScrapeOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn page(&self) -> Option<&WebPage> {
        self.result.as_ref().ok()
    }
}

/// Turn free-form input into fetchable URLs.
///
/// Inputs without a scheme get `https://`. Returns the accepted URLs and
/// the rejected inputs, both in input order.
pub fn parse_targets<S: AsRef<str>>(inputs: &[S]) -> (Vec<String>, Vec<String>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for input in inputs {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let parsed = Url::parse(raw).or_else(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => Url::parse(&format!("https://{raw}")),
            other => Err(other),
        });
        match parsed {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
                accepted.push(url.to_string());
            }
            _ => {
                warn!(input = raw, "Rejected URL");
                rejected.push(raw.to_string());
            }
        }
    }
    (accepted, rejected)
}

/// Extract `(title, body_text)` from an HTML document.
pub fn extract_page(html: &str, max_chars: usize) -> (String, String) {
    let mut document = Html::parse_document(html);

    let noise: Vec<_> = document.select(&NOISE).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    // Html::select walks detached nodes too; only search from the root.
    let html = document.root_element();
    let title = [&*H1, &*TITLE, &*H2]
        .into_iter()
        .find_map(|selector| first_text(html, selector))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let root = html.select(&BODY).next().unwrap_or(html);
    let text = normalize_lines(&root.text().join("\n"));

    (title, truncate_chars(&text, max_chars))
}

fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

/// HTTP client plus extraction settings for one batch.
#[derive(Debug)]
pub struct WebScraper<'a> {
    client: Client,
    config: &'a WebConfig,
}

impl<'a> WebScraper<'a> {
    pub fn new(config: &'a WebConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch and extract a single page.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn scrape_one(&self, url: &str) -> Result<WebPage, ScrapeError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        match status {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(ScrapeError::Status {
                    code: status.as_u16(),
                });
            }
            s if !s.is_success() => {
                return Err(ScrapeError::Http { code: s.as_u16() });
            }
            _ => {}
        }

        let body = resp.text().await?;
        let (title, content) = extract_page(&body, self.config.max_content_chars);
        info!(bytes = body.len(), chars = content.chars().count(), "Parsed page");
        Ok(WebPage {
            url: url.to_string(),
            title,
            content,
            status: status.as_u16(),
        })
    }

    /// Scrape every URL in order, pausing between consecutive URLs.
    ///
    /// Always returns exactly one outcome per input URL.
    #[instrument(level = "info", skip_all, fields(count = urls.len()))]
    pub async fn run_batch<S: AsRef<str>>(&self, urls: &[S]) -> Vec<ScrapeOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.config.delay.is_zero() {
                debug!(delay = ?self.config.delay, "Courtesy delay");
                sleep(self.config.delay).await;
            }

            let url = url.as_ref();
            let result = self.scrape_one(url).await;
            match &result {
                Ok(page) => debug!(%url, title = %page.title, "Scraped page"),
                Err(e) => warn!(%url, error = %e, "Scrape failed"),
            }
            outcomes.push(ScrapeOutcome {
                url: url.to_string(),
                result,
            });
        }

        let ok = outcomes.iter().filter(|o| o.is_ok()).count();
        info!(ok, failed = outcomes.len() - ok, "Finished scrape batch");
        outcomes
    }
}

/// Scrape a batch with a scraper built from `config`.
pub async fn scrape<S: AsRef<str>>(config: &WebConfig, urls: &[S]) -> Vec<ScrapeOutcome> {
    match WebScraper::new(config) {
        Ok(scraper) => scraper.run_batch(urls).await,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            urls.iter()
                .map(|url| ScrapeOutcome {
                    url: url.as_ref().to_string(),
                    result: Err(ScrapeError::Request(e.to_string())),
                })
                .collect()
        }
    }
}
