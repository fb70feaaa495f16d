//! Command-line interface definitions.
//!
//! Global options can come from flags or environment variables (a `.env`
//! file is loaded before parsing). Per-command flags override the YAML
//! config file for that command only.

use crate::config::{ConfigError, FileConfig, HeadlineParams, IngestConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments for the ingestion tool.
///
/// # Examples
///
/// ```sh
/// # Publisher directory and top headlines from NewsAPI
/// multi_source_ingest api
///
/// # Only headlines about AI, stored somewhere else
/// multi_source_ingest --store ./data/articles.json api --headlines-only --query ai
///
/// # Every CSV file in a directory
/// multi_source_ingest csv ./exports/
///
/// # Everything configured in a YAML file
/// multi_source_ingest --config ingest.yaml all
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path of the JSON store file
    #[arg(short, long, env = "INGEST_STORE")]
    pub store: Option<PathBuf>,

    /// NewsAPI key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the NewsAPI-compatible service
    #[arg(long, env = "NEWS_API_BASE_URL")]
    pub api_base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch the publisher directory and top headlines and merge them
    Api {
        /// Skip the headline listing
        #[arg(long, conflicts_with_all = ["headlines_only", "query", "language", "country", "page_size"])]
        sources_only: bool,
        /// Skip the publisher directory
        #[arg(long)]
        headlines_only: bool,
        /// Headline search keywords
        #[arg(long)]
        query: Option<String>,
        /// Two-letter language code for headlines
        #[arg(long)]
        language: Option<String>,
        /// Two-letter country code for headlines
        #[arg(long)]
        country: Option<String>,
        /// Number of headlines to request
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Read CSV files or directories and merge the rows
    Csv {
        /// Files or directories; defaults to the configured paths
        paths: Vec<PathBuf>,
        /// Comma-separated columns every file must have
        #[arg(long = "require", value_delimiter = ',')]
        required_columns: Option<Vec<String>>,
    },
    /// Scrape web pages and merge them
    Web {
        /// URLs to scrape; defaults to the configured URLs
        urls: Vec<String>,
        /// File with one URL per line (`#` starts a comment)
        #[arg(long)]
        url_file: Option<PathBuf>,
        /// Pause between two URLs, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Run API, CSV and web ingestion in that order
    All,
    /// Repeat `all` on an interval until interrupted
    Watch {
        #[arg(long, default_value_t = 1)]
        interval_minutes: u64,
    },
    /// Print the first stored records
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Reset the store to an empty list
    Clear,
}

impl Cli {
    /// Build the run configuration: YAML file first, then global flags, then
    /// the flags of the selected command.
    pub fn resolve_config(&self) -> Result<IngestConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let mut config = IngestConfig::from(file);

        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(key) = &self.api_key {
            config.api.api_key = Some(key.clone());
        }
        if let Some(base_url) = &self.api_base_url {
            config.api.base_url = base_url.clone();
        }

        match &self.command {
            Command::Api {
                sources_only,
                headlines_only,
                query,
                language,
                country,
                page_size,
            } => {
                if *sources_only {
                    config.api.sources = true;
                    config.api.headlines = None;
                }
                if *headlines_only {
                    config.api.sources = false;
                }
                let wants_headlines = *headlines_only
                    || query.is_some()
                    || language.is_some()
                    || country.is_some()
                    || page_size.is_some();
                if wants_headlines {
                    config
                        .api
                        .headlines
                        .get_or_insert_with(HeadlineParams::default)
                        .overlay(query.clone(), language.clone(), country.clone(), *page_size);
                }
            }
            Command::Csv {
                paths,
                required_columns,
            } => {
                if !paths.is_empty() {
                    config.csv.paths = paths.clone();
                }
                if let Some(columns) = required_columns {
                    config.csv.required_columns = columns.clone();
                }
            }
            Command::Web {
                urls,
                url_file,
                delay_ms,
            } => {
                let mut targets = urls.clone();
                if let Some(path) = url_file {
                    targets.extend(read_url_file(path)?);
                }
                if !targets.is_empty() {
                    config.web.urls = targets;
                }
                if let Some(ms) = delay_ms {
                    config.web.delay = Duration::from_millis(*ms);
                }
            }
            Command::All | Command::Watch { .. } | Command::List { .. } | Command::Clear => {}
        }
        Ok(config)
    }
}

/// Pause between two `watch` runs. Zero minutes means one.
pub fn watch_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

/// One URL per non-blank line; lines starting with `#` are ignored.
pub fn read_url_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiQuery;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "multi_source_ingest",
            "--store",
            "./out.json",
            "csv",
            "a.csv",
            "dir",
            "--require",
            "title,url",
        ]);
        assert_eq!(cli.store, Some(PathBuf::from("./out.json")));
        assert_eq!(
            cli.command,
            Command::Csv {
                paths: vec![PathBuf::from("a.csv"), PathBuf::from("dir")],
                required_columns: Some(vec!["title".to_string(), "url".to_string()]),
            }
        );
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["multi_source_ingest", "-s", "/tmp/s.json", "list"]);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cli.command, Command::List { limit: 10 });
    }

    #[test]
    fn test_api_fetches_both_listings_by_default() {
        let cli = Cli::parse_from(["multi_source_ingest", "--api-key", "k", "api", "--query", "ai"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("k"));
        assert_eq!(
            config.api.queries(),
            vec![
                ApiQuery::Sources,
                ApiQuery::TopHeadlines(HeadlineParams {
                    query: Some("ai".to_string()),
                    language: None,
                    country: Some("us".to_string()),
                    page_size: None,
                }),
            ]
        );
    }

    #[test]
    fn test_api_single_listing_flags() {
        let cli = Cli::parse_from(["multi_source_ingest", "api", "--sources-only"]);
        assert_eq!(cli.resolve_config().unwrap().api.queries(), vec![ApiQuery::Sources]);

        let cli = Cli::parse_from(["multi_source_ingest", "api", "--headlines-only", "--page-size", "5"]);
        let queries = cli.resolve_config().unwrap().api.queries();
        assert_eq!(queries.len(), 1);
        assert!(matches!(&queries[0], ApiQuery::TopHeadlines(p) if p.page_size == Some(5)));

        let conflict = Cli::try_parse_from(["multi_source_ingest", "api", "--sources-only", "--query", "ai"]);
        assert!(conflict.is_err());
    }

    #[test]
    fn test_watch_interval() {
        assert_eq!(watch_interval(0), Duration::from_secs(60));
        assert_eq!(watch_interval(15), Duration::from_secs(900));
        assert_eq!(watch_interval(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_web_url_file_and_delay() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("urls.txt");
        std::fs::write(&list, "# targets\nhttps://a.example\n\n  https://b.example  \n").unwrap();

        let cli = Cli::parse_from([
            "multi_source_ingest",
            "web",
            "https://c.example",
            "--url-file",
            list.to_str().unwrap(),
            "--delay-ms",
            "0",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(
            config.web.urls,
            vec!["https://c.example", "https://a.example", "https://b.example"]
        );
        assert_eq!(config.web.delay, Duration::ZERO);
    }
}
