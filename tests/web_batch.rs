// tests/web_batch.rs
//
// Web adapter against a local site: per-URL isolation, status handling,
// ordering and the courtesy delay.

mod common;

use multi_source_ingest::config::WebConfig;
use multi_source_ingest::sources::web::{ScrapeError, scrape};
use std::time::{Duration, Instant};

fn fast_config() -> WebConfig {
    WebConfig {
        delay: Duration::ZERO,
        timeout: Duration::from_millis(300),
        ..WebConfig::default()
    }
}

#[tokio::test]
async fn batch_isolates_failures_and_keeps_order() {
    let base = common::spawn(common::site()).await;
    let urls = vec![
        format!("{base}/alpha"),
        format!("{base}/missing"),
        format!("{base}/slow"),
        format!("{base}/beta"),
    ];

    let outcomes = scrape(&fast_config(), &urls).await;
    assert_eq!(outcomes.len(), 4);
    for (outcome, url) in outcomes.iter().zip(&urls) {
        assert_eq!(&outcome.url, url);
    }

    let alpha = outcomes[0].page().expect("alpha scraped");
    assert_eq!(alpha.title, "Alpha");
    assert_eq!(alpha.content, "Alpha\nalpha body");
    assert_eq!(alpha.status, 200);

    assert_eq!(outcomes[1].result, Err(ScrapeError::Status { code: 404 }));
    assert_eq!(outcomes[2].result, Err(ScrapeError::Timeout));

    let beta = outcomes[3].page().expect("beta scraped");
    assert_eq!(beta.title, "Beta");
    assert_eq!(beta.content, "Beta\nbeta body");
}

#[tokio::test]
async fn headings_in_page_chrome_are_not_titles() {
    let base = common::spawn(common::site()).await;
    let outcomes = scrape(&fast_config(), &[format!("{base}/bannered")]).await;

    let page = outcomes[0].page().expect("bannered scraped");
    assert_eq!(page.title, "Story Headline");
    assert_eq!(page.content, "Story Headline\nstory body");
}

#[tokio::test]
async fn status_codes_map_to_distinct_errors() {
    let base = common::spawn(common::site()).await;
    let urls = vec![format!("{base}/forbidden"), format!("{base}/boom")];

    let outcomes = scrape(&fast_config(), &urls).await;
    assert_eq!(outcomes[0].result, Err(ScrapeError::Status { code: 403 }));
    assert_eq!(outcomes[1].result, Err(ScrapeError::Http { code: 500 }));
}

#[tokio::test]
async fn connection_failure_is_reported_per_url() {
    let base = common::spawn(common::site()).await;
    // Port 1 is reserved and nothing listens there.
    let urls = vec!["http://127.0.0.1:1/".to_string(), format!("{base}/alpha")];

    let outcomes = scrape(&fast_config(), &urls).await;
    assert!(matches!(outcomes[0].result, Err(ScrapeError::Connection(_))));
    assert!(outcomes[1].is_ok());
}

#[tokio::test]
async fn delay_is_observed_between_urls_only() {
    let base = common::spawn(common::site()).await;
    let urls = vec![
        format!("{base}/alpha"),
        format!("{base}/beta"),
        format!("{base}/alpha"),
    ];
    let config = WebConfig {
        delay: Duration::from_millis(100),
        ..fast_config()
    };

    let t0 = Instant::now();
    let outcomes = scrape(&config, &urls).await;
    let elapsed = t0.elapsed();

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn empty_batch_returns_nothing() {
    let urls: Vec<String> = Vec::new();
    assert!(scrape(&fast_config(), &urls).await.is_empty());
}
