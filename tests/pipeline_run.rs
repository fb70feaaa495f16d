// tests/pipeline_run.rs
//
// End-to-end runs of the driver against local fixtures for all three
// sources.

mod common;

use axum::Json;
use axum::extract::Query;
use axum::routing::get;
use multi_source_ingest::config::{ApiConfig, CsvConfig, HeadlineParams, IngestConfig, WebConfig};
use multi_source_ingest::pipeline::{ALL_SOURCES, ingest, run_sources};
use multi_source_ingest::retry::RetryPolicy;
use multi_source_ingest::{SourceKind, Store};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

async fn headlines(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    if params.get("q").map(String::as_str) == Some("broken") {
        return Json(json!({ "status": "error", "code": "unexpectedError", "message": "down" }));
    }
    Json(json!({
        "status": "ok",
        "articles": [
            { "source": { "id": null, "name": "Wire" }, "author": "Reporter",
              "title": "Wire story", "description": "blurb", "url": "https://wire.example/1",
              "publishedAt": "2026-10-01T00:00:00Z", "content": "full text" }
        ]
    }))
}

async fn fixture_config(dir: &std::path::Path) -> IngestConfig {
    let site = common::site()
        .route(
            "/v2/sources",
            get(|| async {
                Json(json!({
                    "status": "ok",
                    "sources": [
                        { "id": "one", "name": "One News", "description": "First",
                          "url": "https://one.example", "category": "general" }
                    ]
                }))
            }),
        )
        .route("/v2/top-headlines", get(headlines));
    let base = common::spawn(site).await;

    let csv_dir = dir.join("csv");
    fs::create_dir_all(&csv_dir).unwrap();
    fs::write(
        csv_dir.join("articles.csv"),
        format!(
            "title,content,url,tags\n\
             From CSV,Body,https://csv.example/1,x\n\
             Dup of API,Body,https://one.example,y\n\
             Dup of web,Body,{base}/alpha,z\n"
        ),
    )
    .unwrap();
    fs::write(csv_dir.join("broken.csv"), "title\nonly a title\n").unwrap();

    IngestConfig {
        store_path: dir.join("out").join("articles.json"),
        api: ApiConfig {
            api_key: Some("key".to_string()),
            base_url: format!("{base}/v2"),
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(10),
                max_jitter: Duration::ZERO,
            },
            timeout: Duration::from_secs(2),
            ..ApiConfig::default()
        },
        csv: CsvConfig {
            paths: vec![csv_dir],
            required_columns: vec!["title".to_string(), "content".to_string()],
        },
        web: WebConfig {
            urls: vec![
                format!("{base}/alpha"),
                format!("{base}/missing"),
                "not a url at all".to_string(),
            ],
            delay: Duration::ZERO,
            timeout: Duration::from_millis(500),
            ..WebConfig::default()
        },
    }
}

#[tokio::test]
async fn full_run_merges_all_sources_once() {
    let tmp = tempfile::tempdir().unwrap();
    let config = fixture_config(tmp.path()).await;
    let store = Store::new(&config.store_path);

    let summary = run_sources(&config, &store, &ALL_SOURCES).await.unwrap();
    assert_eq!(summary.initial_total, 0);
    assert_eq!(summary.reports.len(), 3);

    let api = &summary.reports[0];
    assert_eq!(api.source, SourceKind::Newsapi);
    assert_eq!((api.fetched, api.added()), (2, 2), "directory and headlines");

    let csv = &summary.reports[1];
    assert_eq!(csv.fetched, 3);
    assert_eq!(csv.added(), 2, "API duplicate is skipped");

    let web = &summary.reports[2];
    assert_eq!(web.fetched, 1);
    assert_eq!(web.failures, 2);
    assert_eq!(web.added(), 0, "page already arrived through CSV");

    assert_eq!(summary.final_total, 4);
    assert_eq!(summary.added(), 4);

    let records = store.load();
    let sources: Vec<_> = records.iter().map(|r| r.source).collect();
    assert_eq!(
        sources,
        vec![SourceKind::Newsapi, SourceKind::Newsapi, SourceKind::Csv, SourceKind::Csv]
    );
    assert_eq!(records[0].title, "One News");
    assert_eq!(records[1].title, "Wire story");
    assert_eq!(records[2].metadata["tags"], "x");

    let again = run_sources(&config, &store, &ALL_SOURCES).await.unwrap();
    assert_eq!(again.added(), 0);
    assert_eq!(again.final_total, 4);
}

#[tokio::test]
async fn api_step_succeeds_when_one_listing_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixture_config(tmp.path()).await;
    config.api.headlines = Some(HeadlineParams {
        query: Some("broken".to_string()),
        ..HeadlineParams::default()
    });
    let store = Store::new(&config.store_path);

    let report = ingest(&config, &store, SourceKind::Newsapi).await.unwrap();
    assert!(report.succeeded());
    assert_eq!(report.fetched, 1);
    assert_eq!(store.load()[0].title, "One News");
}

#[tokio::test]
async fn csv_missing_columns_contribute_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixture_config(tmp.path()).await;
    config.csv.required_columns.push("author".to_string());
    let store = Store::new(&config.store_path);

    let report = ingest(&config, &store, SourceKind::Csv).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert!(!report.succeeded());
    assert!(store.load().is_empty());
}

#[tokio::test]
async fn api_without_key_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixture_config(tmp.path()).await;
    config.api.api_key = None;
    let store = Store::new(&config.store_path);

    let report = ingest(&config, &store, SourceKind::Newsapi).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert!(!store.path().exists());
}
