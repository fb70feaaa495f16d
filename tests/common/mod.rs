// tests/common/mod.rs
//
// Local HTTP fixtures shared by the integration tests. Nothing here talks
// to the real network.

#![allow(dead_code)]

use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

pub fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title} | Site</title></head>\
         <body><nav>Menu</nav><h1>{title}</h1><p>{body}</p><footer>Footer</footer></body></html>"
    )
}

/// Pages used by the web tests:
/// `/alpha`, `/beta` (200), `/missing` (404), `/forbidden` (403),
/// `/boom` (500), `/slow` (answers after 5 s), `/bannered` (headings in
/// header and aside chrome ahead of the story headline).
pub fn site() -> Router {
    Router::new()
        .route("/alpha", get(|| async { Html(page("Alpha", "alpha body")) }))
        .route("/beta", get(|| async { Html(page("Beta", "beta body")) }))
        .route(
            "/bannered",
            get(|| async {
                Html(
                    "<html><head><title>Bannered | Site</title></head><body>\
                     <header><h1>Site Banner</h1></header>\
                     <aside><h1>Related</h1></aside>\
                     <h1>Story Headline</h1><p>story body</p></body></html>",
                )
            }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "not here") }))
        .route("/forbidden", get(|| async { (StatusCode::FORBIDDEN, "go away") }))
        .route(
            "/boom",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Html(page("Slow", "too late"))
            }),
        )
}
