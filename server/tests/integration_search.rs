use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::tokenizer::stems;
use search_core::ThreadSafeInvertedIndex;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn tiny_app() -> Router {
    let index = Arc::new(ThreadSafeInvertedIndex::new());
    index.add_words(&stems("Rust is great. Rust systems programming."), "doc0");
    index.add_words(&stems("Learning rust."), "doc1");
    index.add_words(&stems("Rusty nails and crusty bread"), "doc2");
    server::build_app(index)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn call_json(app: Router, uri: &str) -> Value {
    let (status, body) = call(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

fn locations(json: &Value) -> Vec<&str> {
    json["results"].as_array().unwrap().iter().map(|r| r["where"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn exact_search_returns_ranked_results() {
    let json = call_json(tiny_app(), "/search?q=rust&exact=true").await;
    assert_eq!(json["query"], "rust");
    assert_eq!(json["total_hits"], 2);
    // doc1 scores 1/2, doc0 scores 2/6
    assert_eq!(locations(&json), vec!["doc1", "doc0"]);
    assert_eq!(json["results"][1]["count"], 2);
}

#[tokio::test]
async fn partial_search_is_the_default_and_k_truncates() {
    let json = call_json(tiny_app(), "/search?q=rust&k=1").await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(locations(&json).len(), 1);

    let json = call_json(tiny_app(), "/search?q=rust&k=0").await;
    assert_eq!(locations(&json).len(), 1);
}

#[tokio::test]
async fn empty_queries_have_no_hits() {
    let json = call_json(tiny_app(), "/search?q=%21%3F").await;
    assert_eq!(json["total_hits"], 0);
    assert!(locations(&json).is_empty());
}

#[tokio::test]
async fn stats_and_health() {
    let json = call_json(tiny_app(), "/stats").await;
    assert_eq!(json["locations"], 3);
    assert!(json["words"].as_u64().unwrap() > 0);

    let (status, body) = call(tiny_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn missing_query_is_rejected() {
    let (status, _) = call(tiny_app(), "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
