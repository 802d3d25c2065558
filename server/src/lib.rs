//! HTTP front end over a [`ThreadSafeInvertedIndex`]. The binary fills the
//! index before serving; handlers only ever take the read lock.

use axum::{extract::{Query, State}, routing::get, Json, Router};
use search_core::tokenizer::unique_stems;
use search_core::{SearchResult, ThreadSafeInvertedIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub exact: bool,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub words: usize,
    pub locations: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<ThreadSafeInvertedIndex>,
}

pub fn build_app(index: Arc<ThreadSafeInvertedIndex>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .with_state(AppState { index })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let stems = unique_stems(&params.q);
    let mut results = if stems.is_empty() { Vec::new() } else { state.index.search(&stems, params.exact) };
    let total_hits = results.len();
    results.truncate(params.k.clamp(1, MAX_K));
    tracing::debug!(query = %params.q, exact = params.exact, total_hits, "search");
    Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse { words: state.index.word_len(), locations: state.index.location_total() })
}
