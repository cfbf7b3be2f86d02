use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use search_core::persist::{load_config, load_documents, WorkspacePaths};
use search_core::{DocId, IndexError, InvertedIndex, SearchServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Defaults to `max_responses` from config.json.
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub rank: f32,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub num_docs: usize,
    pub num_terms: usize,
    pub took_s: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
    pub paths: Arc<WorkspacePaths>,
    pub max_responses: usize,
    pub admin_token: Option<String>,
}

impl AppState {
    /// Load config.json under `root` and index the configured files.
    pub fn load(root: impl AsRef<std::path::Path>, admin_token: Option<String>) -> Result<Self> {
        let paths = WorkspacePaths::new(root);
        let config = load_config(&paths)?;
        let index = InvertedIndex::new();
        index.build(load_documents(&config))?;
        tracing::info!(num_docs = index.document_count(), "index loaded");
        Ok(Self {
            index: Arc::new(index),
            paths: Arc::new(paths),
            max_responses: config.max_responses,
            admin_token,
        })
    }
}

pub fn build_app(root: impl AsRef<std::path::Path>) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState::load(root, admin_token)?;
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
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
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/rebuild", post(index_rebuild))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let ranked = SearchServer::new(&state.index).search_query(&params.q);
    let total_hits = ranked.len();
    let k = params.k.unwrap_or(state.max_responses).clamp(1, MAX_K);
    let results = ranked
        .into_iter()
        .take(k)
        .map(|r| SearchHit { doc_id: r.doc_id, rank: r.rank })
        .collect();
    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> (StatusCode, Json<serde_json::Value>) {
    match state.index.document(doc_id) {
        Some(text) => (StatusCode::OK, Json(serde_json::json!({ "doc_id": doc_id, "text": text }))),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))),
    }
}

/// Re-read the configured files and replace the whole collection.
async fn index_rebuild(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<RebuildResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let index = state.index.clone();
    let paths = state.paths.clone();
    let start = std::time::Instant::now();

    let outcome = tokio::task::spawn_blocking(move || -> Result<()> {
        let config = load_config(&paths)?;
        index.build(load_documents(&config))?;
        Ok(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("rebuild task failed: {e}")))?;

    if let Err(err) = outcome {
        tracing::warn!(error = %format!("{err:#}"), "rebuild rejected");
        let status = match err.downcast_ref::<IndexError>() {
            Some(IndexError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        return Err((status, format!("{err:#}")));
    }

    let snapshot = state.index.snapshot();
    Ok(Json(RebuildResponse {
        num_docs: snapshot.document_count(),
        num_terms: snapshot.term_count(),
        took_s: start.elapsed().as_secs_f64(),
    }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
