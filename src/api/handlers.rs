//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::BackingStore;
use crate::cache::ReadThroughCache;
use crate::config::Config;
use crate::error::Result;
use crate::models::{HealthResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-through cache in front of the backing store
    pub cache: ReadThroughCache,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: ReadThroughCache) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Sizes the cache with the configured capacity and expiry.
    pub fn from_config(config: &Config, backend: Arc<dyn BackingStore>) -> Self {
        let cache = ReadThroughCache::new(config.cache_capacity, config.ttl(), backend);
        Self::new(cache)
    }
}

/// Handler for GET /cache/:key
///
/// Answers with the value as plain text, or 404 with an empty body when the
/// backing store has no value for the key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let response = match state.cache.get(&key).await? {
        Some(value) => value.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    };
    Ok(response)
}

/// Handler for DELETE /cache
///
/// Empties the cache. Always succeeds.
pub async fn clear_handler(State(state): State<AppState>) -> StatusCode {
    state.cache.invalidate_all().await;
    StatusCode::NO_CONTENT
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
