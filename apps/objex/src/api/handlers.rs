//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        DeleteResponse, ErrorResponse, FetchResponse, HealthResponse, SetRequest, SetResponse,
        StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::time::Duration;

/// Maximum accepted key length in bytes.
///
/// Store identifiers are short (counter ids or UUIDs); anything near this
/// limit is a client bug, not a real key.
pub const MAX_KEY_LENGTH: usize = 512;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get store status.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    match state.backend.len().await {
        Ok(keys) => (
            StatusCode::OK,
            Json(StatusResponse {
                keys,
                backend: state.config.backend.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: state.started_at.elapsed().as_secs(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Status failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// KV HANDLERS
// =============================================================================

/// Fetch a payload. Expired entries are indistinguishable from absent ones.
pub async fn fetch_handler(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.backend.get(&key).await {
        Ok(Some(payload)) => (
            StatusCode::OK,
            Json(FetchResponse {
                payload: BASE64.encode(payload),
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Key `{}` not found", key))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Fetch failed: {}", e))),
        )
            .into_response(),
    }
}

/// Store a payload, overwriting any previous entry and its TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<SetRequest>,
) -> Response {
    if key.len() > MAX_KEY_LENGTH {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "Key length {} exceeds maximum {} bytes",
                key.len(),
                MAX_KEY_LENGTH
            ))),
        )
            .into_response();
    }

    let payload = match BASE64.decode(&request.payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Invalid base64 payload: {}", e))),
            )
                .into_response();
        }
    };

    let ttl = request.ttl_seconds.map(Duration::from_secs);
    match state.backend.set(&key, &payload, ttl).await {
        Ok(()) => (StatusCode::OK, Json(SetResponse { stored: true })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Set failed: {}", e))),
        )
            .into_response(),
    }
}

/// Delete a key, reporting whether a live entry existed.
pub async fn delete_handler(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.backend.delete(&key).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Delete failed: {}", e))),
        )
            .into_response(),
    }
}
