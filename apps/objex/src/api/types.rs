//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP KV API. The
//! `RemoteBackend` in objex-core deserializes these envelopes, so field
//! names here are wire contract, not implementation detail.

use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Count of live, unexpired entries.
    pub keys: usize,
    /// Storage backend serving this daemon.
    pub backend: String,
    pub version: String,
    pub uptime_seconds: u64,
}

// =============================================================================
// KV REQUEST/RESPONSE
// =============================================================================

/// Body of `PUT /kv/{key}`. Payload bytes travel base64-encoded; a missing
/// `ttl_seconds` stores the entry without expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub payload: String,
    pub ttl_seconds: Option<u64>,
}

/// Body of a successful `PUT /kv/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub stored: bool,
}

/// Body of a successful `GET /kv/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub payload: String,
}

/// Body of `DELETE /kv/{key}`. `deleted` reports whether the key existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error envelope returned with any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
