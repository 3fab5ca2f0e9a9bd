//! # Objex HTTP API Module
//!
//! This module implements the HTTP KV API server using axum. It is the
//! service side of the wire format that `objex_core::RemoteBackend` speaks.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never authenticated)
//! - `GET /status` - Live key count, backend kind, version, uptime
//! - `GET /kv/{key}` - Fetch a payload (404 when absent or expired)
//! - `PUT /kv/{key}` - Store a payload with optional TTL
//! - `DELETE /kv/{key}` - Delete a key
//!
//! ## Security Configuration
//!
//! Resolved once at startup (config file, then environment):
//! - `cors_origins` / `OBJEX_CORS_ORIGINS`: comma-separated allowed origins, or "*" for all (default: localhost only)
//! - `rate_limit` / `OBJEX_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `api_key` / `OBJEX_API_KEY`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for integration tests (via `objex::api::*`)
pub use handlers::MAX_KEY_LENGTH;
pub use types::{
    DeleteResponse, ErrorResponse, FetchResponse, HealthResponse, SetRequest, SetResponse,
    StatusResponse,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use objex_core::{Backend, ObjexError};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: one storage backend plus the resolved configuration.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend serving all KV operations.
    pub backend: Arc<dyn Backend>,

    /// Resolved daemon configuration.
    pub config: Arc<ServerConfig>,

    /// Process start instant, for `/status` uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create new app state around a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: ServerConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from the resolved origin list.
///
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            // Explicit wildcard - warn about security implications
            tracing::warn!(
                "CORS: Allowing ALL origins (cors_origins=\"*\"). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            // Parse comma-separated origins
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            // No configuration - default to localhost only (restrictive)
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.config.cors_origins.as_deref());

    // Check if rate limiting is enabled
    let rate_limit = state.config.rate_limit;
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(middleware::create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = state.config.api_key.is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication disabled; all endpoints are publicly accessible. \
             Set OBJEX_API_KEY or the api_key config key to enable it."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/kv/{key}",
            get(handlers::fetch_handler)
                .put(handlers::set_handler)
                .delete(handlers::delete_handler),
        );

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth_middleware,
        ));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(8 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server, shutting down gracefully on ctrl-c.
pub async fn run_server(state: AppState) -> Result<(), ObjexError> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ObjexError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Objex HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ObjexError::IoError(format!("Server error: {}", e)))
}

/// Resolve when the process receives ctrl-c.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining connections"),
        Err(e) => {
            // Completing this future would stop the server, so hold it open
            // when the signal handler cannot be installed.
            tracing::error!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
