//! # Objex MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) surface of Objex.
//!
//! Reads configuration from environment variables:
//! - `OBJEX_BACKEND`: `memory` (default), `redb` or `remote`
//! - `OBJEX_DATABASE`: redb database path (default: `objex.db`)
//! - `OBJEX_REMOTE_URL`: objex daemon URL (default: `http://localhost:8080`)
//! - `OBJEX_REMOTE_API_KEY`: optional Bearer token for the daemon
//! - `OBJEX_TTL_SECONDS`: default object lifetime (default: 600; 0 disables expiry)
//! - `OBJEX_PREVIEW_CHARS`: preview character budget (default: 2000)
//!
//! Communicates with AI clients (Claude, GPT) via MCP over stdio; stored
//! objects live in the selected backend.

mod server;

use std::sync::Arc;

use objex_core::{
    Backend, DEFAULT_TTL_SECONDS, Explorer, ExplorerConfig, InMemoryBackend, ObjectStore,
    ObjexError, RedbBackend, RemoteBackend,
};
use rmcp::{ServiceExt, transport::stdio};
use server::ObjexMcp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr; stdout is reserved for the MCP stdio transport.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let backend_kind = std::env::var("OBJEX_BACKEND").unwrap_or_else(|_| "memory".into());
    let ttl_seconds = read_i64("OBJEX_TTL_SECONDS", DEFAULT_TTL_SECONDS);

    tracing::info!("Objex MCP server starting, backend: {}", backend_kind);

    let backend = build_backend(&backend_kind).await?;
    let store = ObjectStore::with_ttl_seconds(backend, ttl_seconds);

    let mut config = ExplorerConfig::default();
    if let Some(chars) = read_usize("OBJEX_PREVIEW_CHARS") {
        config.preview_chars = chars;
    }
    let mcp = ObjexMcp::new(Explorer::with_config(store, config));

    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}

/// Select and connect the configured backend. A remote daemon that fails
/// its health check is fatal here, before the MCP handshake starts.
async fn build_backend(kind: &str) -> Result<Arc<dyn Backend>, ObjexError> {
    match kind {
        "memory" => Ok(Arc::new(InMemoryBackend::new())),
        "redb" => {
            let path = std::env::var("OBJEX_DATABASE").unwrap_or_else(|_| "objex.db".into());
            tracing::info!("Opening redb database at {}", path);
            Ok(Arc::new(RedbBackend::open(&path)?))
        }
        "remote" => {
            let url = std::env::var("OBJEX_REMOTE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into());
            let api_key = std::env::var("OBJEX_REMOTE_API_KEY").ok();
            tracing::info!("Connecting to objex daemon at {}", url);
            Ok(Arc::new(RemoteBackend::connect(&url, api_key).await?))
        }
        other => Err(ObjexError::BackendUnavailable(format!(
            "Unknown backend `{other}`. Use: memory, redb, remote"
        ))),
    }
}

/// Read a numeric env var, keeping the default when unset or unparseable.
fn read_i64(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring non-numeric {}: `{}`", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn read_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring non-numeric {}: `{}`", name, raw);
            None
        }
    }
}
