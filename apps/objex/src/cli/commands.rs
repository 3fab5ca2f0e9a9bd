//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::ServerConfig;
use objex_core::{Backend, InMemoryBackend, ObjexError, RedbBackend};
use std::sync::Arc;

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Build the configured storage backend.
pub fn build_backend(config: &ServerConfig) -> Result<Arc<dyn Backend>, ObjexError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryBackend::new())),
        "redb" => Ok(Arc::new(RedbBackend::open(&config.database)?)),
        other => Err(ObjexError::BackendUnavailable(format!(
            "Unknown backend `{}`. Use: memory, redb",
            other
        ))),
    }
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(config: ServerConfig) -> Result<(), ObjexError> {
    let backend = build_backend(&config)?;

    println!("Objex Object Store Daemon Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.host);
    println!("  Port:     {}", config.port);
    println!("  Backend:  {}", config.backend);
    if config.backend == "redb" {
        println!("  Database: {:?}", config.database);
    }
    println!();
    println!("Endpoints:");
    println!("  GET    /health   - Health check");
    println!("  GET    /status   - Store status");
    println!("  GET    /kv/{{key}} - Fetch a payload");
    println!("  PUT    /kv/{{key}} - Store a payload (optional TTL)");
    println!("  DELETE /kv/{{key}} - Delete a key");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(AppState::new(backend, config)).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub async fn cmd_status(config: &ServerConfig, json_mode: bool) -> Result<(), ObjexError> {
    let backend = build_backend(config)?;
    let keys = backend.len().await?;

    if json_mode {
        let output = serde_json::json!({
            "backend": config.backend,
            "database": config.database.to_string_lossy(),
            "keys": keys,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Objex Store Status");
    println!("==================");
    println!("Backend:  {}", config.backend);
    if config.backend == "redb" {
        println!("Database: {:?}", config.database);
    }
    println!();
    println!("Live objects: {}", keys);

    Ok(())
}

// =============================================================================
// PURGE COMMAND
// =============================================================================

/// Evict expired entries and reclaim database space.
pub fn cmd_purge(config: &ServerConfig, json_mode: bool) -> Result<(), ObjexError> {
    if config.backend.as_str() != "redb" {
        return Err(ObjexError::BackendUnavailable(
            "Purge requires the redb backend; the memory backend starts empty".to_string(),
        ));
    }

    let mut backend = RedbBackend::open(&config.database)?;
    let evicted = backend.purge_expired()?;
    backend.compact()?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.to_string_lossy(),
            "evicted": evicted,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "Evicted {} expired entries from {:?}",
        evicted, config.database
    );

    Ok(())
}
