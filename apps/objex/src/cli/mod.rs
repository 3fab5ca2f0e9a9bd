//! # Objex CLI Module
//!
//! This module implements the CLI interface for the objex daemon.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP KV server
//! - `status` - Show store status
//! - `purge` - Evict expired entries and compact the database
//!
//! Global flags select the backend and database and point at an optional
//! TOML config file. Flags override environment variables, which override
//! the config file, which overrides built-in defaults.

mod commands;

use crate::config::ServerConfig;
use clap::{Parser, Subcommand};
use objex_core::ObjexError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Objex - Object Store Daemon
///
/// A small key-value daemon with TTL expiry, built as the networked
/// storage backend for objex object stores.
#[derive(Parser, Debug)]
#[command(name = "objex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the object database (redb backend, default: objex.db)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "memory" (volatile) or "redb" (embedded database)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP KV server
    Serve {
        /// Host to bind to (default: 127.0.0.1)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default: 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Evict expired entries and compact the database (redb backend)
    Purge,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ObjexError> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;

    // Flags are the last precedence layer
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(config).await
        }
        Some(Commands::Status) => cmd_status(&config, json_mode).await,
        Some(Commands::Purge) => cmd_purge(&config, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode).await
        }
    }
}
