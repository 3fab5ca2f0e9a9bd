//! # Objex - Object Store Daemon
//!
//! The main binary for the objex key-value daemon.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) speaking the objex KV wire format
//! - CLI interface for store operations
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                apps/objex (THE DAEMON)             │
//! │                                                    │
//! │  ┌─────────────┐           ┌─────────────┐         │
//! │  │   CLI       │           │   HTTP API  │         │
//! │  │  (clap)     │           │   (axum)    │         │
//! │  └──────┬──────┘           └──────┬──────┘         │
//! │         │                         │                │
//! │         └────────────┬────────────┘                │
//! │                      ▼                             │
//! │              ┌───────────────┐                     │
//! │              │  objex-core   │                     │
//! │              │  (THE LOGIC)  │                     │
//! │              └───────────────┘                     │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! objex serve --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! objex status
//! objex purge -B redb -D objex.db
//! ```

use clap::Parser;
use objex::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing; OBJEX_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("OBJEX_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "objex=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the objex startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██████╗      ██╗███████╗██╗  ██╗
  ██╔═══██╗██╔══██╗     ██║██╔════╝╚██╗██╔╝
  ██║   ██║██████╔╝     ██║█████╗   ╚███╔╝
  ██║   ██║██╔══██╗██   ██║██╔══╝   ██╔██╗
  ╚██████╔╝██████╔╝╚█████╔╝███████╗██╔╝ ██╗
   ╚═════╝ ╚═════╝  ╚════╝ ╚══════╝╚═╝  ╚═╝

  Object Store Daemon v{}

  Store • Expire • Retrieve
"#,
        env!("CARGO_PKG_VERSION")
    );
}
