//! # Daemon Configuration
//!
//! Layered configuration for the objex daemon. Values resolve in precedence
//! order: built-in defaults, then a TOML config file, then environment
//! variables, then command-line flags (applied by the CLI layer).
//!
//! ## Environment Variables
//!
//! - `OBJEX_API_KEY`: enables bearer authentication when set and non-empty
//! - `OBJEX_RATE_LIMIT`: requests per second (0 disables rate limiting)
//! - `OBJEX_CORS_ORIGINS`: comma-separated allowed origins, or "*" for all
//!
//! The resolved configuration is read once at startup and carried in the
//! router state, so request handling never touches the environment.

use objex_core::ObjexError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default bind host.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
const DEFAULT_PORT: u16 = 8080;

/// Default storage backend.
const DEFAULT_BACKEND: &str = "memory";

/// Default database path for the redb backend.
const DEFAULT_DATABASE: &str = "objex.db";

/// Default requests-per-second budget.
const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// RESOLVED CONFIGURATION
// =============================================================================

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Storage backend: "memory" (volatile) or "redb" (embedded database).
    pub backend: String,

    /// Database path, used by the redb backend.
    pub database: PathBuf,

    /// API key for bearer authentication. `None` disables authentication.
    pub api_key: Option<String>,

    /// Requests per second across all clients. 0 disables rate limiting.
    pub rate_limit: u32,

    /// Allowed CORS origins: "*", a comma-separated list, or `None` for
    /// localhost only.
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backend: DEFAULT_BACKEND.to_string(),
            database: PathBuf::from(DEFAULT_DATABASE),
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
        }
    }
}

/// Optional values read from a TOML config file. Absent keys keep whatever
/// the previous layer resolved.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    backend: Option<String>,
    database: Option<PathBuf>,
    api_key: Option<String>,
    rate_limit: Option<u32>,
    cors_origins: Option<String>,
}

impl ServerConfig {
    /// Resolve configuration from defaults, an optional TOML file, and the
    /// environment. CLI flags are overlaid by the caller afterwards.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ObjexError> {
        let mut config = Self::default();
        if let Some(path) = config_path {
            config.apply_file(path)?;
        }
        config.apply_env();

        // An empty key (from any layer) means authentication is off.
        config.api_key = config.api_key.filter(|k| !k.is_empty());
        Ok(config)
    }

    /// Overlay values from a TOML file. A missing or malformed file is an
    /// error: the operator asked for it explicitly.
    fn apply_file(&mut self, path: &Path) -> Result<(), ObjexError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ObjexError::IoError(format!("Cannot read config file {:?}: {}", path, e))
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| {
            ObjexError::IoError(format!("Cannot parse config file {:?}: {}", path, e))
        })?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(backend) = file.backend {
            self.backend = backend;
        }
        if let Some(database) = file.database {
            self.database = database;
        }
        if let Some(api_key) = file.api_key {
            self.api_key = Some(api_key);
        }
        if let Some(rate_limit) = file.rate_limit {
            self.rate_limit = rate_limit;
        }
        if let Some(cors_origins) = file.cors_origins {
            self.cors_origins = Some(cors_origins);
        }
        Ok(())
    }

    /// Overlay values from the environment.
    fn apply_env(&mut self) {
        if let Some(key) = read_env("OBJEX_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(raw) = read_env("OBJEX_RATE_LIMIT") {
            match raw.parse() {
                Ok(limit) => self.rate_limit = limit,
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric OBJEX_RATE_LIMIT: {:?}", raw);
                }
            }
        }
        if let Some(origins) = read_env("OBJEX_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
    }
}

/// Read an environment variable, treating empty values as unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================
