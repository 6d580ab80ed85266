//! Configuration loading
//!
//! Resolution priority for every setting:
//! 1. Environment variable (`ITAM_DATABASE_PATH`, `ITAM_LOG_LEVEL`)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing or unreadable config file degrades to defaults with a warning;
//! it never terminates startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{Error, Result};

/// Environment variable overriding the database path
pub const ENV_DATABASE_PATH: &str = "ITAM_DATABASE_PATH";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "ITAM_LOG_LEVEL";

const DEFAULT_DATABASE_PATH: &str = "itam.db";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite database file for plans and scan records
    pub database_path: PathBuf,
    /// Tracing filter directive, e.g. "info" or "itam_inventory=debug"
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// On-disk TOML schema; every field optional so partial files are valid
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    database_path: Option<PathBuf>,
    log_level: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file, applying environment
    /// overrides on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = ServiceConfig::default();

        if let Some(path) = config_path {
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let parsed: TomlConfig = toml::from_str(&text)
                        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                    if let Some(db) = parsed.database_path {
                        config.database_path = db;
                    }
                    if let Some(level) = parsed.log_level {
                        config.log_level = level;
                    }
                }
                Err(e) => {
                    warn!(
                        "Config file {} not readable ({}); using defaults",
                        path.display(),
                        e
                    );
                }
            }
        }

        if let Ok(db) = std::env::var(ENV_DATABASE_PATH) {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        Ok(config)
    }
}
