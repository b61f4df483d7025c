//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default listen address for obm-api
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5780";

/// Environment variable naming the config file to load
pub const ENV_CONFIG_FILE: &str = "OBM_CONFIG";

/// Per-entity page sizes for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub books: u32,
    pub authors: u32,
    pub categories: u32,
    pub wishlist: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            books: 50,
            authors: 20,
            categories: 50,
            wishlist: 20,
        }
    }
}

/// On-disk TOML configuration (all fields optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub listen_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub covers_dir: Option<PathBuf>,
    pub google_books_api_key: Option<String>,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_path: PathBuf,
    pub covers_dir: PathBuf,
    pub google_books_api_key: Option<String>,
    pub pagination: PaginationConfig,
}

impl Config {
    /// Resolve configuration from environment, TOML file, and defaults
    pub fn resolve() -> Result<Self> {
        let toml_config = match locate_config_file() {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                load_toml_config(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                TomlConfig::default()
            }
        };
        Self::from_sources(&toml_config)
    }

    /// Combine environment variables with a loaded TOML config
    pub fn from_sources(toml_config: &TomlConfig) -> Result<Self> {
        let listen_addr = std::env::var("OBM_LISTEN_ADDR")
            .ok()
            .or_else(|| toml_config.listen_addr.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address '{listen_addr}': {e}")))?;

        let database_path = std::env::var("OBM_DATABASE_PATH")
            .ok()
            .map(PathBuf::from)
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(|| default_data_dir().join("obm.db"));

        let covers_dir = std::env::var("OBM_COVERS_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| toml_config.covers_dir.clone())
            .unwrap_or_else(|| default_data_dir().join("covers"));

        let google_books_api_key = std::env::var("OBM_GOOGLE_BOOKS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                toml_config
                    .google_books_api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
            });

        Ok(Self {
            listen_addr,
            database_path,
            covers_dir,
            google_books_api_key,
            pagination: toml_config.pagination.clone(),
        })
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
}

/// Find the config file to load, if any
///
/// Checks OBM_CONFIG, then the platform config directory, then /etc on Linux.
fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        return None;
    }

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("openbookmanager").join("config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let path = PathBuf::from("/etc/openbookmanager/config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Default data directory for the database and downloaded covers
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("openbookmanager"))
        .unwrap_or_else(|| PathBuf::from("./openbookmanager"))
}
