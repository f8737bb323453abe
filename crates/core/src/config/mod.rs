//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHEFRONT_*)
//! 2. TOML config file (if CACHEFRONT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::Generation;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHEFRONT_*)
/// 2. TOML config file (if CACHEFRONT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via CACHEFRONT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin every request is forwarded to.
    ///
    /// Set via CACHEFRONT_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Socket address the proxy listens on.
    ///
    /// Set via CACHEFRONT_LISTEN environment variable.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Cache generation written and read by this deployment.
    ///
    /// Set via CACHEFRONT_GENERATION environment variable. Every other
    /// generation found in the database is deleted on activation.
    #[serde(default = "default_generation")]
    pub generation: Generation,

    /// Paths fetched into the cache on install.
    ///
    /// Set via CACHEFRONT_SEED_PATHS environment variable.
    #[serde(default = "default_seed_paths")]
    pub seed_paths: Vec<String>,

    /// User-Agent string for origin requests.
    ///
    /// Set via CACHEFRONT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via CACHEFRONT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Transport timeout for origin requests in milliseconds.
    ///
    /// Set via CACHEFRONT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cachefront.sqlite")
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_listen() -> String {
    "127.0.0.1:3000".into()
}

fn default_generation() -> Generation {
    Generation::new(concat!("v", env!("CARGO_PKG_VERSION")))
}

fn default_seed_paths() -> Vec<String> {
    vec!["/".into(), "/api/config".into()]
}

fn default_user_agent() -> String {
    "cachefront/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            listen: default_listen(),
            generation: default_generation(),
            seed_paths: default_seed_paths(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHEFRONT_`
    /// 2. TOML file from `CACHEFRONT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHEFRONT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHEFRONT_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
