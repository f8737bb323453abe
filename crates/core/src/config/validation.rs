//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

const MAX_BYTES_LIMIT: usize = 100 * 1024 * 1024;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.to_string(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `generation` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a seed path does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BYTES_LIMIT).contains(&self.max_bytes) {
            return Err(invalid("max_bytes", "must be between 1 byte and 100MB"));
        }

        if !(100..=300_000).contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", "must be between 100ms and 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.generation.as_str().trim().is_empty() {
            return Err(invalid("generation", "must not be empty"));
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") || !origin.has_host() {
            return Err(invalid("origin", format!("unsupported origin: {origin}")));
        }

        if let Some(path) = self.seed_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("seed_paths", format!("{path:?} must start with '/'")));
        }

        if self.seed_paths.is_empty() {
            tracing::warn!("no seed paths configured; the first navigation after install will miss the cache");
        }

        Ok(())
    }
}
