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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_capture_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - a supported scheme is blank or contains characters outside `[a-z0-9+.-]`
    ///
    /// Returns `ConfigError::Missing` if the selected store has no location.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_capture_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_capture_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_capture_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid {
                field: "max_capture_bytes".into(),
                reason: "must not exceed 50MB".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for scheme in &self.supported_schemes {
            let valid = !scheme.trim().is_empty()
                && scheme
                    .trim()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !valid {
                return Err(ConfigError::Invalid {
                    field: "supported_schemes".into(),
                    reason: format!("invalid scheme {scheme:?}"),
                });
            }
        }

        let location_missing = match self.store {
            super::StoreKind::Sqlite => self.db_path.as_os_str().is_empty(),
            super::StoreKind::Fs => self.cache_dir.as_os_str().is_empty(),
        };
        if location_missing {
            return Err(ConfigError::Missing {
                field: "store location".into(),
                hint: "Set OFFCACHE_DB_PATH or OFFCACHE_CACHE_DIR for the selected store".into(),
            });
        }

        if self.supported_schemes.is_empty() {
            tracing::warn!("supported_schemes is empty; every request will pass through uncached");
        }

        Ok(())
    }
}
