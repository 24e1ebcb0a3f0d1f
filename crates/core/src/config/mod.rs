//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::KeyRules;
use crate::cache::key::DEFAULT_CACHE_HEADERS;
use crate::policy::PolicySignal;
use crate::scheme::SchemeRegistry;

mod validation;

pub use validation::ConfigError;

/// Which cache backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Fs,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache backend.
    ///
    /// Set via OFFCACHE_STORE environment variable (`sqlite` or `fs`).
    #[serde(default)]
    pub store: StoreKind,

    /// Path to SQLite cache database (used when `store = "sqlite"`).
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory of the file store (used when `store = "fs"`).
    ///
    /// Set via OFFCACHE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// URL schemes routed through the cache layer.
    ///
    /// Set via OFFCACHE_SUPPORTED_SCHEMES environment variable.
    #[serde(default = "default_schemes")]
    pub supported_schemes: Vec<String>,

    /// Default cache preference for requests that do not specify one.
    ///
    /// Set via OFFCACHE_POLICY environment variable.
    #[serde(default)]
    pub policy: PolicySignal,

    /// Force offline-only service regardless of `policy`.
    ///
    /// Set via OFFCACHE_OFFLINE environment variable.
    #[serde(default)]
    pub offline: bool,

    /// Request headers that participate in the cache key.
    ///
    /// Set via OFFCACHE_CACHE_HEADERS environment variable.
    #[serde(default = "default_cache_headers")]
    pub cache_headers: Vec<String>,

    /// User-Agent string for forwarded requests.
    ///
    /// Set via OFFCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects the transport follows.
    ///
    /// Set via OFFCACHE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Largest body captured into the cache; bigger responses are still delivered.
    ///
    /// Set via OFFCACHE_MAX_CAPTURE_BYTES environment variable.
    #[serde(default = "default_max_capture_bytes")]
    pub max_capture_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./offcache")
}

fn default_schemes() -> Vec<String> {
    vec!["http".into(), "https".into()]
}

fn default_cache_headers() -> Vec<String> {
    DEFAULT_CACHE_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_capture_bytes() -> usize {
    10_485_760 // 10MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Sqlite,
            db_path: default_db_path(),
            cache_dir: default_cache_dir(),
            supported_schemes: default_schemes(),
            policy: PolicySignal::PreferNetwork,
            offline: false,
            cache_headers: default_cache_headers(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_capture_bytes: default_max_capture_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective default policy; `offline` wins over `policy`.
    pub fn policy_signal(&self) -> PolicySignal {
        if self.offline { PolicySignal::OfflineOnly } else { self.policy }
    }

    pub fn key_rules(&self) -> KeyRules {
        KeyRules::new(&self.cache_headers)
    }

    pub fn scheme_registry(&self) -> SchemeRegistry {
        SchemeRegistry::new(&self.supported_schemes)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("OFFCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
