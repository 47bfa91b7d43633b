//! Application configuration with layered loading.
//!
//! Configuration is assembled with figment from multiple sources:
//!
//! 1. Environment variables (ADSTXT_*)
//! 2. TOML config file (if ADSTXT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ADSTXT_*)
/// 2. TOML config file (if ADSTXT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite resource cache database.
    ///
    /// Set via ADSTXT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via ADSTXT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes accepted per fetched resource.
    ///
    /// sellers.json files for large exchanges run into the tens of
    /// megabytes; the cap exists to bound one pathological host, not to
    /// exclude legitimate large files. Set via ADSTXT_MAX_BYTES.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via ADSTXT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Time-to-live for cached sellers.json rows, in seconds.
    ///
    /// Set via ADSTXT_SELLERS_JSON_TTL_SECS environment variable.
    #[serde(default = "default_sellers_json_ttl_secs")]
    pub sellers_json_ttl_secs: u64,

    /// Time-to-live for cached ads.txt rows, in seconds.
    ///
    /// Set via ADSTXT_ADS_TXT_TTL_SECS environment variable.
    #[serde(default = "default_ads_txt_ttl_secs")]
    pub ads_txt_ttl_secs: u64,

    /// Maximum number of concurrent sellers.json fetches per optimize call.
    ///
    /// Set via ADSTXT_CONCURRENCY_LIMIT environment variable.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Pause between concurrency chunks, in milliseconds.
    ///
    /// A crude backpressure heuristic, applied only when more than one
    /// chunk exists. Tunable, not required for correctness. Set via
    /// ADSTXT_CHUNK_PAUSE_MS environment variable.
    #[serde(default = "default_chunk_pause_ms")]
    pub chunk_pause_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./adstxt-cache.sqlite")
}

fn default_user_agent() -> String {
    "adstxt-optimizer/0.1".into()
}

fn default_max_bytes() -> usize {
    52_428_800 // 50MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_sellers_json_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_ads_txt_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_chunk_pause_ms() -> u64 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            sellers_json_ttl_secs: default_sellers_json_ttl_secs(),
            ads_txt_ttl_secs: default_ads_txt_ttl_secs(),
            concurrency_limit: default_concurrency_limit(),
            chunk_pause_ms: default_chunk_pause_ms(),
        }
    }
}

impl AppConfig {
    /// Fetch timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// sellers.json TTL as a Duration.
    pub fn sellers_json_ttl(&self) -> Duration {
        Duration::from_secs(self.sellers_json_ttl_secs)
    }

    /// ads.txt TTL as a Duration.
    pub fn ads_txt_ttl(&self) -> Duration {
        Duration::from_secs(self.ads_txt_ttl_secs)
    }

    /// Inter-chunk pause as a Duration.
    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ADSTXT_`
    /// 2. TOML file from `ADSTXT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ADSTXT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ADSTXT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./adstxt-cache.sqlite"));
        assert_eq!(config.user_agent, "adstxt-optimizer/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.concurrency_limit, 10);
        assert_eq!(config.chunk_pause_ms, 100);
        assert_eq!(config.sellers_json_ttl_secs, 86_400);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.sellers_json_ttl(), Duration::from_secs(86_400));
    }
}
