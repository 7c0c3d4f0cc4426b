//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching kryptotrac.toml.
//! Every section is optional and falls back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::coingecko::{CoinGeckoConfig, COINGECKO_API_URL};
use crate::defi::Protocol;
use crate::pricing::PriceSettings;

/// Upper bound for cache TTLs and the sweep interval (one year)
pub const MAX_CACHE_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration structure matching kryptotrac.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coingecko: CoinGeckoSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub defi: DefiSection,
    #[serde(default)]
    pub alerts: AlertsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// CoinGecko API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoSection {
    /// API base URL (public or pro)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Optional API key (COINGECKO_API_KEY env var is used when unset)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Quote currency for prices
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
}

impl Default for CoinGeckoSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            vs_currency: default_vs_currency(),
        }
    }
}

impl CoinGeckoSection {
    /// Get API key with environment variable fallback
    /// Checks COINGECKO_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

/// Cache lifetimes section
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Interval between background sweeps of expired entries
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// TTL for single/batched coin prices and the DeFi price snapshot
    #[serde(default = "default_price_ttl_secs")]
    pub price_ttl_secs: u64,
    /// TTL for market tables
    #[serde(default = "default_market_ttl_secs")]
    pub market_ttl_secs: u64,
    /// TTL for search results
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            price_ttl_secs: default_price_ttl_secs(),
            market_ttl_secs: default_market_ttl_secs(),
            search_ttl_secs: default_search_ttl_secs(),
        }
    }
}

/// DeFi aggregation section
#[derive(Debug, Clone, Deserialize)]
pub struct DefiSection {
    /// Protocols to query
    #[serde(default = "default_protocols")]
    pub protocols: Vec<Protocol>,
    /// JSON snapshot of raw positions per wallet
    #[serde(default = "default_positions_file")]
    pub positions_file: String,
    /// Wallets aggregated when none are given on the command line
    #[serde(default)]
    pub wallets: Vec<String>,
}

impl Default for DefiSection {
    fn default() -> Self {
        Self {
            protocols: default_protocols(),
            positions_file: default_positions_file(),
            wallets: Vec::new(),
        }
    }
}

impl DefiSection {
    /// Positions file with `~` and env vars expanded
    pub fn positions_path(&self) -> PathBuf {
        expand_path(&self.positions_file)
    }
}

/// Price alerts section
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsSection {
    /// JSON array of price alerts
    #[serde(default = "default_alerts_file")]
    pub alerts_file: String,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self { alerts_file: default_alerts_file() }
    }
}

impl AlertsSection {
    pub fn alerts_path(&self) -> PathBuf {
        expand_path(&self.alerts_file)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_api_url() -> String {
    COINGECKO_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_price_ttl_secs() -> u64 {
    60
}

fn default_market_ttl_secs() -> u64 {
    60
}

fn default_search_ttl_secs() -> u64 {
    300
}

fn default_protocols() -> Vec<Protocol> {
    Protocol::ALL.to_vec()
}

fn default_positions_file() -> String {
    "data/positions.json".to_string()
}

fn default_alerts_file() -> String {
    "data/alerts.json".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, using defaults when the file does not exist
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coingecko.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.coingecko.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.coingecko.vs_currency.is_empty() {
            return Err(ConfigError::ValidationError(
                "vs_currency cannot be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("sweep_interval_secs", self.cache.sweep_interval_secs),
            ("price_ttl_secs", self.cache.price_ttl_secs),
            ("market_ttl_secs", self.cache.market_ttl_secs),
            ("search_ttl_secs", self.cache.search_ttl_secs),
        ] {
            if value == 0 || value > MAX_CACHE_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_CACHE_SECS, value
                )));
            }
        }

        if self.defi.protocols.is_empty() {
            return Err(ConfigError::ValidationError(
                "defi.protocols cannot be empty".to_string(),
            ));
        }

        for wallet in &self.defi.wallets {
            if !crate::defi::is_valid_wallet(wallet) {
                return Err(ConfigError::ValidationError(format!(
                    "invalid wallet address in defi.wallets: {}",
                    wallet
                )));
            }
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got {}",
                LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }
}

impl From<&Config> for CoinGeckoConfig {
    fn from(config: &Config) -> Self {
        CoinGeckoConfig {
            api_base_url: config.coingecko.api_url.clone(),
            api_key: config.coingecko.get_api_key(),
            timeout: Duration::from_secs(config.coingecko.timeout_secs),
        }
    }
}

impl From<&Config> for PriceSettings {
    fn from(config: &Config) -> Self {
        PriceSettings {
            vs_currency: config.coingecko.vs_currency.to_ascii_lowercase(),
            price_ttl: Duration::from_secs(config.cache.price_ttl_secs),
            market_ttl: Duration::from_secs(config.cache.market_ttl_secs),
            search_ttl: Duration::from_secs(config.cache.search_ttl_secs),
        }
    }
}
