//! # Configuration
//!
//! Application configuration loading and management.
//!
//! # Configuration Sources
//!
//! Configuration is loaded in the following order (later sources override earlier):
//! 1. Default values
//! 2. Configuration file (if exists)
//! 3. Environment variables (prefixed with `SHARE_LEDGER_`)
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SHARE_LEDGER_CONFIG_FILE` | TOML file to load | `config.toml` |
//! | `SHARE_LEDGER_LOG_LEVEL` | Log level | `info` |
//! | `SHARE_LEDGER_LOG_FORMAT` | Log format (json/pretty) | `json` |
//! | `SHARE_LEDGER_DATABASE_URL` | PostgreSQL URL | `postgres://localhost/share_ledger` |
//! | `SHARE_LEDGER_REDIS_URL` | Redis URL | `redis://127.0.0.1:6379` |
//! | `SHARE_LEDGER_CONSUMER_NAME` | Consumer name within the group | `share-ledger-1` |
//! | `SHARE_LEDGER_MAX_ACTIVE_BIDS` | Active bids per account | `10` |
//! | `SHARE_LEDGER_BID_LIFETIME_DAYS` | Bid lifetime | `10` |
//!
//! # Examples
//!
//! ```ignore
//! use share_ledger::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("consuming as {}", config.broker.consumer_name);
//! ```

use crate::application::use_cases::ListingPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse configuration.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Invalid configuration value.
    #[error("invalid config value for {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (structured logging).
    #[default]
    Json,
    /// Pretty format (human-readable).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include target (module path) in logs.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Json,
            include_target: true,
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum connection pool size.
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,

    /// Minimum connection pool size.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_pool_size(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connection_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

// ============================================================================
// Broker Configuration
// ============================================================================

/// Redis Streams broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix prepended to every topic to form the stream key.
    #[serde(default = "default_stream_prefix")]
    pub stream_prefix: String,

    /// Consumer group shared by every ledger instance.
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// This instance's name within the group.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Entries fetched per read.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a read blocks waiting for entries, in milliseconds.
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Pause after a failed read, and minimum idle time before an
    /// unacknowledged entry is delivered again, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Deliveries after which an unacknowledged entry is moved to the
    /// dead-letter stream.
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: usize,

    /// Suffix appended to a stream key to form its dead-letter stream.
    #[serde(default = "default_dead_letter_suffix")]
    pub dead_letter_suffix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            stream_prefix: default_stream_prefix(),
            consumer_group: default_consumer_group(),
            consumer_name: default_consumer_name(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_deliveries: default_max_deliveries(),
            dead_letter_suffix: default_dead_letter_suffix(),
        }
    }
}

// ============================================================================
// Trading Configuration
// ============================================================================

/// Listing limits and settlement monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum simultaneously active bids per account.
    #[serde(default = "default_max_active_bids")]
    pub max_active_bids_per_account: u64,

    /// Days until a new bid expires.
    #[serde(default = "default_bid_lifetime_days")]
    pub bid_lifetime_days: i64,

    /// Age after which a pending operation is reported, in seconds.
    #[serde(default = "default_pending_warning_age")]
    pub pending_warning_age_secs: u64,

    /// How often pending operations are scanned, in seconds.
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_active_bids_per_account: default_max_active_bids(),
            bid_lifetime_days: default_bid_lifetime_days(),
            pending_warning_age_secs: default_pending_warning_age(),
            monitor_interval_secs: default_monitor_interval(),
        }
    }
}

impl TradingConfig {
    /// Listing limits for [`crate::application::use_cases::ListingService`].
    #[must_use]
    pub fn listing_policy(&self) -> ListingPolicy {
        ListingPolicy {
            max_active_bids_per_account: self.max_active_bids_per_account,
            bid_lifetime_days: self.bid_lifetime_days,
        }
    }

    /// Age after which a pending operation is reported.
    #[must_use]
    pub fn pending_warning_age(&self) -> Duration {
        Duration::from_secs(self.pending_warning_age_secs)
    }

    /// Scan interval of the stale pending monitor.
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Broker configuration.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Trading limits and monitoring.
    #[serde(default)]
    pub trading: TradingConfig,

    /// Service name for tracing.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Environment (development, staging, production).
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            database: DatabaseConfig::default(),
            broker: BrokerConfig::default(),
            trading: TradingConfig::default(),
            service_name: default_service_name(),
            environment: default_environment(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment variables and optional config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path = std::env::var("SHARE_LEDGER_CONFIG_FILE")
            .unwrap_or_else(|_| "config.toml".to_string());

        if Path::new(&config_path).exists() {
            config = Self::from_file(&config_path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        // Logging
        if let Ok(level) = std::env::var("SHARE_LEDGER_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(format) = std::env::var("SHARE_LEDGER_LOG_FORMAT") {
            self.log.format = match format.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            };
        }

        // Database
        if let Ok(url) = std::env::var("SHARE_LEDGER_DATABASE_URL") {
            self.database.url = url;
        }

        // Broker
        if let Ok(url) = std::env::var("SHARE_LEDGER_REDIS_URL") {
            self.broker.redis_url = url;
        }
        if let Ok(name) = std::env::var("SHARE_LEDGER_CONSUMER_NAME") {
            self.broker.consumer_name = name;
        }

        // Trading
        if let Ok(max) = std::env::var("SHARE_LEDGER_MAX_ACTIVE_BIDS")
            && let Ok(n) = max.parse()
        {
            self.trading.max_active_bids_per_account = n;
        }
        if let Ok(days) = std::env::var("SHARE_LEDGER_BID_LIFETIME_DAYS")
            && let Ok(n) = days.parse()
        {
            self.trading.bid_lifetime_days = n;
        }

        // Service
        if let Ok(name) = std::env::var("SHARE_LEDGER_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Ok(env) = std::env::var("SHARE_LEDGER_ENVIRONMENT") {
            self.environment = env;
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "log.level",
                format!(
                    "invalid log level '{}', must be one of: {:?}",
                    self.log.level, valid_levels
                ),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be at least 1",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::invalid(
                "database.min_connections",
                "cannot exceed max_connections",
            ));
        }

        if self.broker.consumer_group.trim().is_empty() {
            return Err(ConfigError::invalid("broker.consumer_group", "cannot be empty"));
        }
        if self.broker.consumer_name.trim().is_empty() {
            return Err(ConfigError::invalid("broker.consumer_name", "cannot be empty"));
        }
        if self.broker.batch_size == 0 {
            return Err(ConfigError::invalid("broker.batch_size", "must be at least 1"));
        }
        if self.broker.max_deliveries == 0 {
            return Err(ConfigError::invalid("broker.max_deliveries", "must be at least 1"));
        }
        if self.broker.dead_letter_suffix.is_empty() {
            return Err(ConfigError::invalid("broker.dead_letter_suffix", "cannot be empty"));
        }

        if self.trading.max_active_bids_per_account == 0 {
            return Err(ConfigError::invalid(
                "trading.max_active_bids_per_account",
                "must be at least 1",
            ));
        }
        if self.trading.bid_lifetime_days <= 0 {
            return Err(ConfigError::invalid(
                "trading.bid_lifetime_days",
                "must be positive",
            ));
        }
        if self.trading.monitor_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "trading.monitor_interval_secs",
                "must be positive",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost/share_ledger".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_stream_prefix() -> String {
    "share-ledger:".to_string()
}

fn default_consumer_group() -> String {
    "share-ledger".to_string()
}

fn default_consumer_name() -> String {
    "share-ledger-1".to_string()
}

fn default_batch_size() -> usize {
    16
}

fn default_block_ms() -> u64 {
    5000
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_deliveries() -> usize {
    20
}

fn default_dead_letter_suffix() -> String {
    ":dead-letter".to_string()
}

fn default_max_active_bids() -> u64 {
    crate::application::use_cases::DEFAULT_MAX_ACTIVE_BIDS
}

fn default_bid_lifetime_days() -> i64 {
    crate::application::use_cases::DEFAULT_BID_LIFETIME_DAYS
}

fn default_pending_warning_age() -> u64 {
    15 * 60
}

fn default_monitor_interval() -> u64 {
    60
}

fn default_service_name() -> String {
    "share-ledger".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}
