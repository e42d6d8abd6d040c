//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::anchor::parse_offset;
use crate::store::StatisticsInterval;
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data region the connection is registered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Us,
    #[default]
    Eu,
}

impl std::str::FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "eu" => Ok(Region::Eu),
            other => Err(ConfigError::Invalid(format!("unknown region '{}'", other))),
        }
    }
}

/// Connection credentials and delivery target
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub auth_token: String,

    pub end_user_id: Option<String>,

    pub callback_url: Option<String>,

    #[serde(default)]
    pub region: Region,
}

/// Query defaults
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_range_days")]
    pub default_range_days: i64,

    #[serde(default = "default_sleep_range_hours")]
    pub sleep_range_hours: i64,

    #[serde(default = "default_statistics_interval")]
    pub statistics_interval: String,

    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default = "default_route_page_size")]
    pub route_page_size: usize,
}

/// Longest default lookback a configuration may ask for
pub const MAX_RANGE_DAYS: i64 = 36_500;

fn default_range_days() -> i64 {
    7
}

fn default_sleep_range_hours() -> i64 {
    24
}

fn default_statistics_interval() -> String {
    "1d".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_route_page_size() -> usize {
    500
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_range_days: default_range_days(),
            sleep_range_hours: default_sleep_range_hours(),
            statistics_interval: default_statistics_interval(),
            utc_offset: default_utc_offset(),
            route_page_size: default_route_page_size(),
        }
    }
}

impl QueryConfig {
    /// Parsed statistics bucket size
    pub fn interval(&self) -> Result<StatisticsInterval, ConfigError> {
        self.statistics_interval
            .parse()
            .map_err(|e: crate::store::ParseIntervalError| ConfigError::Invalid(e.to_string()))
    }

    /// Parsed calendar offset of the caller
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_offset(&self.utc_offset).ok_or_else(|| {
            ConfigError::Invalid(format!("invalid utc_offset '{}'", self.utc_offset))
        })
    }
}

/// Webhook delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout")]
    pub timeout_ms: u64,
}

fn default_webhook_timeout() -> u64 {
    10_000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_webhook_timeout(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid(format!("unknown log format '{}'", other))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("vitalis").join("config.toml")),
            Some(PathBuf::from("/etc/vitalis/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Connection overrides
        if let Ok(app_id) = std::env::var("VITALIS_APP_ID") {
            self.connection.app_id = app_id;
        }
        if let Ok(token) = std::env::var("VITALIS_AUTH_TOKEN") {
            self.connection.auth_token = token;
        }
        if let Ok(user) = std::env::var("VITALIS_END_USER_ID") {
            self.connection.end_user_id = Some(user);
        }
        if let Ok(url) = std::env::var("VITALIS_CALLBACK_URL") {
            self.connection.callback_url = Some(url);
        }
        if let Ok(region) = std::env::var("VITALIS_REGION") {
            match region.parse() {
                Ok(r) => self.connection.region = r,
                Err(e) => tracing::warn!("Ignoring VITALIS_REGION: {}", e),
            }
        }

        // Query overrides
        if let Ok(offset) = std::env::var("VITALIS_UTC_OFFSET") {
            self.query.utc_offset = offset;
        }
        if let Ok(interval) = std::env::var("VITALIS_STATISTICS_INTERVAL") {
            self.query.statistics_interval = interval;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("VITALIS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VITALIS_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => tracing::warn!("Ignoring VITALIS_LOG_FORMAT: {}", e),
            }
        }
    }

    /// Check that the configuration can be used to open a connection
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.app_id.trim().is_empty() {
            return Err(ConfigError::Invalid("app_id must not be empty".into()));
        }
        if self.connection.auth_token.trim().is_empty() {
            return Err(ConfigError::Invalid("auth_token must not be empty".into()));
        }
        if let Some(url) = &self.connection.callback_url {
            validate_callback_url(url)?;
        }
        if self.query.default_range_days <= 0 || self.query.sleep_range_hours <= 0 {
            return Err(ConfigError::Invalid("query ranges must be positive".into()));
        }
        if self.query.default_range_days > MAX_RANGE_DAYS
            || self.query.sleep_range_hours > MAX_RANGE_DAYS * 24
        {
            return Err(ConfigError::Invalid(format!(
                "query ranges must not exceed {} days",
                MAX_RANGE_DAYS
            )));
        }
        self.query.interval()?;
        self.query.offset()?;
        Ok(())
    }
}

/// Check that a callback URL is an absolute http(s) URL
pub fn validate_callback_url(url: &str) -> Result<reqwest::Url, ConfigError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::Invalid(format!("invalid callback_url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ConfigError::Invalid(format!(
            "callback_url must use http or https, got '{}'",
            scheme
        ))),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Vitalis Configuration
#
# Environment variables override these settings:
# - VITALIS_APP_ID
# - VITALIS_AUTH_TOKEN
# - VITALIS_END_USER_ID
# - VITALIS_CALLBACK_URL
# - VITALIS_REGION
# - VITALIS_UTC_OFFSET
# - VITALIS_STATISTICS_INTERVAL
# - VITALIS_LOG_LEVEL
# - VITALIS_LOG_FORMAT

[connection]
# Application credentials
app_id = ""
auth_token = ""

# Identifier of the user the data belongs to
# end_user_id = "user-123"

# Where fetch-and-post delivers normalized records
# callback_url = "https://example.com/webhooks/health"

# Data region: us or eu
region = "eu"

[query]
# Range used when a fetch gives no explicit bounds (days)
default_range_days = 7

# Range used for sleep when no explicit bounds are given (hours)
sleep_range_hours = 24

# Statistics window size: <n><m|h|d|w>
statistics_interval = "1d"

# Calendar offset used to align window anchors
utc_offset = "+00:00"

# Locations fetched per route page
route_page_size = 500

[webhook]
# Delivery request timeout (ms)
timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/vitalis/vitalis.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid() -> Config {
        let mut config = Config::default();
        config.connection.app_id = "app".into();
        config.connection.auth_token = "token".into();
        config
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.query.default_range_days, 7);
        assert_eq!(config.query.route_page_size, 500);
        assert_eq!(config.connection.region, Region::Eu);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.query.interval().unwrap(), StatisticsInterval::Days(1));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[connection]
app_id = "app"
auth_token = "token"
region = "us"

[query]
statistics_interval = "1h"
utc_offset = "+02:00"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.connection.region, Region::Us);
        assert_eq!(config.query.interval().unwrap(), StatisticsInterval::Hours(1));
        assert_eq!(config.query.offset().unwrap().local_minus_utc(), 7200);
        // Unspecified sections fall back to defaults
        assert_eq!(config.webhook.timeout_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/vitalis.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[query\nbroken").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.connection.app_id = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid();
        config.connection.callback_url = Some("ftp://example.com/in".into());
        assert!(config.validate().is_err());

        let mut config = valid();
        config.query.statistics_interval = "often".into();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.query.utc_offset = "CET".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_range_bounds() {
        let mut config = valid();
        config.query.default_range_days = MAX_RANGE_DAYS;
        config.query.sleep_range_hours = MAX_RANGE_DAYS * 24;
        assert!(config.validate().is_ok());

        let mut config = valid();
        config.query.default_range_days = i64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid();
        config.query.sleep_range_hours = MAX_RANGE_DAYS * 24 + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid();
        config.query.default_range_days = 0;
        assert!(config.validate().is_err());
    }
}
