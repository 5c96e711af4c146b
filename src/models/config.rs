//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Search endpoint and query behavior settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Shard output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Console logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.search.user_agent.trim().is_empty() {
            return Err(AppError::validation("search.user_agent is empty"));
        }
        if self.search.timeout_secs == 0 {
            return Err(AppError::validation("search.timeout_secs must be > 0"));
        }
        if self.search.limit == 0 || self.search.limit > 100 {
            return Err(AppError::validation("search.limit must be in 1..=100"));
        }
        if self.search.interval_minutes == 0 || self.search.interval_minutes > 1440 {
            return Err(AppError::validation(
                "search.interval_minutes must be in 1..=1440",
            ));
        }
        Url::parse(&self.search.endpoint)
            .map_err(|e| AppError::validation(format!("search.endpoint is not a URL: {e}")))?;
        self.search.offset()?;
        if self.output.posts_per_file == 0 {
            return Err(AppError::validation("output.posts_per_file must be > 0"));
        }
        if self.output.file_prefix.trim().is_empty() {
            return Err(AppError::validation("output.file_prefix is empty"));
        }
        Ok(())
    }
}

/// Search endpoint and query behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Full URL of the post search endpoint
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// Language filter passed to the endpoint
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Page size requested per call (endpoint caps at 100)
    #[serde(default = "defaults::limit")]
    pub limit: u32,

    /// Wall-clock length of each crawl window in minutes
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u32,

    /// Fixed UTC offset applied to window bounds, e.g. "-03:00"
    #[serde(default = "defaults::timezone_offset")]
    pub timezone_offset: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl SearchConfig {
    /// Parse the configured timezone offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.timezone_offset.parse::<FixedOffset>().map_err(|e| {
            AppError::validation(format!(
                "search.timezone_offset {:?} is not a UTC offset: {e}",
                self.timezone_offset
            ))
        })
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            language: defaults::language(),
            limit: defaults::limit(),
            interval_minutes: defaults::interval_minutes(),
            timezone_offset: defaults::timezone_offset(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Shard output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving shard files and the run log
    #[serde(default = "defaults::base_dir")]
    pub base_dir: String,

    /// Records per shard before rotation
    #[serde(default = "defaults::posts_per_file")]
    pub posts_per_file: usize,

    /// Prefix for shard file names
    #[serde(default = "defaults::file_prefix")]
    pub file_prefix: String,

    /// File name of the append-only run log
    #[serde(default = "defaults::run_log")]
    pub run_log: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: defaults::base_dir(),
            posts_per_file: defaults::posts_per_file(),
            file_prefix: defaults::file_prefix(),
            run_log: defaults::run_log(),
        }
    }
}

/// Console logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for console output
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Print per-window progress lines
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            show_progress: defaults::show_progress(),
        }
    }
}

mod defaults {
    // Search defaults
    pub fn endpoint() -> String {
        "https://public.api.bsky.app/xrpc/app.bsky.feed.searchPosts".into()
    }
    pub fn language() -> String {
        "pt".into()
    }
    pub fn limit() -> u32 {
        100
    }
    pub fn interval_minutes() -> u32 {
        60
    }
    pub fn timezone_offset() -> String {
        "-03:00".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; skyharvest/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }

    // Output defaults
    pub fn base_dir() -> String {
        "data/shards".into()
    }
    pub fn posts_per_file() -> usize {
        5000
    }
    pub fn file_prefix() -> String {
        "posts".into()
    }
    pub fn run_log() -> String {
        "run.log".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn show_progress() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let mut config = Config::default();
        config.search.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_limit() {
        let mut config = Config::default();
        config.search.limit = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_interval() {
        let mut config = Config::default();
        config.search.interval_minutes = 0;
        assert!(config.validate().is_err());
        config.search.interval_minutes = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_rotation_threshold() {
        let mut config = Config::default();
        config.output.posts_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_offset() {
        let mut config = Config::default();
        config.search.timezone_offset = "America/Sao_Paulo".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn offset_parses_sign_and_minutes() {
        let mut config = SearchConfig::default();
        config.timezone_offset = "+05:30".to_string();
        let offset = config.offset().unwrap();
        assert_eq!(offset.local_minus_utc(), (5 * 60 + 30) * 60);
    }
}
