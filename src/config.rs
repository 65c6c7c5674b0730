use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Archive files
    pub archive_path: PathBuf,
    pub legacy_archive_path: Option<PathBuf>,

    // Comment endpoint
    pub comment_api_url: String,
    pub fetch_timeout: Duration,
    pub fetch_max_attempts: u32,
    pub fetch_base_delay: Duration,
    pub fetch_jitter: Duration,
    pub fetch_settle_delay: Duration,
    pub fetch_settle_jitter: Duration,

    // Run behaviour
    pub refresh_comments: bool,
    pub clear_on_soft_failure: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Archive files
            archive_path: PathBuf::from(required_env("ARCHIVE_PATH")?),
            legacy_archive_path: optional_env("LEGACY_ARCHIVE_PATH").map(PathBuf::from),

            // Comment endpoint
            comment_api_url: env_or_default(
                "COMMENT_API_URL",
                "http://www.pkuhelper.com/services/pkuhole/api.php",
            ),
            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 5)?),
            fetch_max_attempts: parse_env_u32("FETCH_MAX_ATTEMPTS", 10)?,
            fetch_base_delay: Duration::from_millis(parse_env_u64("FETCH_BASE_DELAY_MS", 2000)?),
            fetch_jitter: Duration::from_millis(parse_env_u64("FETCH_JITTER_MS", 1000)?),
            fetch_settle_delay: Duration::from_millis(parse_env_u64("FETCH_SETTLE_DELAY_MS", 500)?),
            fetch_settle_jitter: Duration::from_millis(parse_env_u64(
                "FETCH_SETTLE_JITTER_MS",
                500,
            )?),

            // Run behaviour
            refresh_comments: parse_env_bool("REFRESH_COMMENTS", true)?,
            clear_on_soft_failure: parse_env_bool("CLEAR_ON_SOFT_FAILURE", false)?,
        })
    }

    /// Configuration with no delays, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            archive_path: PathBuf::from("./data/test.txt"),
            legacy_archive_path: None,
            comment_api_url: "http://127.0.0.1:9/api.php".to_string(),
            fetch_timeout: Duration::from_secs(2),
            fetch_max_attempts: 3,
            fetch_base_delay: Duration::ZERO,
            fetch_jitter: Duration::ZERO,
            fetch_settle_delay: Duration::ZERO,
            fetch_settle_jitter: Duration::ZERO,
            refresh_comments: true,
            clear_on_soft_failure: false,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "ARCHIVE_PATH".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.fetch_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.refresh_comments && self.comment_api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "COMMENT_API_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.legacy_archive_path.as_ref() == Some(&self.archive_path) {
            return Err(ConfigError::InvalidValue {
                name: "LEGACY_ARCHIVE_PATH".to_string(),
                message: "must differ from ARCHIVE_PATH".to_string(),
            });
        }
        Ok(())
    }

    /// Retry behaviour for comment requests.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_max_attempts,
            base_delay: self.fetch_base_delay,
            jitter: self.fetch_jitter,
            settle_delay: self.fetch_settle_delay,
            settle_jitter: self.fetch_settle_jitter,
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
