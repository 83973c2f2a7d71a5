//! Runtime settings for a plugin process.
//!
//! The host starts plugins without arguments or environment of its own, so
//! every setting has a default that reproduces the stock behaviour. Values are
//! read from the process environment, after a `.env` in the working directory
//! (the plugin's own folder when the host spawns it) has been loaded.

use std::{env, path::PathBuf, time::Duration};

use strum_macros::{Display, EnumString};
use tracing::level_filters::LevelFilter;

use crate::error::PluginError;

/// Variable name suffixes. The full name is `<PREFIX>_<SUFFIX>`, with the
/// prefix chosen by the plugin binary, e.g. `INDENTATION_READ_MODE`.
pub const READ_MODE: &str = "READ_MODE";
pub const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const LOG_DIR: &str = "LOG_DIR";
pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How the echo loop waits for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReadMode {
    /// Wait on the next line and relay it as soon as it arrives.
    #[default]
    Blocking,
    /// Relay whatever has arrived, then sleep for the poll interval.
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub read_mode: ReadMode,
    pub poll_interval: Duration,
    /// Directory for the rolling log file. `None` disables logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            read_mode: ReadMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

/// Loads `.env` from the working directory if there is one.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// `env_key("INDENTATION", READ_MODE)` is `INDENTATION_READ_MODE`.
pub fn env_key(prefix: &str, suffix: &str) -> String {
    format!("{prefix}_{suffix}")
}

impl PluginConfig {
    /// Reads `<prefix>_*` settings from the process environment, loading
    /// `.env` first.
    pub fn from_env(prefix: &str) -> Result<Self, PluginError> {
        load_dotenv();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing or empty keys fall back to
    /// the defaults.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, PluginError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            let key = env_key(prefix, suffix);
            lookup(&key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).map(|v| (key, v))
        };
        let mut config = Self::default();

        if let Some((key, mode)) = get(READ_MODE) {
            config.read_mode = parse_read_mode(&key, &mode)?;
        }
        if let Some((key, ms)) = get(POLL_INTERVAL_MS) {
            config.poll_interval = parse_poll_interval(&key, &ms)?;
        }
        if let Some((_, dir)) = get(LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some((key, level)) = get(LOG_LEVEL) {
            config.log_level =
                level.parse().map_err(|_| PluginError::config(key, format!("unknown log level `{level}`")))?;
        }

        Ok(config)
    }
}

fn parse_read_mode(key: &str, value: &str) -> Result<ReadMode, PluginError> {
    value
        .parse()
        .map_err(|_| PluginError::config(key, format!("expected `blocking` or `poll`, got `{value}`")))
}

/// Parses a poll interval in milliseconds. Zero is refused since it would
/// turn the poll loop into a spin.
pub fn parse_poll_interval(key: &str, value: &str) -> Result<Duration, PluginError> {
    match value.parse::<u64>() {
        Ok(0) => Err(PluginError::config(key, "poll interval must be greater than 0")),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(PluginError::config(key, format!("`{value}` is not a number of milliseconds: {e}"))),
    }
}
