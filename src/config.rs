//! # Monitor Configuration
//!
//! Everything the daemon needs to reach the phone, the mirror sheet and to pace its polling.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [device]
//! adb_path = "/usr/bin/adb"
//! serial = "R58N123ABC"
//! settle_delay_ms = 1000
//!
//! [mirror]
//! csv_path = "print-records.csv"
//!
//! [monitor]
//! poll_interval_secs = 300
//! max_scroll_iterations = 50
//! ledger_export = "ledger.json"
//!
//! [logging]
//! level = "debug"
//! ```

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::ledger::{DEFAULT_LEDGER_KEEP, DEFAULT_LEDGER_LIMIT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the device, the mirror and the polling loop.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        self.logging.max_level()?;
        if self.device.adb_path.trim().is_empty() {
            return Err(ConfigError::Invalid("device.adb_path cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// How to reach the phone running the companion app.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Device serial passed as `adb -s`; the only attached device when unset.
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_remote_dump_path")]
    pub remote_dump_path: String,
    /// Pause before and after every tap, swipe and key press.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
            remote_dump_path: default_remote_dump_path(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Where job records are mirrored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { csv_path: default_csv_path() }
    }
}

/// Polling cadence and reconciliation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Upper bound on swipes in one scroll loop, in case the list flickers forever.
    #[serde(default = "default_max_scroll_iterations")]
    pub max_scroll_iterations: usize,
    #[serde(default = "default_ledger_limit")]
    pub ledger_limit: usize,
    #[serde(default = "default_ledger_keep")]
    pub ledger_keep: usize,
    /// Write the ledger as JSON here after every completed cycle.
    #[serde(default)]
    pub ledger_export: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            max_scroll_iterations: default_max_scroll_iterations(),
            ledger_limit: default_ledger_limit(),
            ledger_keep: default_ledger_keep(),
            ledger_export: None,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_scroll_iterations == 0 {
            return Err(ConfigError::Invalid(
                "monitor.max_scroll_iterations must be at least 1".to_string(),
            ));
        }
        if self.ledger_keep > self.ledger_limit {
            return Err(ConfigError::Invalid(format!(
                "monitor.ledger_keep ({}) cannot exceed monitor.ledger_limit ({})",
                self.ledger_keep, self.ledger_limit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

fn default_adb_path() -> String { "adb".to_string() }
fn default_remote_dump_path() -> String { "/sdcard/view.xml".to_string() }
fn default_settle_delay_ms() -> u64 { 1000 }
fn default_csv_path() -> PathBuf { PathBuf::from("print-records.csv") }
fn default_poll_interval_secs() -> u64 { 300 }
fn default_retry_delay_secs() -> u64 { 300 }
fn default_max_scroll_iterations() -> usize { 50 }
fn default_ledger_limit() -> usize { DEFAULT_LEDGER_LIMIT }
fn default_ledger_keep() -> usize { DEFAULT_LEDGER_KEEP }
fn default_log_level() -> String { "info".to_string() }

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
