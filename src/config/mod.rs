//! Configuration management for flatexport
//!
//! This module handles loading, parsing, and validating configuration:
//! - Configuration file (TOML format)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::utils::validate;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Default MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database used when neither the command line nor the URI names one
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Server selection timeout in seconds
    #[serde(default = "default_server_selection_timeout")]
    pub server_selection_timeout: u64,

    /// Number of connection attempts before giving up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

/// Export defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Attribute the date range applies to
    #[serde(default = "default_date_attr")]
    pub date_attr: String,

    /// Attribute rows are sorted by
    #[serde(default = "default_sort_attr")]
    pub sort_attr: String,

    /// CSV field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Documents scanned per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retries for transient page failures
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Show a progress spinner while fetching
    #[serde(default = "default_progress")]
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_server_selection_timeout() -> u64 {
    30
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_date_attr() -> String {
    "created_at".to_string()
}

fn default_sort_attr() -> String {
    "created_date".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_page_size() -> u32 {
    1000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            server_selection_timeout: default_server_selection_timeout(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_attr: default_date_attr(),
            sort_attr: default_sort_attr(),
            delimiter: default_delimiter(),
            page_size: default_page_size(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            progress: default_progress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, falling back to defaults
    ///
    /// A missing file at the default location is not an error; a missing
    /// file that was asked for explicitly is.
    ///
    /// # Arguments
    /// * `path` - Explicit config path, or None for the default location
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::Unreadable(format!(
                    "{} does not exist",
                    path.display()
                ))
                .into());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".flatexport")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if !validate::is_valid_connection_uri(&self.connection.uri) {
            return Err(invalid("connection.uri", &self.connection.uri));
        }
        if self.export.page_size == 0 {
            return Err(invalid("export.page_size", "0"));
        }
        if self.export.date_attr.trim().is_empty() {
            return Err(invalid("export.date_attr", &self.export.date_attr));
        }
        if self.export.sort_attr.trim().is_empty() {
            return Err(invalid("export.sort_attr", &self.export.sort_attr));
        }
        validate_delimiter(self.export.delimiter)
            .map_err(|_| invalid("export.delimiter", &self.export.delimiter.to_string()))?;
        Ok(())
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.export.retry_backoff_ms)
    }
}

/// Check that a delimiter can be written as a single unquoted byte
pub fn validate_delimiter(delimiter: char) -> std::result::Result<(), ()> {
    if delimiter.is_ascii() && !matches!(delimiter, '"' | '\n' | '\r') {
        Ok(())
    } else {
        Err(())
    }
}

fn invalid(field: &str, value: &str) -> crate::error::ExportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    /// Subscriber filter directives for this level
    ///
    /// Warnings about dropped columns stay visible at `Error`.
    pub fn log_filter(&self) -> String {
        let level = self.to_tracing_level().as_str().to_lowercase();
        match self {
            LogLevel::Error => format!("{level},{PROJECTION_TARGET}=warn"),
            _ => level,
        }
    }
}

const PROJECTION_TARGET: &str = "flatexport::project";
