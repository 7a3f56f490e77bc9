//! Utility functions and helpers for flatexport
//!
//! This module provides common utility functions used throughout the application:
//! - Date and time parsing
//! - File system helpers
//! - Validation functions

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{InputError, Result};

/// Time utilities
pub mod time {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    /// Offset-carrying layouts accepted besides RFC 3339
    const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

    /// Zone-less layouts, interpreted as UTC
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    /// Parse an ISO 8601 date or date-time string
    ///
    /// Date-only strings are midnight UTC; date-times without a zone are UTC.
    ///
    /// # Arguments
    /// * `s` - Candidate date string
    ///
    /// # Returns
    /// * `Option<DateTime<Utc>>` - Parsed instant, or None if not a date
    pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, format) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(dt.and_utc());
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Seconds since the Unix epoch, with sub-second precision
    pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
        dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
    }

    /// Convert a date bound argument to milliseconds since the Unix epoch
    ///
    /// # Arguments
    /// * `s` - ISO 8601 or `YYYY-MM-DD` string
    ///
    /// # Returns
    /// * `Result<i64>` - Epoch milliseconds or `InvalidDateFormat`
    pub fn date_bound_to_millis(s: &str) -> Result<i64> {
        parse_datetime(s)
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| InputError::InvalidDateFormat(s.to_string()).into())
    }

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1m 30s")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if secs == 0 {
            return format!("{}ms", millis);
        }

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, millis)
        }
    }
}

/// File system utilities
pub mod fs {
    use super::*;

    /// Create the parent directory of a file path when it is missing
    pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Default output file for a collection export, e.g. `orders.csv`
    pub fn default_output_path(collection: &str, extension: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", collection, extension))
    }

    /// Expand home directory in path
    ///
    /// # Arguments
    /// * `path` - Path potentially starting with ~
    ///
    /// # Returns
    /// * `PathBuf` - Expanded path
    pub fn expand_home(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }
}

/// Validation utilities
pub mod validate {
    /// Check if collection name is valid
    ///
    /// # Arguments
    /// * `name` - Collection name
    ///
    /// # Returns
    /// * `bool` - True if valid
    pub fn is_valid_collection_name(name: &str) -> bool {
        if name.is_empty() || name.len() > 255 {
            return false;
        }

        if name.starts_with("system.") {
            return false;
        }

        !name.contains('$') && !name.contains('\0')
    }

    /// Check if connection URI is valid
    pub fn is_valid_connection_uri(uri: &str) -> bool {
        uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")
    }
}
