//! Error handling module for export operations.
//!
//! This module provides:
//! - A single top-level error type ([`ExportError`]) used across the crate
//! - Kind enums for fetch, projection, input and configuration failures
//! - Classification of MongoDB driver errors into transient and fatal
//!
//! # Example
//!
//! ```rust,no_run
//! use flatexport::error::{ExportError, FetchError, Result};
//!
//! fn require_collection(exists: bool, name: &str) -> Result<()> {
//!     if !exists {
//!         return Err(FetchError::NotFound(name.to_string()).into());
//!     }
//!     Ok(())
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, ExportError, FetchError, InputError, ProjectionError,
    Result,
};
pub use mongo::is_transient;
