use std::{fmt, io};

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ExportError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Fetching rows from the store failed.
    Fetch(FetchError),

    /// Column projection failed.
    Projection(ProjectionError),

    /// User supplied input could not be used.
    Input(InputError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors outside of page fetching.
    MongoDb(mongodb::error::Error),

    /// JSON serialization errors.
    Json(serde_json::Error),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,
}

/// Errors raised while paging through a collection.
#[derive(Debug)]
pub enum FetchError {
    /// The referenced collection does not exist.
    NotFound(String),

    /// A single page request failed.
    PageFailed { transient: bool, message: String },

    /// A transient failure persisted through every retry.
    RetriesExhausted { attempts: u32, message: String },
}

/// Errors raised while restricting rows to a column list.
#[derive(Debug)]
pub enum ProjectionError {
    /// Requested columns are absent and missing columns are not ignored.
    SchemaMismatch { missing: Vec<String> },

    /// Every requested column was filtered away.
    NoColumnsRemaining,
}

/// Errors in arguments or input files supplied by the caller.
#[derive(Debug)]
pub enum InputError {
    /// A date bound could not be parsed.
    InvalidDateFormat(String),

    /// The input file does not exist.
    FileNotFound(String),

    /// The input CSV is malformed.
    InvalidCsv { line: usize, message: String },

    /// Invalid option value.
    InvalidOption { option: String, value: String },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Unreadable(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Connection(e) => write!(f, "Connection error: {e}"),
            ExportError::Fetch(e) => write!(f, "{e}"),
            ExportError::Projection(e) => write!(f, "{e}"),
            ExportError::Input(e) => write!(f, "{e}"),
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
            ExportError::MongoDb(e) => write!(f, "MongoDB error: {e}"),
            ExportError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound(name) => {
                write!(f, "Collection '{name}' does not exist in the target database")
            }
            FetchError::PageFailed { transient, message } => {
                if *transient {
                    write!(f, "Page fetch failed (transient): {message}")
                } else {
                    write!(f, "Page fetch failed: {message}")
                }
            }
            FetchError::RetriesExhausted { attempts, message } => {
                write!(f, "Page fetch failed after {attempts} attempts: {message}")
            }
        }
    }
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::SchemaMismatch { missing } => {
                write!(f, "Requested columns do not exist: {}", missing.join(", "))
            }
            ProjectionError::NoColumnsRemaining => write!(f, "No valid columns left to export"),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::InvalidDateFormat(value) => write!(f, "Invalid date: {value}"),
            InputError::FileNotFound(path) => write!(f, "Input file not found: {path}"),
            InputError::InvalidCsv { line, message } => {
                write!(f, "Invalid CSV at line {line}: {message}")
            }
            InputError::InvalidOption { option, value } => {
                write!(f, "Invalid value '{value}' for option '{option}'")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unreadable(msg) => write!(f, "Cannot read config file: {msg}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::MongoDb(e) => Some(e),
            ExportError::Json(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ConnectionError {}
impl std::error::Error for FetchError {}
impl std::error::Error for ProjectionError {}
impl std::error::Error for InputError {}
impl std::error::Error for ConfigError {}

impl ExportError {
    /// Whether a retry of the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExportError::Fetch(FetchError::PageFailed {
                transient: true,
                ..
            })
        )
    }
}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<mongodb::error::Error> for ExportError {
    fn from(err: mongodb::error::Error) -> Self {
        ExportError::MongoDb(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map_or(0, |p| p.line() as usize);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => ExportError::Io(e),
            _ => InputError::InvalidCsv { line, message }.into(),
        }
    }
}

impl From<ConnectionError> for ExportError {
    fn from(err: ConnectionError) -> Self {
        ExportError::Connection(err)
    }
}

impl From<FetchError> for ExportError {
    fn from(err: FetchError) -> Self {
        ExportError::Fetch(err)
    }
}

impl From<ProjectionError> for ExportError {
    fn from(err: ProjectionError) -> Self {
        ExportError::Projection(err)
    }
}

impl From<InputError> for ExportError {
    fn from(err: InputError) -> Self {
        ExportError::Input(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}
