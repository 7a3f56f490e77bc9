use mongodb::error::{Error, ErrorKind, RETRYABLE_WRITE_ERROR};

use super::kinds::{ExportError, FetchError};

/// Label the driver attaches to read failures that are safe to repeat.
const RETRYABLE_READ_ERROR: &str = "RetryableReadError";

/// Decide whether a MongoDB driver error is worth retrying.
///
/// Network hiccups, server selection timeouts, pool clears and errors
/// labelled retryable by the server are transient. Everything else
/// (authentication, bad commands, invalid responses) is not.
pub fn is_transient(error: &Error) -> bool {
    if error.contains_label(RETRYABLE_READ_ERROR) || error.contains_label(RETRYABLE_WRITE_ERROR) {
        return true;
    }

    matches!(
        error.kind.as_ref(),
        ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
    )
}

/// Convert a driver error raised while fetching a page into a fetch error,
/// keeping the transient/fatal classification.
pub fn page_error(error: Error) -> ExportError {
    let transient = is_transient(&error);
    FetchError::PageFailed {
        transient,
        message: error.to_string(),
    }
    .into()
}
