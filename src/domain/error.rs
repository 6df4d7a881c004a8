//! Domain-level error types for channel-export.
//!
//! All errors are typed with `thiserror`. `AppError` covers everything that
//! can stop or degrade an export run; `EntityError` describes a single
//! malformed formatting annotation and is always recovered locally.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The message source failed in a way that may succeed on retry
    /// (network hiccup, flood wait, locked archive).
    #[error("Transient fetch error: {message}")]
    TransientFetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The message source refused the request permanently (auth, permission, bad peer).
    #[error("Source error: {message}")]
    Source { message: String },

    /// A transient condition persisted past the retry budget.
    #[error("Giving up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Rendering one message failed. Never aborts the page.
    #[error("Failed to render message {message_id}: {message}")]
    Render { message_id: i64, message: String },

    /// Failed to open or query the local archive database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    ///
    /// Busy and locked databases are reported as transient so the driver backs off
    /// instead of failing the export.
    pub fn database(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let transient = matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        );

        if transient {
            Self::TransientFetch {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        } else {
            Self::Database {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a transient fetch error without an underlying cause.
    #[cfg(test)]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientFetch {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the failed operation can help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }
}

/// A formatting entity that cannot be applied to its message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// `offset + length` runs past the end of the text.
    #[error("entity {offset}+{length} exceeds text length {text_len} (UTF-16 units)")]
    OutOfBounds {
        offset: usize,
        length: usize,
        text_len: usize,
    },

    /// A boundary lands between the two halves of a surrogate pair.
    #[error("entity boundary {position} splits a character")]
    SplitsCharacter { position: usize },

    /// The entity starts before the end of the previously applied entity.
    #[error("entity at {offset} overlaps previous entity ending at {previous_end}")]
    Overlapping { offset: usize, previous_end: usize },
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
