//! Domain-level error types for messenger-export.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors for the export pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database file not found at the given location.
    #[error("threads database not found at: {path}")]
    DatabaseNotFound { path: PathBuf },

    /// Failed to open or query the database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed or missing-field JSON at any nesting level.
    ///
    /// Internal to the normalizers; the public contract maps this to an
    /// empty result plus a log line, never a propagated failure.
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Attachment download failed (transport error or non-success status).
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// Invalid or corrupted data in the database.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

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
    /// Create a database error from a rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a decode error from a `serde_json` error.
    pub fn decode(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a decode error for a field the payload was missing.
    pub fn missing_field(field: &str) -> Self {
        Self::Decode {
            message: format!("missing required field: {field}"),
            source: None,
        }
    }

    /// Create a network error for a failed fetch.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
