//! Error types for lostfound.
//!
//! This module defines all error types used throughout the lostfound crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Identity;

/// The main error type for lostfound operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored document does not have the expected shape.
    #[error("malformed document {key} in collection '{collection}': {message}")]
    DocumentDecode {
        /// Collection the document was read from.
        collection: String,
        /// Key of the offending document.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Transport Errors ===
    /// The chat platform rejected or failed a request.
    #[error("transport error: {0}")]
    Transport(String),

    // === Conversation Errors ===
    /// A report was submitted by an identity that never registered.
    #[error("no profile on record for identity {0}")]
    ProfileMissing(Identity),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for lostfound operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<lostfound_telegram::TelegramError> for Error {
    fn from(err: lostfound_telegram::TelegramError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl Error {
    /// Create a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a document decode error.
    #[must_use]
    pub fn document_decode(
        collection: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DocumentDecode {
            collection: collection.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a missing-profile precondition failure.
    #[must_use]
    pub fn is_profile_missing(&self) -> bool {
        matches!(self, Self::ProfileMissing(_))
    }

    /// Check if this error came from the chat platform.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
