//! Unified error type for clipvault.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the HTTP layer to derive a status code via [`Error::http_status`].

use std::fmt;

/// Boxed error used as the `source` of wrapped failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type covering all failure modes in clipvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested byte range cannot be satisfied for this file.
    #[error("Invalid range: {reason}")]
    InvalidRange {
        /// Why the range was rejected.
        reason: String,
        /// Total size of the file, when it was known at rejection time.
        size: Option<u64>,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "transaction").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A metadata or byte store failed while uploading or reading.
    #[error("Storage failure during {operation}{}: {source}", fmt_file_id(.file_id))]
    StorageFailure {
        /// The store operation that failed (e.g. "metadata.save").
        operation: String,
        /// The file the operation targeted, if any.
        file_id: Option<String>,
        /// The underlying cause.
        source: BoxError,
    },

    /// An upload failed and compensating cleanup could not remove everything.
    #[error("Rollback incomplete after {cause}; {} record(s) left behind", .pending.len())]
    RollbackIncomplete {
        /// The failure that triggered the rollback.
        cause: Box<Error>,
        /// File IDs whose metadata or bytes could not be removed.
        pending: Vec<String>,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: BoxError,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_file_id(file_id: &Option<String>) -> String {
    match file_id {
        Some(id) => format!(" of {id}"),
        None => String::new(),
    }
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRange { .. } => 416,
            Error::NotFound { .. } => 404,
            Error::StorageFailure { .. } => 500,
            Error::RollbackIncomplete { .. } => 500,
            Error::Validation(_) => 400,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::InvalidRange`].
    pub fn invalid_range(reason: impl Into<String>, size: Option<u64>) -> Self {
        Error::InvalidRange {
            reason: reason.into(),
            size,
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<BoxError>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::StorageFailure`].
    pub fn storage(
        operation: impl Into<String>,
        file_id: Option<impl fmt::Display>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::StorageFailure {
            operation: operation.into(),
            file_id: file_id.map(|id| id.to_string()),
            source: source.into(),
        }
    }

    /// Wrap a raw collaborator error into [`Error::StorageFailure`].
    ///
    /// Errors that already carry domain meaning (not found, invalid range,
    /// storage failure, incomplete rollback) are returned unchanged so the
    /// transport can still map them precisely.
    pub fn into_storage_failure(
        self,
        operation: impl Into<String>,
        file_id: Option<impl fmt::Display>,
    ) -> Self {
        match self {
            Error::NotFound { .. }
            | Error::InvalidRange { .. }
            | Error::StorageFailure { .. }
            | Error::RollbackIncomplete { .. } => self,
            other => Error::storage(operation, file_id, other),
        }
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRange { .. } => "range_not_satisfiable",
            Error::NotFound { .. } => "not_found",
            Error::StorageFailure { .. } => "storage_failure",
            Error::RollbackIncomplete { .. } => "rollback_incomplete",
            Error::Validation(_) => "validation_error",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
