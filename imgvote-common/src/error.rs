//! Common error types for imgvote

use thiserror::Error;

/// Common result type for imgvote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the survey core and the HTTP layer
///
/// Nothing in the core retries on its own; every variant is returned to the
/// caller synchronously.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration missing or invalid (no chunks built, admin secret unset)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested session, item or prompt does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed identifier or unknown enumeration value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate pair-mode vote for the same (session, item)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation not allowed for the session's lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Catalog integrity defect (wrong image cardinality, missing row)
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),
}

impl Error {
    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::Io(_) => "io",
            Error::Config(_) => "configuration",
            Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::Conflict(_) => "conflict",
            Error::InvalidState(_) => "invalid_state",
            Error::InternalConsistency(_) => "internal_consistency",
        }
    }
}

/// True when a sqlx error is a uniqueness-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
