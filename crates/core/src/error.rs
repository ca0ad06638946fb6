// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Expected nothing-to-do outcomes (empty lane, nothing called, nothing
/// confirmed, no active ticket) are Ok-values on the service API, not
/// errors; this enum covers the genuinely failing paths.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Deliberately merged outcome for unknown token, wrong ticket state and
    /// past expiry, so probing cannot distinguish them.
    #[error("Confirmation token is invalid or expired")]
    InvalidOrExpiredToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite
// by mapping to AppError::Database / AppError::Conflict (orphan rules)
