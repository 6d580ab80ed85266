//! Common error types for the asset-management services
//!
//! Every failure is a tagged variant; callers dispatch on the variant, never
//! on message text. Lifecycle violations carry a message naming the required
//! state so the boundary layer can surface it verbatim.

use thiserror::Error;

/// Common result type for ITAM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Per-field validation failure detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as it appears in the request payload
    pub field: &'static str,
    /// Human-readable description of what is wrong
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Error types shared across the asset-management services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced plan, record, or asset does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not legal in the plan's current lifecycle state;
    /// the message names the required state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Manual re-scan of a tag already recorded as matched in the plan
    #[error("Already scanned: asset {0}")]
    AlreadyScanned(String),

    /// Missing or malformed request fields, with per-field detail
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),
}

impl Error {
    /// Single-field validation failure
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
