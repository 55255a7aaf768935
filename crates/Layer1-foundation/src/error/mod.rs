//! Error types for Codepad
//!
//! Workspace-wide error. Crate-local errors (runtime init, task client)
//! convert into this one at the crate boundary.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Codepad error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Runtime
    // ========================================================================
    #[error("Runtime initialization failed: {0}")]
    Initialization(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    // ========================================================================
    // Task API
    // ========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ========================================================================
    // General
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether trying the same operation again could succeed.
    ///
    /// Nothing in Codepad retries automatically; this is for callers that
    /// want to offer a "try again" action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Transport(_) | Error::Initialization(_) => true,
            Error::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the message is meant to be shown to the user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::HttpStatus { .. }
                | Error::InvalidInput(_)
                | Error::Execution(_)
        )
    }

    /// HTTP status, if this error came from a non-success response
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// HTTP status error helper
    pub fn http_status_error(status: u16, body: impl Into<String>) -> Self {
        Error::HttpStatus {
            status,
            body: body.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
