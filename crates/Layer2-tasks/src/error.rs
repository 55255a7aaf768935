//! Task client error types
//!
//! Converts into `codepad_foundation::Error` for callers that work with
//! the workspace-wide error.

use codepad_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur talking to the task service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskClientError {
    /// The request never got a response (connect, DNS, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Success status, but the body was not what we expected
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl TaskClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TaskClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for TaskClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TaskClientError::Decode(err.to_string())
        } else {
            TaskClientError::Transport(err.to_string())
        }
    }
}

// ============================================================================
// codepad_foundation::Error conversion
// ============================================================================

impl From<TaskClientError> for FoundationError {
    fn from(err: TaskClientError) -> Self {
        match err {
            TaskClientError::Transport(msg) => FoundationError::Transport(msg),
            TaskClientError::HttpStatus { status, body } => {
                FoundationError::HttpStatus { status, body }
            }
            TaskClientError::Decode(msg) => FoundationError::InvalidResponse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let err = TaskClientError::HttpStatus {
            status: 404,
            body: "missing".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404: missing");
        assert!(TaskClientError::Transport("refused".into()).status().is_none());
    }

    #[test]
    fn test_into_foundation() {
        let err: FoundationError = TaskClientError::HttpStatus {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert_eq!(err.http_status(), Some(500));
        assert!(err.is_retryable());
    }
}
