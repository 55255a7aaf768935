//! Runtime error types
//!
//! `InitError` is shared between every caller waiting on one
//! initialization, so it is `Clone`. `RuntimeFault` means the runtime
//! itself broke; a user-code exception is not a fault (see `RunStatus`).

use codepad_foundation::Error as FoundationError;
use std::time::Duration;
use thiserror::Error;

/// Errors from bringing a runtime up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Interpreter could not be found or launched
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    /// Interpreter started but does not satisfy the pinned version
    #[error("Incompatible runtime: {0}")]
    Incompatible(String),

    /// Interpreter started but never reported ready
    #[error("Runtime failed to start: {0}")]
    Startup(String),

    #[error("Runtime initialization timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The initialization task panicked or was cancelled
    #[error("Runtime initialization aborted: {0}")]
    Aborted(String),
}

/// The runtime stopped working while running code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeFault {
    #[error("Runtime exited: {0}")]
    Exited(String),

    #[error("Runtime I/O failed: {0}")]
    Io(String),

    #[error("Runtime protocol error: {0}")]
    Protocol(String),
}

// ============================================================================
// codepad_foundation::Error conversions
// ============================================================================

impl From<InitError> for FoundationError {
    fn from(err: InitError) -> Self {
        match err {
            InitError::Timeout(after) => FoundationError::Timeout(format!(
                "runtime initialization exceeded {:.1}s",
                after.as_secs_f64()
            )),
            other => FoundationError::Initialization(other.to_string()),
        }
    }
}

impl From<RuntimeFault> for FoundationError {
    fn from(err: RuntimeFault) -> Self {
        FoundationError::Execution(err.to_string())
    }
}
