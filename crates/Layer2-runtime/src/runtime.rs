//! Runtime traits - implement to add a new interpreter backend

use crate::capture::OutputCapture;
use crate::error::{InitError, RuntimeFault};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An exception raised by user code inside the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisedException {
    /// Exception class name, e.g. `ValueError`
    pub exc_type: String,

    pub message: String,

    pub traceback: Option<String>,
}

/// How a piece of code finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Raised(RaisedException),
}

/// A loaded, ready interpreter
#[async_trait]
pub trait Runtime: Send + Sync + 'static {
    /// Run `code` to completion. Output goes to the capture the runtime
    /// was created with; user exceptions come back as `RunStatus::Raised`.
    async fn run(&self, code: &str) -> Result<RunStatus, RuntimeFault>;

    /// Whether the runtime can still accept code
    fn is_alive(&self) -> bool;

    /// Stop the runtime and release its resources
    async fn shutdown(&self);

    /// Backend name
    fn name(&self) -> &'static str;

    /// Interpreter version as reported at start-up
    fn version(&self) -> &str;
}

/// Builds runtimes for the loader
#[async_trait]
pub trait RuntimeFactory: Send + Sync + 'static {
    type Runtime: Runtime;

    /// Start a runtime, wait until it is ready, and route its standard
    /// streams into `capture`.
    async fn create(&self, capture: OutputCapture) -> Result<Self::Runtime, InitError>;
}
