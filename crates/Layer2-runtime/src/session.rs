//! Execution session - run one piece of user code, get its output back
//!
//! `execute` never fails: loader errors, user exceptions, a dead runtime
//! and timeouts all come back inside [`ExecutionOutcome`].
//!
//! Calls are queued. Each run holds the queue for reset → submit → drain,
//! so concurrent callers never see each other's output.

use crate::capture::Captured;
use crate::loader::{HandleResult, LoaderConfig, RuntimeLoader};
use crate::python::{PythonConfig, PythonFactory};
use crate::runtime::{RunStatus, Runtime, RuntimeFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

// ============================================================================
// Outcome
// ============================================================================

/// What went wrong in an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The runtime could not be loaded; nothing ran
    Initialization,
    /// User code raised an exception
    Execution,
    /// The runtime died while running the code
    RuntimeLost,
    /// The code ran longer than the execution timeout
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Initialization => "initialization",
            ErrorKind::Execution => "execution",
            ErrorKind::RuntimeLost => "runtime_lost",
            ErrorKind::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub kind: ErrorKind,

    pub message: String,

    /// Exception class name, for `ErrorKind::Execution`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exc_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ExecutionError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            exc_type: None,
            traceback: None,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.exc_type {
            Some(exc_type) if self.message.is_empty() => write!(f, "{}", exc_type),
            Some(exc_type) => write!(f, "{}: {}", exc_type, self.message),
            None => write!(f, "{} error: {}", self.kind.as_str(), self.message),
        }
    }
}

impl From<ExecutionError> for codepad_foundation::Error {
    fn from(err: ExecutionError) -> Self {
        match err.kind {
            ErrorKind::Initialization => codepad_foundation::Error::Initialization(err.message),
            ErrorKind::Timeout => codepad_foundation::Error::Timeout(err.message),
            ErrorKind::Execution | ErrorKind::RuntimeLost => {
                codepad_foundation::Error::Execution(err.to_string())
            }
        }
    }
}

/// Result of one `execute` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// stdout and stderr, interleaved in write order
    pub output: String,

    pub error: Option<ExecutionError>,

    /// Output split by stream, in write order
    #[serde(skip)]
    pub captured: Captured,

    /// Output hit the capture cap
    pub truncated: bool,

    pub duration: Duration,
}

impl ExecutionOutcome {
    fn finished(captured: Captured, error: Option<ExecutionError>, duration: Duration) -> Self {
        Self {
            output: captured.text(),
            truncated: captured.truncated,
            error,
            captured,
            duration,
        }
    }

    fn not_started(error: ExecutionError, duration: Duration) -> Self {
        Self::finished(Captured::default(), Some(error), duration)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn stdout(&self) -> String {
        self.captured.stdout()
    }

    pub fn stderr(&self) -> String {
        self.captured.stderr()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Session configuration
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Abort a run after this long; the runtime is replaced afterwards
    pub exec_timeout: Option<Duration>,
}

/// Runs user code on the loader's runtime, one call at a time
pub struct ExecutionSession<F: RuntimeFactory> {
    loader: Arc<RuntimeLoader<F>>,
    queue: Mutex<()>,
    config: SessionConfig,
    runs: AtomicU64,
}

/// Session backed by a Python kernel
pub type PythonSession = ExecutionSession<PythonFactory>;

impl PythonSession {
    /// Build a Python session from runtime settings
    pub fn python(config: &codepad_foundation::RuntimeConfig) -> codepad_foundation::Result<Self> {
        let factory = PythonFactory::new(PythonConfig::try_from(config)?);
        let loader = RuntimeLoader::with_config(factory, LoaderConfig::from(config));
        Ok(Self::with_config(
            Arc::new(loader),
            SessionConfig {
                exec_timeout: config.exec_timeout(),
            },
        ))
    }
}

impl<F: RuntimeFactory> ExecutionSession<F> {
    pub fn new(loader: Arc<RuntimeLoader<F>>) -> Self {
        Self::with_config(loader, SessionConfig::default())
    }

    pub fn with_config(loader: Arc<RuntimeLoader<F>>, config: SessionConfig) -> Self {
        Self {
            loader,
            queue: Mutex::new(()),
            config,
            runs: AtomicU64::new(0),
        }
    }

    pub fn loader(&self) -> &Arc<RuntimeLoader<F>> {
        &self.loader
    }

    /// Completed `execute` calls
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Run `source` and return its output and error, if any
    pub async fn execute(&self, source: &str) -> ExecutionOutcome {
        let _turn = self.queue.lock().await;
        let started = Instant::now();
        let outcome = self.execute_locked(source, started).await;
        self.runs.fetch_add(1, Ordering::SeqCst);

        debug!(
            "Execution finished in {:.3}s ({} bytes output, error: {:?})",
            outcome.duration.as_secs_f64(),
            outcome.output.len(),
            outcome.error_kind()
        );
        outcome
    }

    async fn execute_locked(&self, source: &str, started: Instant) -> ExecutionOutcome {
        let handle = match self.live_handle().await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Runtime unavailable: {}", e);
                return ExecutionOutcome::not_started(
                    ExecutionError::new(ErrorKind::Initialization, e.to_string()),
                    started.elapsed(),
                );
            }
        };

        let capture = handle.capture();
        capture.reset();

        let run = handle.runtime().run(source);
        let result = match self.config.exec_timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => Some(result),
                Err(_) => None,
            },
            None => Some(run.await),
        };

        let captured = capture.drain();

        let error = match result {
            Some(Ok(RunStatus::Completed)) => None,
            Some(Ok(RunStatus::Raised(exc))) => Some(ExecutionError {
                kind: ErrorKind::Execution,
                message: exc.message,
                exc_type: Some(exc.exc_type),
                traceback: exc.traceback,
            }),
            Some(Err(fault)) => {
                warn!("{} runtime lost: {}", handle.runtime().name(), fault);
                self.loader.invalidate(handle.generation()).await;
                Some(ExecutionError::new(ErrorKind::RuntimeLost, fault.to_string()))
            }
            None => {
                let limit = self.config.exec_timeout.unwrap_or_default();
                warn!(
                    "Execution exceeded {:.1}s, restarting runtime",
                    limit.as_secs_f64()
                );
                self.loader.invalidate(handle.generation()).await;
                Some(ExecutionError::new(
                    ErrorKind::Timeout,
                    format!("execution exceeded {:.1}s", limit.as_secs_f64()),
                ))
            }
        };

        ExecutionOutcome::finished(captured, error, started.elapsed())
    }

    /// A ready handle whose runtime is still alive; a runtime that died
    /// between runs is replaced before any code is sent to it
    async fn live_handle(&self) -> HandleResult<F::Runtime> {
        let handle = self.loader.acquire().await?;
        if handle.runtime().is_alive() {
            return Ok(handle);
        }

        warn!(
            "{} runtime died while idle, starting a new one",
            handle.runtime().name()
        );
        self.loader.invalidate(handle.generation()).await;
        self.loader.acquire().await
    }

    /// Start the runtime ahead of the first `execute`
    pub async fn warm_up(&self) -> Result<(), crate::error::InitError> {
        self.loader.acquire().await.map(|_| ())
    }

    /// Stop the runtime
    pub async fn shutdown(&self) {
        let _turn = self.queue.lock().await;
        self.loader.shutdown().await;
    }
}
