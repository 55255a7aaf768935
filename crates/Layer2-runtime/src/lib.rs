//! # codepad-runtime
//!
//! Runs user-supplied Python for Codepad's editor.
//!
//! ## Pieces
//!
//! - `RuntimeLoader` - lazily starts one interpreter, single-flight
//! - `OutputCapture` - the interpreter's stdout/stderr, held in memory
//! - `ExecutionSession` - reset → run → drain, one call at a time
//! - `PythonFactory` / `PythonKernel` - the interpreter process itself
//!
//! ```text
//! execute(code)
//!     │
//!     ▼
//! ExecutionSession ──acquire──▶ RuntimeLoader ──create──▶ PythonFactory
//!     │                              │
//!     │ reset / drain                ▼
//!     └──────────────▶ RuntimeHandle { PythonKernel, OutputCapture }
//! ```

pub mod capture;
pub mod error;
pub mod loader;
pub mod python;
pub mod runtime;
pub mod session;

pub use capture::{Captured, OutputCapture, OutputChunk, OutputStream, DEFAULT_MAX_OUTPUT_BYTES};
pub use error::{InitError, RuntimeFault};
pub use loader::{HandleResult, LoaderConfig, LoaderStats, RuntimeHandle, RuntimeLoader};
pub use python::{PythonConfig, PythonFactory, PythonKernel, PythonVersion};
pub use runtime::{RaisedException, RunStatus, Runtime, RuntimeFactory};
pub use session::{
    ErrorKind, ExecutionError, ExecutionOutcome, ExecutionSession, PythonSession, SessionConfig,
};
