//! Kernel wire protocol - one JSON object per line
//!
//! Host → kernel: `exec`. Kernel → host: `ready` once at start-up, then
//! any number of `write` frames followed by one `result` per `exec`.

use crate::capture::OutputStream;
use crate::runtime::{RaisedException, RunStatus};
use serde::{Deserialize, Serialize};

/// Frames sent to the kernel
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum HostFrame<'a> {
    Exec { id: &'a str, code: &'a str },
}

impl HostFrame<'_> {
    /// Serialized line including the trailing newline
    pub(crate) fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Frames received from the kernel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum KernelFrame {
    Ready {
        version: String,
        #[serde(default)]
        implementation: Option<String>,
    },
    Write {
        #[serde(default)]
        id: Option<String>,
        stream: OutputStream,
        text: String,
    },
    Result {
        id: String,
        ok: bool,
        #[serde(default)]
        error: Option<ErrorPayload>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "type")]
    pub exc_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub traceback: Option<String>,
}

impl KernelFrame {
    /// Parse one line; `None` for anything that is not a kernel frame
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

/// Map a `result` frame to the status of the run
pub(crate) fn run_status(ok: bool, error: Option<ErrorPayload>) -> RunStatus {
    if ok {
        return RunStatus::Completed;
    }

    let error = error.unwrap_or_else(|| ErrorPayload {
        exc_type: "Exception".to_string(),
        message: "execution failed without error details".to_string(),
        traceback: None,
    });

    RunStatus::Raised(RaisedException {
        exc_type: error.exc_type,
        message: error.message,
        traceback: error.traceback.filter(|tb| !tb.is_empty()),
    })
}
