//! Output capture - the runtime's stdout/stderr, held in memory
//!
//! One `OutputCapture` is bound to one runtime handle. Writes from both
//! streams land in a single sequence in the order the runtime made them;
//! per-stream text is derived from that sequence on demand, so the
//! combined view and the split views never disagree.
//!
//! Sessions `reset()` before running code and `drain()` afterwards.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default cap on captured bytes per execution
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Which standard stream a chunk was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// A single write made by the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputChunk {
    pub fn new(stream: OutputStream, text: impl Into<String>) -> Self {
        Self {
            stream,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything written since the last reset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Captured {
    pub chunks: Vec<OutputChunk>,

    /// Output exceeded the byte cap and the tail was dropped
    pub truncated: bool,
}

impl Captured {
    /// Both streams, interleaved in write order
    pub fn text(&self) -> String {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }

    pub fn stdout(&self) -> String {
        self.stream_text(OutputStream::Stdout)
    }

    pub fn stderr(&self) -> String {
        self.stream_text(OutputStream::Stderr)
    }

    fn stream_text(&self, stream: OutputStream) -> String {
        self.chunks
            .iter()
            .filter(|c| c.stream == stream)
            .map(|c| c.text.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[derive(Debug)]
struct CaptureBuffer {
    chunks: Vec<OutputChunk>,
    bytes: usize,
    max_bytes: usize,
    truncated: bool,
}

impl CaptureBuffer {
    fn push(&mut self, stream: OutputStream, text: &str) {
        if text.is_empty() || self.truncated {
            return;
        }

        let room = self.max_bytes.saturating_sub(self.bytes);
        let kept = if text.len() > room {
            self.truncated = true;
            truncate_at_char_boundary(text, room)
        } else {
            text
        };
        if kept.is_empty() {
            return;
        }

        self.bytes += kept.len();
        self.chunks.push(OutputChunk::new(stream, kept));
    }

    fn clear(&mut self) {
        self.chunks.clear();
        self.bytes = 0;
        self.truncated = false;
    }
}

/// Shared, cloneable capture buffer for one runtime handle
#[derive(Debug, Clone)]
pub struct OutputCapture {
    inner: Arc<Mutex<CaptureBuffer>>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_OUTPUT_BYTES)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureBuffer {
                chunks: Vec::new(),
                bytes: 0,
                max_bytes,
                truncated: false,
            })),
        }
    }

    /// Append text written to `stream`
    pub fn write(&self, stream: OutputStream, text: &str) {
        self.inner.lock().push(stream, text);
    }

    pub fn write_stdout(&self, text: &str) {
        self.write(OutputStream::Stdout, text);
    }

    pub fn write_stderr(&self, text: &str) {
        self.write(OutputStream::Stderr, text);
    }

    /// Discard everything captured so far
    pub fn reset(&self) {
        self.inner.lock().clear();
    }

    /// Take everything captured so far, leaving the buffer empty
    pub fn drain(&self) -> Captured {
        let mut buffer = self.inner.lock();
        let captured = Captured {
            chunks: std::mem::take(&mut buffer.chunks),
            truncated: buffer.truncated,
        };
        buffer.clear();
        captured
    }

    pub fn len_bytes(&self) -> usize {
        self.inner.lock().bytes
    }
}

impl Default for OutputCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
