//! Python kernel - a long-lived interpreter process driven over stdio
//!
//! Features:
//! - Interpreter discovery (explicit path or PATH lookup)
//! - Minimum-version check against the kernel's `ready` frame
//! - stdout/stderr of user code forwarded into the handle's capture
//! - One persistent namespace across runs
//! - Kernel stderr kept as a short tail for diagnostics

use super::protocol::{run_status, HostFrame, KernelFrame};
use super::version::PythonVersion;
use crate::capture::OutputCapture;
use crate::error::{InitError, RuntimeFault};
use crate::runtime::{RunStatus, Runtime, RuntimeFactory};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

const KERNEL_SOURCE: &str = include_str!("kernel.py");

/// Interpreter names tried on PATH, in order
const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

const STDERR_TAIL_LINES: usize = 20;

type PendingMap = HashMap<String, oneshot::Sender<RunStatus>>;

// ============================================================================
// Factory
// ============================================================================

/// Python factory configuration
#[derive(Debug, Clone)]
pub struct PythonConfig {
    /// Interpreter to launch; `None` searches PATH
    pub python_path: Option<PathBuf>,

    /// Oldest accepted interpreter
    pub min_version: PythonVersion,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            python_path: None,
            min_version: PythonVersion::new(3, 8, 0),
        }
    }
}

impl TryFrom<&codepad_foundation::RuntimeConfig> for PythonConfig {
    type Error = codepad_foundation::Error;

    fn try_from(config: &codepad_foundation::RuntimeConfig) -> Result<Self, Self::Error> {
        let min_version = config.min_version.parse::<PythonVersion>().map_err(|e| {
            codepad_foundation::Error::Config(format!("runtime.minVersion: {}", e))
        })?;
        Ok(Self {
            python_path: config.python_path.as_ref().map(PathBuf::from),
            min_version,
        })
    }
}

/// Starts [`PythonKernel`] processes
#[derive(Debug, Clone, Default)]
pub struct PythonFactory {
    config: PythonConfig,
}

impl PythonFactory {
    pub fn new(config: PythonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PythonConfig {
        &self.config
    }

    /// Resolve the interpreter binary
    pub fn resolve_interpreter(&self) -> Result<PathBuf, InitError> {
        if let Some(path) = &self.config.python_path {
            return which::which(path).map_err(|e| {
                InitError::Unavailable(format!(
                    "configured interpreter `{}` not usable: {}",
                    path.display(),
                    e
                ))
            });
        }

        PYTHON_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| {
                InitError::Unavailable(format!(
                    "no Python interpreter found on PATH (tried {})",
                    PYTHON_CANDIDATES.join(", ")
                ))
            })
    }
}

#[async_trait]
impl RuntimeFactory for PythonFactory {
    type Runtime = PythonKernel;

    async fn create(&self, capture: OutputCapture) -> Result<PythonKernel, InitError> {
        let interpreter = self.resolve_interpreter()?;
        debug!("Starting Python kernel with {}", interpreter.display());

        let mut cmd = Command::new(&interpreter);
        cmd.arg("-u")
            .arg("-c")
            .arg(KERNEL_SOURCE)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            InitError::Unavailable(format!("failed to spawn {}: {}", interpreter.display(), e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InitError::Startup("kernel missing stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InitError::Startup("kernel missing stdout".to_string()))?;

        let stderr_tail = Arc::new(parking_lot::Mutex::new(VecDeque::new()));
        if let Some(stderr) = child.stderr.take() {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = next_line_lossy(&mut reader, &mut buf).await {
                    debug!("python kernel stderr: {}", line);
                    let mut recent = tail.lock();
                    if recent.len() >= STDERR_TAIL_LINES {
                        recent.pop_front();
                    }
                    recent.push_back(line);
                }
            });
        }

        let mut frames = BufReader::new(stdout);
        let version = match wait_for_ready(&mut frames).await {
            Ok(version) => version,
            Err(reason) => {
                let _ = child.kill().await;
                let tail = format_tail(&stderr_tail.lock());
                return Err(InitError::Startup(if tail.is_empty() {
                    reason
                } else {
                    format!("{}: {}", reason, tail)
                }));
            }
        };

        let parsed = version.parse::<PythonVersion>().map_err(InitError::Startup)?;
        if !parsed.satisfies(&self.config.min_version) {
            let _ = child.kill().await;
            return Err(InitError::Incompatible(format!(
                "Python {} found at {}, {} or newer required",
                parsed,
                interpreter.display(),
                self.config.min_version
            )));
        }

        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        tokio::spawn(read_frames(
            frames,
            capture,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));

        Ok(PythonKernel {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            alive,
            version,
            interpreter,
            stderr_tail,
        })
    }
}

/// Read lines until the `ready` frame; returns the reported version
async fn wait_for_ready(frames: &mut BufReader<ChildStdout>) -> Result<String, String> {
    let mut buf = Vec::new();
    loop {
        match next_line_lossy(frames, &mut buf).await {
            Ok(Some(line)) => match KernelFrame::parse(&line) {
                Some(KernelFrame::Ready {
                    version,
                    implementation,
                }) => {
                    debug!(
                        "Python kernel ready: {} {}",
                        implementation.as_deref().unwrap_or("Python"),
                        version
                    );
                    return Ok(version);
                }
                _ => debug!("Ignoring kernel output before ready: {}", line),
            },
            Ok(None) => return Err("kernel exited before becoming ready".to_string()),
            Err(e) => return Err(format!("failed to read kernel output: {}", e)),
        }
    }
}

/// Kernel stdout loop: route writes into the capture, complete runs
async fn read_frames(
    mut frames: BufReader<ChildStdout>,
    capture: OutputCapture,
    pending: Arc<Mutex<PendingMap>>,
    alive: Arc<AtomicBool>,
) {
    let mut buf = Vec::new();
    loop {
        match next_line_lossy(&mut frames, &mut buf).await {
            Ok(Some(line)) => match KernelFrame::parse(&line) {
                Some(KernelFrame::Write { id, stream, text }) => {
                    // writes made outside any execution carry no id
                    let current = match &id {
                        Some(id) => pending.lock().await.contains_key(id),
                        None => true,
                    };
                    if current {
                        capture.write(stream, &text);
                    } else {
                        debug!("Dropping output of finished execution {:?}", id);
                    }
                }
                Some(KernelFrame::Result { id, ok, error }) => {
                    let sender = pending.lock().await.remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(run_status(ok, error));
                        }
                        None => warn!("Result for unknown execution {}", id),
                    }
                }
                Some(KernelFrame::Ready { .. }) => warn!("Unexpected second ready frame"),
                // the frame channel is private to the kernel
                None => warn!("Dropping malformed kernel frame ({} bytes)", line.len()),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read kernel output: {}", e);
                break;
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    let orphaned = pending.lock().await.len();
    if orphaned > 0 {
        warn!("Python kernel exited with {} pending execution(s)", orphaned);
    }
    // dropping the senders wakes every waiter with an error
    pending.lock().await.clear();
}

/// Next line without its terminator, invalid UTF-8 replaced; `None` at EOF
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

fn format_tail(lines: &VecDeque<String>) -> String {
    lines
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ")
}

// ============================================================================
// Kernel
// ============================================================================

/// A running Python interpreter process
pub struct PythonKernel {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: Arc<Mutex<PendingMap>>,
    alive: Arc<AtomicBool>,
    version: String,
    interpreter: PathBuf,
    stderr_tail: Arc<parking_lot::Mutex<VecDeque<String>>>,
}

impl PythonKernel {
    pub fn interpreter(&self) -> &std::path::Path {
        &self.interpreter
    }

    /// Last lines the kernel wrote to its own stderr
    pub fn stderr_tail(&self) -> String {
        format_tail(&self.stderr_tail.lock())
    }

    fn exited(&self, reason: &str) -> RuntimeFault {
        let tail = self.stderr_tail();
        if tail.is_empty() {
            RuntimeFault::Exited(reason.to_string())
        } else {
            RuntimeFault::Exited(format!("{}: {}", reason, tail))
        }
    }
}

#[async_trait]
impl Runtime for PythonKernel {
    async fn run(&self, code: &str) -> Result<RunStatus, RuntimeFault> {
        if !self.is_alive() {
            return Err(self.exited("kernel is not running"));
        }

        let id = Uuid::new_v4().to_string();
        let line = HostFrame::Exec { id: &id, code }
            .to_line()
            .map_err(|e| RuntimeFault::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        // the reader may have exited between the check above and the insert
        if !self.is_alive() {
            self.pending.lock().await.remove(&id);
            return Err(self.exited("kernel is not running"));
        }

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&id);
            self.alive.store(false, Ordering::SeqCst);
            return Err(RuntimeFault::Io(format!("failed to send code to kernel: {}", e)));
        }

        debug!("Submitted execution {} ({} bytes)", id, code.len());

        rx.await
            .map_err(|_| self.exited("kernel exited while running code"))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!("Kernel kill failed (already exited?): {}", e);
        }
    }

    fn name(&self) -> &'static str {
        "python"
    }

    fn version(&self) -> &str {
        &self.version
    }
}
