//! Runtime loader - lazily starts one runtime and shares it
//!
//! The loader owns a single slot that is `Empty`, `Loading` or `Ready`.
//! The first `acquire()` on an empty slot spawns the initialization as its
//! own task and stores a shared future for it; every caller that arrives
//! while it runs awaits that same future. The spawned task publishes the
//! outcome into the slot itself, so the result sticks even if every caller
//! went away in the meantime.
//!
//! A failed initialization is handed to all waiters and leaves the slot
//! empty, so the next `acquire()` starts over.

use crate::capture::{OutputCapture, DEFAULT_MAX_OUTPUT_BYTES};
use crate::error::InitError;
use crate::runtime::{Runtime, RuntimeFactory};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result handed to every waiter of one initialization
pub type HandleResult<R> = Result<Arc<RuntimeHandle<R>>, InitError>;

type InitFuture<R> = Shared<BoxFuture<'static, HandleResult<R>>>;

// ============================================================================
// Runtime Handle
// ============================================================================

/// A ready runtime together with the capture its output goes to
pub struct RuntimeHandle<R> {
    runtime: R,
    capture: OutputCapture,
    generation: u64,
    created_at: DateTime<Utc>,
}

impl<R: Runtime> RuntimeHandle<R> {
    fn new(runtime: R, capture: OutputCapture, generation: u64) -> Self {
        Self {
            runtime,
            capture,
            generation,
            created_at: Utc::now(),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn capture(&self) -> &OutputCapture {
        &self.capture
    }

    /// Which initialization produced this handle; starts at 1
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<R: Runtime> fmt::Debug for RuntimeHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("runtime", &self.runtime.name())
            .field("version", &self.runtime.version())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Give up on initialization after this long; `None` waits forever
    pub init_timeout: Option<Duration>,

    /// Byte cap for each handle's output capture
    pub max_output_bytes: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            init_timeout: Some(Duration::from_secs(30)),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl From<&codepad_foundation::RuntimeConfig> for LoaderConfig {
    fn from(config: &codepad_foundation::RuntimeConfig) -> Self {
        Self {
            init_timeout: Some(config.init_timeout()),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

/// Loader counters
#[derive(Debug, Default)]
pub struct LoaderStats {
    initializations: AtomicU64,
    failures: AtomicU64,
}

impl LoaderStats {
    /// Initializations started
    pub fn initializations(&self) -> u64 {
        self.initializations.load(Ordering::SeqCst)
    }

    /// Initializations that ended in an error
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

enum Slot<R> {
    Empty,
    Loading { generation: u64, future: InitFuture<R> },
    Ready(Arc<RuntimeHandle<R>>),
}

/// Single-flight owner of one runtime
pub struct RuntimeLoader<F: RuntimeFactory> {
    factory: Arc<F>,
    slot: Arc<Mutex<Slot<F::Runtime>>>,
    next_generation: AtomicU64,
    config: LoaderConfig,
    stats: Arc<LoaderStats>,
}

impl<F: RuntimeFactory> RuntimeLoader<F> {
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, LoaderConfig::default())
    }

    pub fn with_config(factory: F, config: LoaderConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            slot: Arc::new(Mutex::new(Slot::Empty)),
            next_generation: AtomicU64::new(1),
            config,
            stats: Arc::new(LoaderStats::default()),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Get the runtime, starting it if nobody has yet
    pub async fn acquire(&self) -> HandleResult<F::Runtime> {
        let future = {
            let mut slot = self.slot.lock();
            let in_flight = match &*slot {
                Slot::Ready(handle) => return Ok(Arc::clone(handle)),
                Slot::Loading { future, .. } => Some(future.clone()),
                Slot::Empty => None,
            };

            match in_flight {
                Some(future) => future,
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                    let future = self.start(generation);
                    *slot = Slot::Loading {
                        generation,
                        future: future.clone(),
                    };
                    future
                }
            }
        };

        future.await
    }

    /// Ready handle, if any, without starting initialization
    pub fn current(&self) -> Option<Arc<RuntimeHandle<F::Runtime>>> {
        match &*self.slot.lock() {
            Slot::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Loading { .. })
    }

    /// Drop the ready handle of `generation` and shut its runtime down.
    ///
    /// Returns `false` when the slot holds something else, e.g. a newer
    /// runtime that replaced the broken one already.
    pub async fn invalidate(&self, generation: u64) -> bool {
        let stale = {
            let mut slot = self.slot.lock();
            let is_target =
                matches!(&*slot, Slot::Ready(handle) if handle.generation() == generation);
            if is_target {
                match std::mem::replace(&mut *slot, Slot::Empty) {
                    Slot::Ready(handle) => Some(handle),
                    _ => None,
                }
            } else {
                None
            }
        };

        match stale {
            Some(handle) => {
                warn!(
                    "Invalidating {} runtime (generation {})",
                    handle.runtime().name(),
                    generation
                );
                handle.runtime().shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Shut down the ready runtime, if any
    pub async fn shutdown(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Empty) {
                Slot::Ready(handle) => Some(handle),
                // leave an in-flight initialization to its waiters
                other => {
                    *slot = other;
                    None
                }
            }
        };

        if let Some(handle) = handle {
            debug!("Shutting down runtime (generation {})", handle.generation());
            handle.runtime().shutdown().await;
        }
    }

    fn start(&self, generation: u64) -> InitFuture<F::Runtime> {
        let factory = Arc::clone(&self.factory);
        let slot = Arc::clone(&self.slot);
        let stats = Arc::clone(&self.stats);
        let config = self.config.clone();

        debug!("Starting runtime initialization (generation {})", generation);

        let task = tokio::spawn({
            let slot = Arc::clone(&slot);
            async move {
                stats.initializations.fetch_add(1, Ordering::SeqCst);
                let started = Instant::now();
                let capture = OutputCapture::with_max_bytes(config.max_output_bytes);

                let created = match config.init_timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, factory.create(capture.clone())).await {
                            Ok(created) => created,
                            Err(_) => Err(InitError::Timeout(limit)),
                        }
                    }
                    None => factory.create(capture.clone()).await,
                };

                let result: HandleResult<F::Runtime> = created
                    .map(|runtime| Arc::new(RuntimeHandle::new(runtime, capture, generation)));

                match &result {
                    Ok(handle) => info!(
                        "{} runtime {} ready in {:.2}s (generation {})",
                        handle.runtime().name(),
                        handle.runtime().version(),
                        started.elapsed().as_secs_f64(),
                        generation
                    ),
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::SeqCst);
                        warn!("Runtime initialization failed: {}", e);
                    }
                }

                publish(&slot, generation, &result);
                result
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    let err = InitError::Aborted(join_err.to_string());
                    publish(&slot, generation, &Err(err.clone()));
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Move the slot out of `Loading` once `generation` has finished
fn publish<R: Runtime>(slot: &Mutex<Slot<R>>, generation: u64, result: &HandleResult<R>) {
    let mut slot = slot.lock();
    let is_current =
        matches!(&*slot, Slot::Loading { generation: loading, .. } if *loading == generation);
    if !is_current {
        return;
    }

    *slot = match result {
        Ok(handle) => Slot::Ready(Arc::clone(handle)),
        Err(_) => Slot::Empty,
    };
}
