//! Codepad Config - merged application settings
//!
//! Load order (later wins): defaults, global file, project file, env vars.
//! CLI flags are applied on top by the binary.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Config file name inside a [`JsonStore`]
pub const CODEPAD_CONFIG_FILE: &str = "config.json";

/// Env var overriding `api.baseUrl`
pub const ENV_API_URL: &str = "CODEPAD_API_URL";

/// Env var overriding `runtime.pythonPath`
pub const ENV_PYTHON: &str = "CODEPAD_PYTHON";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

// ============================================================================
// Codepad Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodepadConfig {
    /// Schema version, for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl CodepadConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project + env merge
    pub fn load() -> Result<Self> {
        let global = JsonStore::global().ok();
        let project = JsonStore::current_project().ok();
        let mut config = Self::load_from(global.as_ref(), project.as_ref())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Merge the given stores in order; missing files are skipped
    pub fn load_from(global: Option<&JsonStore>, project: Option<&JsonStore>) -> Result<Self> {
        let mut config = Self::new();

        for store in [global, project].into_iter().flatten() {
            if let Some(layer) = store.load_optional::<CodepadConfig>(CODEPAD_CONFIG_FILE)? {
                tracing::debug!("Loaded config layer from {}", store.base_dir().display());
                config.merge(layer);
            }
        }

        Ok(config)
    }

    /// Write this config as the store's `config.json`
    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        store.save(CODEPAD_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge another layer on top (non-default values in `other` win)
    pub fn merge(&mut self, other: CodepadConfig) {
        if other.version != default_version() {
            self.version = other.version;
        }
        self.api.merge(other.api);
        self.runtime.merge(other.runtime);
    }

    /// Apply env overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(python) = lookup(ENV_PYTHON).filter(|v| !v.trim().is_empty()) {
            self.runtime.python_path = Some(python);
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    pub fn python_path(mut self, path: impl Into<String>) -> Self {
        self.runtime.python_path = Some(path.into());
        self
    }
}

// ============================================================================
// API Config
// ============================================================================

/// Task service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base URL; task routes live under `{baseUrl}/tasks`
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    fn merge(&mut self, other: ApiConfig) {
        if other.base_url != default_api_url() {
            self.base_url = other.base_url;
        }
        if other.timeout_secs != default_api_timeout() {
            self.timeout_secs = other.timeout_secs;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Runtime Config
// ============================================================================

/// Python runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Interpreter to launch; `None` searches PATH for `python3`/`python`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,

    /// Oldest interpreter version accepted, `major.minor`
    #[serde(default = "default_min_version")]
    pub min_version: String,

    /// Upper bound on interpreter start-up
    #[serde(default = "default_init_timeout")]
    pub init_timeout_secs: u64,

    /// Upper bound on a single execution; `None` waits forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_timeout_secs: Option<u64>,

    /// Captured output beyond this is dropped
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            python_path: None,
            min_version: default_min_version(),
            init_timeout_secs: default_init_timeout(),
            exec_timeout_secs: None,
            max_output_bytes: default_max_output(),
        }
    }
}

impl RuntimeConfig {
    fn merge(&mut self, other: RuntimeConfig) {
        if other.python_path.is_some() {
            self.python_path = other.python_path;
        }
        if other.min_version != default_min_version() {
            self.min_version = other.min_version;
        }
        if other.init_timeout_secs != default_init_timeout() {
            self.init_timeout_secs = other.init_timeout_secs;
        }
        if other.exec_timeout_secs.is_some() {
            self.exec_timeout_secs = other.exec_timeout_secs;
        }
        if other.max_output_bytes != default_max_output() {
            self.max_output_bytes = other.max_output_bytes;
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    pub fn exec_timeout(&self) -> Option<Duration> {
        self.exec_timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_version() -> u32 {
    1
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_min_version() -> String {
    "3.8".to_string()
}

fn default_init_timeout() -> u64 {
    30
}

fn default_max_output() -> usize {
    1024 * 1024
}
