//! # codepad-foundation
//!
//! Foundation layer for Codepad:
//! - Error: workspace-wide error taxonomy
//! - Config: merged settings (CodepadConfig)
//! - Storage: JsonStore for config files

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    ApiConfig, CodepadConfig, RuntimeConfig, CODEPAD_CONFIG_FILE, DEFAULT_API_URL, ENV_API_URL,
    ENV_PYTHON,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
