//! Config - application settings
//!
//! - `codepad.rs` - CodepadConfig (api + runtime sections)

mod codepad;

pub use codepad::{
    ApiConfig, CodepadConfig, RuntimeConfig, CODEPAD_CONFIG_FILE, DEFAULT_API_URL, ENV_API_URL,
    ENV_PYTHON,
};
