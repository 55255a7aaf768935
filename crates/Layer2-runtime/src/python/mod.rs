//! Python backend
//!
//! - `kernel` - interpreter process + `RuntimeFactory` impl
//! - `protocol` - NDJSON frames exchanged with the kernel
//! - `version` - minimum-version pinning

mod kernel;
mod protocol;
mod version;

pub use kernel::{PythonConfig, PythonFactory, PythonKernel};
pub use version::PythonVersion;
