//! Storage module for Codepad
//!
//! - `json_store`: JSON - config file load/save

mod json_store;

pub use json_store::JsonStore;
