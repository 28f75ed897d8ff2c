//! Configuration for snapshot doctor runs.
//!
//! Values are layered with `figment`: built-in defaults, then `snapgen.toml`,
//! then `snapgen.config.json`, then `SNAPGEN_*` environment variables.

pub mod config;
pub mod error;
pub mod validation;

pub use config::*;
pub use error::*;
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
