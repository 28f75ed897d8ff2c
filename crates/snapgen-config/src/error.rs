//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors
    #[error("base directory not found: {}", path.display())]
    BaseDirNotFound { path: PathBuf },

    #[error("snapshot entry file not found: {}", path.display())]
    EntryNotFound { path: PathBuf },

    #[error("bundler executable not found: {}", path.display())]
    BundlerNotFound { path: PathBuf },

    #[error("no manifest to hash found inside {}", path.display())]
    HashFileNotFound { path: PathBuf },

    // Config parsing/loading errors
    #[error("invalid config value for '{field}'{}", hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default())]
    InvalidValue { field: String, hint: Option<String> },

    // Schema validation errors (no filesystem checks)
    #[error("{message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },
}
