//! Error types for metadata decoding and graph lookups.

use thiserror::Error;

use crate::ModuleKey;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Malformed bundler metadata or an invalid graph query.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("metadata should have exactly one entry point, found none")]
    MissingEntryPoint,

    #[error("metadata should have exactly one entry point, found '{first}' and '{second}'")]
    MultipleEntryPoints { first: String, second: String },

    #[error("module '{module}' imports '{import}' which is missing from the metadata")]
    MissingImport { module: ModuleKey, import: ModuleKey },

    #[error("unable to find {0} in the metadata")]
    UnknownModule(ModuleKey),

    #[error("invalid bundler metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
}
