//! Bundler abstraction
//!
//! The doctor never bundles itself. It asks a [`Bundler`] for a fresh bundle
//! and metadata document whenever the set of deferred modules changes, since
//! deferring changes how the bundler resolves and inlines modules.

mod process;

pub use process::ProcessBundler;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snapgen_graph::{GraphError, Metadata, ModuleKey};

/// Errors that abort a heal because no bundle could be produced.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    /// The bundler ran and exited unsuccessfully.
    #[error("Failed command: \"{command}\" ({status})")]
    Failed {
        command: String,
        status: String,
        stderr: String,
        stdout: String,
    },

    /// The bundler executable could not be started.
    #[error("Unable to run \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An output file the bundler should have written could not be read.
    #[error("Unable to read bundler output {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundle file is not valid UTF-8.
    #[error("Bundler wrote a bundle that is not valid UTF-8 {}: {source}", path.display())]
    InvalidBundle {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The metadata file is not a valid metadata document.
    #[error("Bundler wrote invalid metadata: {0}")]
    InvalidMetadata(#[from] GraphError),
}

/// One bundler invocation.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    /// Project root the bundler resolves module keys against.
    pub base_dir: &'a Path,
    /// Snapshot entry file.
    pub entry_file: &'a Path,
    /// Modules the bundler must exclude from eager evaluation.
    pub deferred: &'a [ModuleKey],
}

impl<'a> BundleRequest<'a> {
    pub fn new(base_dir: &'a Path, entry_file: &'a Path, deferred: &'a [ModuleKey]) -> Self {
        Self {
            base_dir,
            entry_file,
            deferred,
        }
    }

    /// Deferred modules as `./`-prefixed require paths.
    pub fn deferred_require_paths(&self) -> Vec<String> {
        self.deferred.iter().map(ModuleKey::require_path).collect()
    }
}

/// Bundle text plus the metadata describing it.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub metadata: Metadata,
    pub bundle: String,
}

/// Produces a bundle and its metadata for a given deferred set.
///
/// Implementations may be expensive (out of process). The heal awaits them
/// strictly in sequence.
#[async_trait]
pub trait Bundler: Send + Sync + std::fmt::Debug {
    async fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutput, BundlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_are_require_paths() {
        let deferred = vec![ModuleKey::new("a.js"), ModuleKey::new("lib/b.js")];
        let request = BundleRequest::new(Path::new("/p"), Path::new("/p/entry.js"), &deferred);
        assert_eq!(request.deferred_require_paths(), vec!["./a.js", "./lib/b.js"]);
    }
}
