#![cfg_attr(docsrs, feature(doc_cfg))]

//! # snapgen-doctor
//!
//! Decides which modules of a snapshot bundle cannot be executed eagerly
//! while the startup snapshot is built, and shrinks that set of deferred
//! modules to the least invasive shape.
//!
//! ## How a heal runs
//!
//! 1. **Stage** the graph bottom-up: leaves first, then every module whose
//!    imports are verified, deferred or a direct cycle partner. Each candidate
//!    is assembled as the sole entry point and run by the [`ExecutionOracle`].
//! 2. **Grow** the deferred set with every module that failed, re-bundle, and
//!    stage again until a full pass produces no failures.
//! 3. **Push down** each deferred module to a single deferred import where
//!    that suffices.
//! 4. **Eliminate** defers that the application entry point no longer needs.
//!
//! The bundler, the script assembler and the oracle are injected capabilities,
//! so the algorithm can run against the real tools or deterministic fakes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapgen_config::SnapgenConfig;
//! use snapgen_doctor::SnapshotDoctor;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SnapgenConfig::load(".")?;
//! let doctor = SnapshotDoctor::from_config(&config)?;
//!
//! let result = doctor.heal(&[]).await?;
//! println!("deferred: {:?}", result.deferred);
//! # Ok(()) }
//! ```
//!
//! ### Reuse previous results
//!
//! ```no_run
//! use snapgen_config::SnapgenConfig;
//! use snapgen_doctor::{SnapshotDoctor, determine_deferred};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SnapgenConfig::load(".")?;
//! let doctor = SnapshotDoctor::from_config(&config)?;
//!
//! // Heals only when the hashed manifest changed since the last run.
//! let deferred = determine_deferred(&doctor, &config).await?;
//! # Ok(()) }
//! ```

pub use snapgen_graph::{CircularImports, Metadata, ModuleGraph, ModuleKey};

pub mod assembler;
pub mod bundler;
pub mod cache;
pub mod doctor;
mod healer;
mod optimizer;
pub mod oracle;
pub mod state;

pub use assembler::{AssembleOptions, AssemblyError, BlueprintAssembler, ScriptAssembler};
pub use bundler::{BundleOutput, BundleRequest, Bundler, BundlerError, ProcessBundler};
pub use cache::{CacheLookup, DeferredCache, determine_deferred};
pub use doctor::{DoctorOptions, HealResult, SnapshotDoctor};
pub use oracle::{ExecuteOptions, ExecutionOracle, NodeOracle, OracleFailure};
pub use state::HealState;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

/// Error types for snapshot doctor operations.
///
/// Oracle failures are not errors: a module that throws is recorded for
/// deferral and the heal continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external bundler failed; the heal is aborted.
    #[error("Bundler failure: {0}")]
    Bundler(#[from] BundlerError),

    /// Bundler metadata is malformed (missing entry point or import).
    #[error("Malformed metadata: {0}")]
    Metadata(#[from] snapgen_graph::GraphError),

    /// Invalid configuration provided.
    #[error("Configuration error: {0}")]
    Config(#[from] snapgen_config::ConfigError),

    /// The snapshot script could not be assembled.
    #[error("Script assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    /// The deferred cache record could not be written.
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for snapshot doctor operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundler(_) => "BUNDLER_FAILURE",
            Error::Metadata(_) => "MALFORMED_METADATA",
            Error::Config(_) => "INVALID_CONFIG",
            Error::Assembly(_) => "ASSEMBLY_ERROR",
            Error::Cache(_) => "CACHE_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Bundler(BundlerError::Failed { command, .. }) => Some(Box::new(format!(
                "The snapshot bundler exited with an error. Run it by hand to reproduce:\n{}",
                command
            ))),
            Error::Bundler(_) => Some(Box::new(
                "Check that bundler_path points at the snapshot bundler executable",
            )),
            Error::Metadata(_) => Some(Box::new(
                "The bundler's metadata must flag exactly one entry point and describe every imported module",
            )),
            Error::Config(_) => Some(Box::new(
                "Check snapgen.toml, snapgen.config.json and SNAPGEN_* environment variables",
            )),
            Error::Assembly(_) => Some(Box::new(
                "A custom blueprint must keep every placeholder of the built-in blueprint",
            )),
            Error::Cache(_) => Some(Box::new(
                "Make sure cache_dir is writable; deleting the cache file forces a full heal",
            )),
            Error::Io(_) => None,
        }
    }
}
