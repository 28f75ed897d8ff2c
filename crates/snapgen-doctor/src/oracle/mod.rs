//! Execution oracle
//!
//! Decides whether an assembled script runs. Every call must execute in a
//! fresh, isolated environment: the doctor probes many hypotheses against the
//! same global identifiers and relies on no state leaking between them.

mod node;

pub use node::NodeOracle;

use async_trait::async_trait;

/// Options passed along with every script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Logical name of the script, used in stack traces and diagnostics.
    pub filename: String,
    /// Include source excerpts in error output.
    pub display_errors: bool,
}

impl ExecuteOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            display_errors: true,
        }
    }
}

/// The script threw or could not be run at all.
///
/// This is a verdict, not an error: the heal records the module for deferral
/// and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct OracleFailure {
    pub message: String,
}

impl OracleFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs an assembled script and reports whether it succeeded.
#[async_trait]
pub trait ExecutionOracle: Send + Sync + std::fmt::Debug {
    async fn execute(&self, script: &str, options: &ExecuteOptions) -> Result<(), OracleFailure>;
}
