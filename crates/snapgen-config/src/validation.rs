//! Pluggable config validation strategies
//!
//! Separates filesystem validation from schema validation.

use crate::config::SnapgenConfig;
use crate::error::{ConfigError, Result};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &SnapgenConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use snapgen_config::{ConfigValidator, SchemaValidator, SnapgenConfig};
///
/// let config = SnapgenConfig::for_project(".", "snapshot/entry.js");
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &SnapgenConfig) -> Result<()> {
        if config.entry_file.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "entry_file cannot be empty".to_string(),
                hint: Some("Point entry_file at the snapshot entry module".to_string()),
            });
        }

        if config.bundler_path.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "bundler_path cannot be empty".to_string(),
                hint: Some("Point bundler_path at the snapshot bundler executable".to_string()),
            });
        }

        if config.force_deferred.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::SchemaValidation {
                message: "force_deferred keys cannot be empty".to_string(),
                hint: Some("Remove empty strings from the 'force_deferred' array".to_string()),
            });
        }

        if config.oracle_timeout_ms == 0 {
            return Err(ConfigError::SchemaValidation {
                message: "oracle_timeout_ms must be greater than zero".to_string(),
                hint: None,
            });
        }

        Ok(())
    }
}

/// Filesystem validator
///
/// Runs schema validation, then checks that the base dir, the entry file and
/// the bundler executable exist on disk.
pub struct FsValidator;

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &SnapgenConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        if !config.base_dir.is_dir() {
            return Err(ConfigError::BaseDirNotFound {
                path: config.base_dir.clone(),
            });
        }

        let entry = config.entry_path();
        if !entry.is_file() {
            return Err(ConfigError::EntryNotFound { path: entry });
        }

        let bundler = config.bundler_executable();
        if !bundler.exists() {
            return Err(ConfigError::BundlerNotFound { path: bundler });
        }

        Ok(())
    }
}

/// Convenience function for schema-only validation
pub fn validate_schema(config: &SnapgenConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Convenience function for filesystem validation
pub fn validate_fs(config: &SnapgenConfig) -> Result<()> {
    FsValidator.validate(config)
}
