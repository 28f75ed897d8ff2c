//! The snapshot doctor configuration and its layered loading.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// TOML config file looked up in the root directory.
pub const TOML_CONFIG_FILE: &str = "snapgen.toml";

/// JSON config file looked up in the root directory.
pub const JSON_CONFIG_FILE: &str = "snapgen.config.json";

/// Prefix of environment variable overrides, e.g. `SNAPGEN_NODE_PATH`.
pub const ENV_PREFIX: &str = "SNAPGEN_";

/// Name of the cache record written into `cache_dir`.
pub const CACHE_FILE_NAME: &str = "snapshot-meta.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapgenConfig {
    /// Project root. Module keys reported by the bundler are relative to it.
    pub base_dir: PathBuf,

    /// Snapshot entry file, absolute or relative to `base_dir`.
    pub entry_file: PathBuf,

    /// External snapshot bundler executable, absolute or relative to `base_dir`.
    pub bundler_path: PathBuf,

    /// Executable used by the process oracle. Looked up on `PATH` when bare.
    pub node_path: PathBuf,

    /// Directory receiving the deferred cache record, relative to `base_dir`.
    pub cache_dir: PathBuf,

    /// Replaces the built-in snapshot blueprint when set.
    pub blueprint_path: Option<PathBuf>,

    /// Module keys that are always deferred and never optimized away.
    pub force_deferred: Vec<String>,

    /// Per-probe time limit for the process oracle.
    pub oracle_timeout_ms: u64,
}

impl Default for SnapgenConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            entry_file: PathBuf::from("snapshot/snapshot.js"),
            bundler_path: PathBuf::from("node_modules/.bin/snapshot-bundler"),
            node_path: PathBuf::from("node"),
            cache_dir: PathBuf::from(".snapgen-cache"),
            blueprint_path: None,
            force_deferred: Vec::new(),
            oracle_timeout_ms: 30_000,
        }
    }
}

impl SnapgenConfig {
    /// Load configuration from multiple sources.
    ///
    /// Priority: environment variables > `snapgen.config.json` > `snapgen.toml` > defaults.
    /// A relative `base_dir` is resolved against `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(root.join(TOML_CONFIG_FILE)))
            .merge(Json::file(root.join(JSON_CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX));

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })?;

        config.base_dir = root.join(&config.base_dir);
        tracing::debug!(base_dir = %config.base_dir.display(), "loaded snapgen configuration");
        Ok(config)
    }

    /// Create a config for a project without consulting files or the environment.
    pub fn for_project(base_dir: impl Into<PathBuf>, entry_file: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            entry_file: entry_file.into(),
            ..Self::default()
        }
    }

    pub fn with_bundler_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundler_path = path.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_force_deferred(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.force_deferred = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Absolute (or base-relative) path of the snapshot entry file.
    pub fn entry_path(&self) -> PathBuf {
        self.base_dir.join(&self.entry_file)
    }

    pub fn bundler_executable(&self) -> PathBuf {
        self.base_dir.join(&self.bundler_path)
    }

    pub fn cache_dir_path(&self) -> PathBuf {
        self.base_dir.join(&self.cache_dir)
    }

    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_dir_path().join(CACHE_FILE_NAME)
    }

    pub fn blueprint_file(&self) -> Option<PathBuf> {
        self.blueprint_path.as_ref().map(|p| self.base_dir.join(p))
    }
}
