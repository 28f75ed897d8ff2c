//! Reuse of previously determined deferred modules.
//!
//! A heal is expensive, so its result is stored next to a BLAKE3 hash of the
//! project's dependency manifest. As long as the manifest is unchanged the
//! stored result is returned instead of healing again.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snapgen_config::{ConfigError, SnapgenConfig};
use snapgen_graph::ModuleKey;

use crate::{Error, Result, SnapshotDoctor};

/// Manifests hashed to detect dependency changes, in lookup order.
pub const MANIFEST_CANDIDATES: [&str; 3] = ["yarn.lock", "package-lock.json", "package.json"];

/// Record persisted as `snapshot-meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredCache {
    /// `./`-prefixed deferred modules.
    pub deferred: Vec<String>,
    /// Hashed manifest, relative to the project base dir.
    pub deferred_hash_file: String,
    /// Hex BLAKE3 digest of the manifest's bytes.
    pub deferred_hash: String,
}

/// Result of checking the stored record against the current manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<String>),
    Miss { hash: String },
}

/// First manifest present in `base_dir`.
pub async fn find_hash_file(base_dir: &Path) -> Option<PathBuf> {
    for name in MANIFEST_CANDIDATES {
        let candidate = base_dir.join(name);
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Compare the record at `cache_file` with the current hash of `hash_file`.
///
/// A missing, unreadable or stale record is a miss, never an error.
pub async fn validate_existing(cache_file: &Path, hash_file_path: &Path) -> Result<CacheLookup> {
    let hash = hash_file(hash_file_path).await?;

    let bytes = match tokio::fs::read(cache_file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %cache_file.display(), "no deferred cache yet");
            return Ok(CacheLookup::Miss { hash });
        }
        Err(e) => {
            tracing::warn!(path = %cache_file.display(), "ignoring unreadable deferred cache: {}", e);
            return Ok(CacheLookup::Miss { hash });
        }
    };

    let record: DeferredCache = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(path = %cache_file.display(), "ignoring corrupt deferred cache: {}", e);
            return Ok(CacheLookup::Miss { hash });
        }
    };

    if record.deferred_hash == hash {
        Ok(CacheLookup::Hit(record.deferred))
    } else {
        tracing::debug!(
            expected = %record.deferred_hash,
            found = %hash,
            "manifest changed since deferred modules were determined"
        );
        Ok(CacheLookup::Miss { hash })
    }
}

fn relative_to(base_dir: &Path, path: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Deferred modules for the project, healing only when the manifest changed.
///
/// The fresh result is written back to `config.cache_file_path()`.
pub async fn determine_deferred(
    doctor: &SnapshotDoctor,
    config: &SnapgenConfig,
) -> Result<Vec<String>> {
    let hash_file_path = find_hash_file(&config.base_dir)
        .await
        .ok_or_else(|| ConfigError::HashFileNotFound {
            path: config.base_dir.clone(),
        })?;
    let cache_file = config.cache_file_path();

    let hash = match validate_existing(&cache_file, &hash_file_path).await? {
        CacheLookup::Hit(deferred) => {
            tracing::info!(count = deferred.len(), "reusing cached deferred modules");
            return Ok(deferred);
        }
        CacheLookup::Miss { hash } => hash,
    };

    tracing::info!("Did not find valid deferred modules for current project state, determining them");

    let force_deferred: Vec<ModuleKey> = config
        .force_deferred
        .iter()
        .map(|key| ModuleKey::from_require_path(key))
        .collect();
    let healed = doctor.heal(&force_deferred).await?;

    let record = DeferredCache {
        deferred: healed.deferred,
        deferred_hash_file: relative_to(&config.base_dir, &hash_file_path),
        deferred_hash: hash,
    };
    write_record(&cache_file, &record).await?;

    Ok(record.deferred)
}

async fn write_record(cache_file: &Path, record: &DeferredCache) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::Cache(format!("unable to encode deferred cache: {e}")))?;

    if let Some(dir) = cache_file.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Cache(format!("unable to create {}: {e}", dir.display())))?;
    }
    tokio::fs::write(cache_file, json)
        .await
        .map_err(|e| Error::Cache(format!("unable to write {}: {e}", cache_file.display())))?;

    tracing::debug!(path = %cache_file.display(), "wrote deferred cache");
    Ok(())
}
