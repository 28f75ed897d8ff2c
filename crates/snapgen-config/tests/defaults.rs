//! Tests for default values.

use snapgen_config::{CACHE_FILE_NAME, SnapgenConfig};
use std::path::PathBuf;

#[test]
fn snapgen_config_defaults() {
    let config = SnapgenConfig::default();
    assert_eq!(config.base_dir, PathBuf::from("."));
    assert_eq!(config.entry_file, PathBuf::from("snapshot/snapshot.js"));
    assert_eq!(
        config.bundler_path,
        PathBuf::from("node_modules/.bin/snapshot-bundler")
    );
    assert_eq!(config.node_path, PathBuf::from("node"));
    assert_eq!(config.cache_dir, PathBuf::from(".snapgen-cache"));
    assert!(config.blueprint_path.is_none());
    assert!(config.force_deferred.is_empty());
    assert_eq!(config.oracle_timeout_ms, 30_000);
}

#[test]
fn cache_file_lives_in_cache_dir() {
    let config = SnapgenConfig::for_project("/p", "entry.js");
    assert_eq!(
        config.cache_file_path(),
        PathBuf::from("/p/.snapgen-cache").join(CACHE_FILE_NAME)
    );
}
