//! Serde model of the snapshot bundler's metadata file.
//!
//! The bundler writes esbuild-style metadata: an `inputs` table with every
//! module it saw (byte size and ordered imports) and an `outputs` table whose
//! inputs carry `fileInfo`, one of which is flagged as the entry point.
//!
//! A new `Metadata` is produced by every bundler invocation. Deferring modules
//! changes how the bundler resolves and inlines them, so the document is never
//! patched in place.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::{GraphError, ModuleKey, Result};

/// Bundler metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Every bundled module in the order the bundler reported it.
    #[serde(default)]
    pub inputs: IndexMap<ModuleKey, InputEntry>,

    /// Output files keyed by output path.
    #[serde(default)]
    pub outputs: IndexMap<String, OutputEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub imports: Vec<ImportRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub path: ModuleKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    #[serde(default)]
    pub inputs: IndexMap<String, OutputInput>,
    #[serde(default)]
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInput {
    #[serde(default)]
    pub bytes_in_output: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_name: Option<String>,
    pub full_path: PathBuf,
    #[serde(default)]
    pub is_entry_point: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_function: Option<String>,
}

/// Output file name used when metadata is assembled programmatically.
const PROGRAMMATIC_OUTPUT: &str = "bundle.js";

impl Metadata {
    /// Create an empty metadata document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a metadata document from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a metadata document from raw bytes (e.g. a file read by the caller).
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Add an input module with its ordered imports.
    ///
    /// Duplicate import entries are kept; the graph tolerates them.
    pub fn with_input<I, K>(mut self, key: impl Into<ModuleKey>, bytes: u64, imports: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ModuleKey>,
    {
        let imports = imports
            .into_iter()
            .map(|path| ImportRecord { path: path.into() })
            .collect();
        self.inputs.insert(key.into(), InputEntry { bytes, imports });
        self
    }

    /// Flag `full_path` as the entry point of the (single) output bundle.
    pub fn with_entry_point(mut self, full_path: impl Into<PathBuf>) -> Self {
        let full_path = full_path.into();
        let output = self
            .outputs
            .entry(PROGRAMMATIC_OUTPUT.to_string())
            .or_default();
        output.inputs.insert(
            full_path.to_string_lossy().into_owned(),
            OutputInput {
                bytes_in_output: 0,
                file_info: Some(FileInfo {
                    identifier_name: None,
                    full_path,
                    is_entry_point: true,
                    replacement_function: None,
                }),
            },
        );
        self
    }

    /// Find the module flagged as the application entry point.
    ///
    /// The returned key is relative to `base_dir`. Exactly one distinct module
    /// must be flagged.
    ///
    /// ```
    /// use snapgen_graph::Metadata;
    ///
    /// let meta = Metadata::new()
    ///     .with_input("snapshot/entry.js", 10, Vec::<&str>::new())
    ///     .with_entry_point("/project/snapshot/entry.js");
    ///
    /// let entry = meta.entry_point("/project").unwrap();
    /// assert_eq!(entry.require_path(), "./snapshot/entry.js");
    /// ```
    pub fn entry_point(&self, base_dir: impl AsRef<Path>) -> Result<ModuleKey> {
        let base_dir = base_dir.as_ref().clean();
        let mut found: Option<ModuleKey> = None;

        let flagged = self
            .outputs
            .values()
            .flat_map(|output| output.inputs.values())
            .filter_map(|input| input.file_info.as_ref())
            .filter(|info| info.is_entry_point);

        for info in flagged {
            let key = relative_key(&base_dir, &info.full_path);
            match &found {
                None => found = Some(key),
                Some(first) if *first == key => {}
                Some(first) => {
                    return Err(GraphError::MultipleEntryPoints {
                        first: first.to_string(),
                        second: key.to_string(),
                    });
                }
            }
        }

        found.ok_or(GraphError::MissingEntryPoint)
    }

    /// Total bytes of all inputs.
    pub fn total_bytes(&self) -> u64 {
        self.inputs.values().map(|input| input.bytes).sum()
    }
}

/// Express `path` relative to `base_dir` with forward slashes.
///
/// Paths outside `base_dir` climb out of it with `..` segments.
fn relative_key(base_dir: &Path, path: &Path) -> ModuleKey {
    let cleaned = path.clean();
    let base: Vec<Component<'_>> = base_dir.components().collect();
    let target: Vec<Component<'_>> = cleaned.components().collect();
    let shared = base.iter().zip(&target).take_while(|(b, t)| b == t).count();

    let key = std::iter::repeat_n(Cow::Borrowed(".."), base.len() - shared)
        .chain(target[shared..].iter().map(|c| c.as_os_str().to_string_lossy()))
        .collect::<Vec<_>>()
        .join("/");
    ModuleKey::new(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESBUILD_META: &str = r#"{
        "inputs": {
            "node_modules/dep/index.js": { "bytes": 120, "imports": [] },
            "snapshot/entry.js": {
                "bytes": 64,
                "imports": [{ "path": "node_modules/dep/index.js" }]
            }
        },
        "outputs": {
            "/tmp/v8-snapshot/bundle.js": {
                "bytes": 512,
                "inputs": {
                    "node_modules/dep/index.js": {
                        "bytesInOutput": 100,
                        "fileInfo": {
                            "identifierName": "__dep",
                            "fullPath": "/work/app/node_modules/dep/index.js",
                            "isEntryPoint": false,
                            "replacementFunction": "__get_dep__"
                        }
                    },
                    "snapshot/entry.js": {
                        "bytesInOutput": 40,
                        "fileInfo": {
                            "identifierName": "__entry",
                            "fullPath": "/work/app/snapshot/entry.js",
                            "isEntryPoint": true
                        }
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_esbuild_style_metadata() {
        let meta = Metadata::from_json(ESBUILD_META).unwrap();

        assert_eq!(meta.inputs.len(), 2);
        let keys: Vec<_> = meta.inputs.keys().map(ModuleKey::as_str).collect();
        assert_eq!(keys, ["node_modules/dep/index.js", "snapshot/entry.js"]);
        assert_eq!(meta.total_bytes(), 184);

        let output = &meta.outputs["/tmp/v8-snapshot/bundle.js"];
        let dep = &output.inputs["node_modules/dep/index.js"];
        assert_eq!(dep.bytes_in_output, 100);
        assert_eq!(
            dep.file_info.as_ref().unwrap().replacement_function.as_deref(),
            Some("__get_dep__")
        );
    }

    #[test]
    fn entry_point_is_relative_to_base_dir() {
        let meta = Metadata::from_json(ESBUILD_META).unwrap();
        let entry = meta.entry_point("/work/app/").unwrap();
        assert_eq!(entry.as_str(), "snapshot/entry.js");
    }

    #[test]
    fn missing_entry_point_is_an_error() {
        let meta = Metadata::new().with_input("a.js", 1, Vec::<&str>::new());
        assert!(matches!(
            meta.entry_point("/"),
            Err(GraphError::MissingEntryPoint)
        ));
    }

    #[test]
    fn two_distinct_entry_points_are_rejected() {
        let mut meta = Metadata::new().with_entry_point("/p/a.js");
        meta.outputs.insert(
            "other.js".to_string(),
            OutputEntry {
                inputs: IndexMap::from([(
                    "b.js".to_string(),
                    OutputInput {
                        bytes_in_output: 0,
                        file_info: Some(FileInfo {
                            identifier_name: None,
                            full_path: PathBuf::from("/p/b.js"),
                            is_entry_point: true,
                            replacement_function: None,
                        }),
                    },
                )]),
                bytes: 0,
            },
        );

        let err = meta.entry_point("/p").unwrap_err();
        assert!(matches!(err, GraphError::MultipleEntryPoints { .. }));
    }

    #[test]
    fn entry_point_outside_base_dir_climbs_out() {
        let meta = Metadata::new()
            .with_input("../elsewhere/entry.js", 10, Vec::<&str>::new())
            .with_entry_point("/work/elsewhere/entry.js");

        let entry = meta.entry_point("/work/app").unwrap();
        assert_eq!(entry.as_str(), "../elsewhere/entry.js");
        assert!(meta.inputs.contains_key(entry.as_str()));
    }

    #[test]
    fn relative_key_cleans_before_comparing() {
        let key = relative_key(Path::new("/work/app"), Path::new("/work/app/lib/../snapshot/entry.js"));
        assert_eq!(key.as_str(), "snapshot/entry.js");
        let key = relative_key(Path::new("/a/b/c"), Path::new("/a/x.js"));
        assert_eq!(key.as_str(), "../../x.js");
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = Metadata::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GraphError::InvalidMetadata(_)));
    }

    #[test]
    fn duplicate_imports_are_preserved() {
        let meta = Metadata::new().with_input("a.js", 1, ["b.js", "b.js"]);
        assert_eq!(meta.inputs["a.js"].imports.len(), 2);
    }
}
