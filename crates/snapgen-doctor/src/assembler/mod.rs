//! Snapshot script assembly
//!
//! Embeds a bundle into the snapshot blueprint so it can be executed as one
//! self-contained script. In strict mode the assembled script refuses to
//! evaluate deferred modules eagerly, so a probe that only passes by reaching
//! into a deferred module fails instead.

use std::path::{Path, PathBuf};

use snapgen_graph::{GraphError, Metadata};

const BUILTIN_BLUEPRINT: &str = include_str!("blueprint.js");

const PLATFORM_MARKER: &str = "processPlatform";
const PATH_SEPARATOR_MARKER: &str = "const pathSeparator = null";
const AUXILIARY_DATA_MARKER: &str = "var snapshotAuxiliaryData = {}";
const MAIN_MODULE_MARKER: &str = "mainModuleRequirePath";
const DEFINITIONS_MARKER: &str = "customRequire.definitions = {}";
const STRICT_MARKER: &str = "require.isStrict = false";
const VERIFIER_MARKER: &str = "function verifyModuleCanBeLoaded(moduleName) {}";

const MARKERS: [&str; 7] = [
    PLATFORM_MARKER,
    PATH_SEPARATOR_MARKER,
    AUXILIARY_DATA_MARKER,
    MAIN_MODULE_MARKER,
    DEFINITIONS_MARKER,
    STRICT_MARKER,
    VERIFIER_MARKER,
];

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("blueprint is missing the '{0}' placeholder")]
    MissingMarker(&'static str),

    #[error("unable to determine the main module: {0}")]
    Metadata(#[from] GraphError),

    #[error("unable to read blueprint {}: {source}", path.display())]
    Blueprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to encode auxiliary data: {0}")]
    AuxiliaryData(#[from] serde_json::Error),
}

/// Options for one assembled script.
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// `./`-prefixed require path to run first. Defaults to the metadata's
    /// entry point.
    pub entry_point: Option<String>,
    /// Fail loudly when a deferred module would be evaluated eagerly.
    pub strict_verifiers: bool,
    /// Require paths that may not be evaluated in strict mode.
    pub unloadable: Vec<String>,
}

impl AssembleOptions {
    /// Strict options for probing `entry_point` with `unloadable` deferred.
    pub fn probe(entry_point: impl Into<String>, unloadable: Vec<String>) -> Self {
        Self {
            entry_point: Some(entry_point.into()),
            strict_verifiers: true,
            unloadable,
        }
    }
}

/// Turns a bundle into a runnable snapshot script.
pub trait ScriptAssembler: Send + Sync + std::fmt::Debug {
    fn assemble(
        &self,
        bundle: &str,
        metadata: &Metadata,
        base_dir: &Path,
        options: &AssembleOptions,
    ) -> Result<String, AssemblyError>;
}

/// Assembles scripts from a blueprint containing well-known placeholders.
#[derive(Debug, Clone)]
pub struct BlueprintAssembler {
    blueprint: String,
    auxiliary_data: serde_json::Value,
}

impl Default for BlueprintAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueprintAssembler {
    /// Assembler using the built-in blueprint.
    pub fn new() -> Self {
        Self {
            blueprint: BUILTIN_BLUEPRINT.to_string(),
            auxiliary_data: serde_json::Value::Object(Default::default()),
        }
    }

    /// Assembler using a custom blueprint. Every placeholder must be present.
    pub fn from_blueprint(blueprint: impl Into<String>) -> Result<Self, AssemblyError> {
        let blueprint = blueprint.into();
        if let Some(marker) = MARKERS.iter().find(|m| !blueprint.contains(**m)) {
            return Err(AssemblyError::MissingMarker(*marker));
        }
        Ok(Self {
            blueprint,
            ..Self::new()
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssemblyError> {
        let path = path.as_ref();
        let blueprint = std::fs::read_to_string(path).map_err(|source| AssemblyError::Blueprint {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_blueprint(blueprint)
    }

    /// Data exposed to the snapshot as `snapshotAuxiliaryData`.
    pub fn with_auxiliary_data(mut self, data: serde_json::Value) -> Self {
        self.auxiliary_data = data;
        self
    }
}

fn replace_marker(
    script: String,
    marker: &'static str,
    replacement: &str,
) -> Result<String, AssemblyError> {
    if !script.contains(marker) {
        return Err(AssemblyError::MissingMarker(marker));
    }
    Ok(script.replacen(marker, replacement, 1))
}

/// Name node reports for this platform in `process.platform`.
fn node_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        os => os,
    }
}

fn require_definitions(bundle: &str) -> String {
    let indented = bundle.split('\n').collect::<Vec<_>>().join("\n  ");
    format!(
        "
  //
  // Start Bundle generated with esbuild
  //
  {indented}
  //
  // End Bundle generated with esbuild
  //

  customRequire.definitions = __commonJS
"
    )
}

fn module_verifier(unloadable: &[String]) -> Result<String, AssemblyError> {
    let unloadables = serde_json::to_string(unloadable)?;
    Ok(format!(
        "
  const unloadables = new Set({unloadables})
  function verifyModuleCanBeLoaded(moduleName) {{
     if (unloadables.has(moduleName)) {{
        throw new Error(
          '[SNAPSHOT_CACHE_FAILURE] Cannot load deferred or norewrite module \"' +
          moduleName + '\"' +
          ' during snapshot creation'
        )
     }}
  }}
  "
    ))
}

impl ScriptAssembler for BlueprintAssembler {
    fn assemble(
        &self,
        bundle: &str,
        metadata: &Metadata,
        base_dir: &Path,
        options: &AssembleOptions,
    ) -> Result<String, AssemblyError> {
        let main_module = match &options.entry_point {
            Some(entry) => entry.clone(),
            None => metadata.entry_point(base_dir)?.require_path(),
        };

        let separator = serde_json::to_string(&std::path::MAIN_SEPARATOR.to_string())?;
        let auxiliary = serde_json::to_string(&self.auxiliary_data)?;

        let mut script = self.blueprint.clone();
        script = replace_marker(script, PLATFORM_MARKER, node_platform())?;
        script = replace_marker(
            script,
            PATH_SEPARATOR_MARKER,
            &format!("const pathSeparator = {separator}"),
        )?;
        script = replace_marker(
            script,
            AUXILIARY_DATA_MARKER,
            &format!("var snapshotAuxiliaryData = {auxiliary};"),
        )?;
        script = replace_marker(
            script,
            MAIN_MODULE_MARKER,
            &serde_json::to_string(&main_module)?,
        )?;

        if options.strict_verifiers {
            script = replace_marker(script, STRICT_MARKER, "require.isStrict = true")?;
            script = replace_marker(script, VERIFIER_MARKER, &module_verifier(&options.unloadable)?)?;
        }

        // Last, so markers inside the bundle text are never touched.
        replace_marker(script, DEFINITIONS_MARKER, &require_definitions(bundle))
    }
}
