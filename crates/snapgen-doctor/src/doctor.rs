//! The snapshot doctor: heal, then optimize.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use path_clean::PathClean;
use serde::Serialize;
use snapgen_config::{SnapgenConfig, validate_schema};
use snapgen_graph::{CircularImports, GraphStatistics, Metadata, ModuleGraph, ModuleKey};

use crate::assembler::{AssembleOptions, BlueprintAssembler, ScriptAssembler};
use crate::bundler::{BundleOutput, BundleRequest, Bundler, ProcessBundler};
use crate::healer::Healer;
use crate::optimizer::Optimizer;
use crate::oracle::{ExecuteOptions, ExecutionOracle, NodeOracle};
use crate::state::HealState;
use crate::Result;

/// Project locations the doctor hands to the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorOptions {
    pub base_dir: PathBuf,
    pub entry_file: PathBuf,
}

impl DoctorOptions {
    /// `entry_file` may be absolute or relative to `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, entry_file: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into().clean();
        let entry_file = base_dir.join(entry_file.into()).clean();
        Self {
            base_dir,
            entry_file,
        }
    }
}

impl From<&SnapgenConfig> for DoctorOptions {
    fn from(config: &SnapgenConfig) -> Self {
        Self::new(&config.base_dir, &config.entry_file)
    }
}

/// Outcome of a heal.
///
/// `deferred` is the optimized set handed to the snapshot bundler.
/// `including_implicit_deferred` is the same set before redundant defers
/// were removed, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealResult {
    pub verified: IndexSet<ModuleKey>,
    pub deferred: Vec<String>,
    pub including_implicit_deferred: Vec<String>,
    pub bundle: String,
    pub snapshot_script: Option<String>,
    pub metadata: Metadata,
}

fn pathify<'a>(keys: impl IntoIterator<Item = &'a ModuleKey>) -> Vec<String> {
    keys.into_iter().map(ModuleKey::require_path).collect()
}

/// Finds the modules that must be deferred for a snapshot to build.
///
/// The doctor owns no mutable state. Every [`heal`](Self::heal) creates its
/// own [`HealState`], so one doctor can serve concurrent heals.
#[derive(Debug, Clone)]
pub struct SnapshotDoctor {
    options: DoctorOptions,
    bundler: Arc<dyn Bundler>,
    assembler: Arc<dyn ScriptAssembler>,
    oracle: Arc<dyn ExecutionOracle>,
}

impl SnapshotDoctor {
    pub fn new(
        options: DoctorOptions,
        bundler: Arc<dyn Bundler>,
        assembler: Arc<dyn ScriptAssembler>,
        oracle: Arc<dyn ExecutionOracle>,
    ) -> Self {
        Self {
            options,
            bundler,
            assembler,
            oracle,
        }
    }

    /// Doctor driving the external bundler and a `node` oracle.
    pub fn from_config(config: &SnapgenConfig) -> Result<Self> {
        validate_schema(config)?;

        let assembler = match config.blueprint_file() {
            Some(path) => BlueprintAssembler::from_file(path)?,
            None => BlueprintAssembler::new(),
        };
        let oracle = NodeOracle::new(&config.node_path)
            .with_timeout(Duration::from_millis(config.oracle_timeout_ms));

        Ok(Self::new(
            DoctorOptions::from(config),
            Arc::new(ProcessBundler::new(config.bundler_executable())),
            Arc::new(assembler),
            Arc::new(oracle),
        ))
    }

    pub fn options(&self) -> &DoctorOptions {
        &self.options
    }

    /// Find the deferred modules for the project and shrink them.
    ///
    /// `force_deferred` modules are deferred from the first bundle on and are
    /// never optimized away. Fails only when the bundler fails or its
    /// metadata is malformed; modules that throw are deferred instead.
    pub async fn heal(&self, force_deferred: &[ModuleKey]) -> Result<HealResult> {
        let initial = self.create_bundle(force_deferred).await?;
        let entry = initial.metadata.entry_point(&self.options.base_dir)?;

        // Keys are stable across re-bundles, so the graph used for staging
        // and ordering is built once.
        let graph = ModuleGraph::from_metadata(&initial.metadata)?;
        let circulars = CircularImports::detect(&graph);
        tracing::info!(
            entry = %entry,
            "{}",
            GraphStatistics::collect(&graph, &circulars)
        );
        for (key, partners) in circulars.iter() {
            tracing::debug!(module = %key, ?partners, "circular imports");
        }

        let state = HealState::new(force_deferred.iter().cloned());
        let healed = Healer::new(self, &graph, &circulars)
            .run(initial, state)
            .await?;

        let unreached: Vec<_> = graph
            .keys()
            .filter(|key| !healed.state.was_handled(key))
            .collect();
        if !unreached.is_empty() {
            tracing::warn!(
                count = unreached.len(),
                modules = ?unreached,
                "modules were never staged, they import each other in a cycle longer than two"
            );
        }

        let sorted_deferred =
            graph.sort_subset_by_leafness(&circulars, |key| healed.state.deferred().contains(key));

        tracing::info!("Optimizing");
        let optimized = Optimizer::new(self, &graph)
            .optimize(&sorted_deferred, force_deferred, &entry)
            .await?;
        tracing::info!("Optimized");
        tracing::debug!(all_deferred = ?sorted_deferred, len = sorted_deferred.len());
        tracing::info!(optimized_deferred = ?optimized.deferred, len = optimized.deferred.len());

        let (verified, _) = healed.state.into_parts();
        Ok(HealResult {
            verified,
            deferred: pathify(&optimized.deferred),
            including_implicit_deferred: pathify(&optimized.including_implicit),
            bundle: healed.output.bundle,
            snapshot_script: healed.snapshot_script,
            metadata: healed.output.metadata,
        })
    }

    pub(crate) async fn create_bundle(&self, deferred: &[ModuleKey]) -> Result<BundleOutput> {
        let request = BundleRequest::new(
            &self.options.base_dir,
            &self.options.entry_file,
            deferred,
        );
        self.bundler.bundle(&request).await.map_err(|err| {
            tracing::error!("Failed creating bundle: {}", err);
            err.into()
        })
    }

    /// Assemble `output` with `key` as the sole, strictly verified entry point.
    pub(crate) fn assemble_probe(
        &self,
        key: &ModuleKey,
        output: &BundleOutput,
        deferred: &[ModuleKey],
    ) -> Result<String> {
        let options = AssembleOptions::probe(
            key.require_path(),
            deferred.iter().map(ModuleKey::require_path).collect(),
        );
        Ok(self.assembler.assemble(
            &output.bundle,
            &output.metadata,
            &self.options.base_dir,
            &options,
        )?)
    }

    /// Run `script` and report whether `key` loaded.
    pub(crate) async fn test_script(
        &self,
        key: &ModuleKey,
        script: &str,
        deferred_count: usize,
    ) -> bool {
        match self
            .oracle
            .execute(script, &ExecuteOptions::new(key.require_path()))
            .await
        {
            Ok(()) => {
                tracing::debug!(module = %key, "Successfully verified");
                true
            }
            Err(failure) => {
                tracing::debug!(module = %key, "{}", failure);
                tracing::info!(
                    "\"{}\" cannot be loaded for current setup ({} deferred)",
                    key,
                    deferred_count
                );
                false
            }
        }
    }

    /// Rebundle with `deferring` and check whether `key` loads as the entry.
    pub(crate) async fn entry_works_when_deferring(
        &self,
        key: &ModuleKey,
        deferring: &[ModuleKey],
    ) -> Result<bool> {
        let output = self.create_bundle(deferring).await?;
        let script = self.assemble_probe(key, &output, deferring)?;
        Ok(self.test_script(key, &script, deferring.len()).await)
    }
}
