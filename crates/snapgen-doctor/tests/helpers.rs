//! Shared test utilities for snapgen-doctor tests
//!
//! The doctor is driven with in-memory collaborators: a bundler that always
//! returns the same graph, an assembler that encodes the probe in the script
//! text, and an oracle that decides from that text and records every probe.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::Mutex;
use snapgen_doctor::{
    AssembleOptions, AssemblyError, BundleOutput, BundleRequest, Bundler, BundlerError,
    DoctorOptions, ExecuteOptions, ExecutionOracle, Metadata, ModuleKey, OracleFailure,
    ScriptAssembler, SnapshotDoctor,
};

pub const BASE_DIR: &str = "/project";
pub const ENTRY: &str = "entry.js";

pub fn key(s: &str) -> ModuleKey {
    ModuleKey::new(s)
}

pub fn keys(xs: &[&str]) -> Vec<ModuleKey> {
    xs.iter().copied().map(ModuleKey::new).collect()
}

pub fn paths(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| format!("./{x}")).collect()
}

/// Metadata for `modules`, with `entry.js` flagged as the entry point.
pub fn graph_in(base_dir: &Path, modules: &[(&str, &[&str])]) -> Metadata {
    let mut meta = Metadata::new();
    for (key, imports) in modules {
        meta = meta.with_input(*key, 100, imports.iter().copied());
    }
    meta.with_entry_point(base_dir.join(ENTRY))
}

pub fn graph(modules: &[(&str, &[&str])]) -> Metadata {
    graph_in(Path::new(BASE_DIR), modules)
}

/// Modules evaluated when `entry` is required with `deferred` excluded.
///
/// `None` when the entry itself is deferred, which strict verification
/// rejects.
pub fn evaluated(
    meta: &Metadata,
    entry: &ModuleKey,
    deferred: &IndexSet<ModuleKey>,
) -> Option<IndexSet<ModuleKey>> {
    if deferred.contains(entry) {
        return None;
    }
    let mut seen = IndexSet::new();
    let mut stack = vec![entry.clone()];
    while let Some(current) = stack.pop() {
        if deferred.contains(&current) || !seen.insert(current.clone()) {
            continue;
        }
        if let Some(input) = meta.inputs.get(&current) {
            stack.extend(input.imports.iter().rev().map(|i| i.path.clone()));
        }
    }
    Some(seen)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub entry: ModuleKey,
    pub deferred: IndexSet<ModuleKey>,
}

type Verdict = dyn Fn(&ModuleKey, &IndexSet<ModuleKey>) -> bool + Send + Sync;

/// Oracle deciding with a predicate over (entry, deferred set).
pub struct MockOracle {
    verdict: Box<Verdict>,
    probes: Mutex<Vec<Probe>>,
}

impl std::fmt::Debug for MockOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockOracle")
            .field("probes", &self.probes.lock().len())
            .finish()
    }
}

impl MockOracle {
    pub fn new(
        verdict: impl Fn(&ModuleKey, &IndexSet<ModuleKey>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            verdict: Box::new(verdict),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn always_passes() -> Self {
        Self::new(|_, _| true)
    }

    /// Oracle that evaluates modules transitively through `meta` and fails
    /// when `fails` holds for the evaluated set.
    pub fn model(
        meta: &Metadata,
        fails: impl Fn(&IndexSet<ModuleKey>) -> bool + Send + Sync + 'static,
    ) -> Self {
        let meta = meta.clone();
        Self::new(move |entry, deferred| {
            evaluated(&meta, entry, deferred).is_some_and(|set| !fails(&set))
        })
    }

    /// Model where every module in `bad` throws when evaluated.
    pub fn throwing(meta: &Metadata, bad: &[&str]) -> Self {
        let bad = keys(bad);
        Self::model(meta, move |set| bad.iter().any(|b| set.contains(b)))
    }

    pub fn probes(&self) -> Vec<Probe> {
        self.probes.lock().clone()
    }

    pub fn probed_entries(&self) -> Vec<ModuleKey> {
        self.probes.lock().iter().map(|p| p.entry.clone()).collect()
    }

    pub fn verdict(&self, entry: &ModuleKey, deferred: &IndexSet<ModuleKey>) -> bool {
        (self.verdict)(entry, deferred)
    }
}

fn parse_script(script: &str) -> Probe {
    let mut lines = script.lines();
    let entry = ModuleKey::from_require_path(lines.next().unwrap_or_default());
    let deferred = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(ModuleKey::from_require_path)
        .collect();
    Probe { entry, deferred }
}

#[async_trait]
impl ExecutionOracle for MockOracle {
    async fn execute(&self, script: &str, options: &ExecuteOptions) -> Result<(), OracleFailure> {
        let probe = parse_script(script);
        assert_eq!(options.filename, probe.entry.require_path());

        let passed = self.verdict(&probe.entry, &probe.deferred);
        self.probes.lock().push(probe);
        if passed {
            Ok(())
        } else {
            Err(OracleFailure::new(format!("{} threw", options.filename)))
        }
    }
}

/// Script is the entry require path, then the unloadable list.
#[derive(Debug)]
pub struct MockAssembler;

impl ScriptAssembler for MockAssembler {
    fn assemble(
        &self,
        _bundle: &str,
        _metadata: &Metadata,
        _base_dir: &Path,
        options: &AssembleOptions,
    ) -> Result<String, AssemblyError> {
        assert!(options.strict_verifiers);
        Ok(format!(
            "{}\n{}",
            options.entry_point.clone().unwrap_or_default(),
            options.unloadable.join(",")
        ))
    }
}

/// Returns a fixed graph and records the deferred set of every call.
#[derive(Debug)]
pub struct MockBundler {
    metadata: Metadata,
    fail: bool,
    calls: Mutex<Vec<Vec<ModuleKey>>>,
}

impl MockBundler {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(metadata: Metadata) -> Self {
        Self {
            fail: true,
            ..Self::new(metadata)
        }
    }

    pub fn calls(&self) -> Vec<Vec<ModuleKey>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutput, BundlerError> {
        self.calls.lock().push(request.deferred.to_vec());
        if self.fail {
            return Err(BundlerError::Failed {
                command: "mock-bundler".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "boom".to_string(),
                stdout: String::new(),
            });
        }
        Ok(BundleOutput {
            metadata: self.metadata.clone(),
            bundle: request.deferred_require_paths().join(","),
        })
    }
}

pub struct Harness {
    pub doctor: SnapshotDoctor,
    pub bundler: Arc<MockBundler>,
    pub oracle: Arc<MockOracle>,
}

pub fn harness_with(base_dir: &Path, bundler: MockBundler, oracle: MockOracle) -> Harness {
    let bundler = Arc::new(bundler);
    let oracle = Arc::new(oracle);
    let doctor = SnapshotDoctor::new(
        DoctorOptions::new(base_dir, ENTRY),
        bundler.clone(),
        Arc::new(MockAssembler),
        oracle.clone(),
    );
    Harness {
        doctor,
        bundler,
        oracle,
    }
}

pub fn harness(meta: Metadata, oracle: MockOracle) -> Harness {
    harness_with(Path::new(BASE_DIR), MockBundler::new(meta), oracle)
}
