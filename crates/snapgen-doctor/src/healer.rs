//! Fixed-point loop growing the deferred set until the whole graph loads.

use snapgen_graph::{CircularImports, ModuleGraph, ModuleKey};

use crate::bundler::BundleOutput;
use crate::doctor::SnapshotDoctor;
use crate::state::HealState;
use crate::Result;

pub(crate) struct Healed {
    pub state: HealState,
    /// Last script assembled, kept for diagnostics.
    pub snapshot_script: Option<String>,
    /// Bundle and metadata of the terminal pass.
    pub output: BundleOutput,
}

pub(crate) struct Healer<'a> {
    doctor: &'a SnapshotDoctor,
    graph: &'a ModuleGraph,
    circulars: &'a CircularImports,
}

impl<'a> Healer<'a> {
    pub fn new(
        doctor: &'a SnapshotDoctor,
        graph: &'a ModuleGraph,
        circulars: &'a CircularImports,
    ) -> Self {
        Self {
            doctor,
            graph,
            circulars,
        }
    }

    /// Stage the graph, defer what failed, rebundle, and repeat until a pass
    /// leaves nothing pending.
    ///
    /// `deferred` only grows, and is bounded by the module count, so the loop
    /// terminates.
    pub async fn run(&self, initial: BundleOutput, mut state: HealState) -> Result<Healed> {
        let mut output = initial;
        let mut snapshot_script = self.process_current_script(&output, &mut state).await?;

        while state.has_pending() {
            let folded = state.fold_pending();
            tracing::info!(
                newly_deferred = folded.len(),
                deferred = state.deferred().len(),
                "rebundling with failed modules deferred"
            );

            output = self.doctor.create_bundle(&state.deferred_list()).await?;
            if let Some(script) = self.process_current_script(&output, &mut state).await? {
                snapshot_script = Some(script);
            }
        }

        Ok(Healed {
            state,
            snapshot_script,
            output,
        })
    }

    /// Test stage after stage against one bundle until no candidates remain.
    async fn process_current_script(
        &self,
        output: &BundleOutput,
        state: &mut HealState,
    ) -> Result<Option<String>> {
        tracing::info!("Processing current script");
        let deferred = state.deferred_list();
        let mut snapshot_script = None;

        loop {
            let stage = self.next_stage(state);
            if stage.is_empty() {
                break;
            }
            tracing::debug!(candidates = stage.len(), "next stage");

            // Outcomes only land in `verified` and `pending`, which the
            // candidates of this stage never look at.
            for key in stage {
                tracing::debug!("Testing entry in isolation \"{}\"", key);
                let script = self.doctor.assemble_probe(&key, output, &deferred)?;
                if self.doctor.test_script(&key, &script, deferred.len()).await {
                    state.mark_verified(key);
                } else {
                    state.mark_needs_defer(key);
                }
                snapshot_script = Some(script);
            }
        }

        Ok(snapshot_script)
    }

    /// Leaves when nothing was visited yet, otherwise every module whose
    /// imports are handled or are direct cycle partners.
    fn next_stage(&self, state: &HealState) -> Vec<ModuleKey> {
        if state.visited() == 0 {
            self.graph.leaves()
        } else {
            self.graph.verifiable_modules(
                self.circulars,
                |key| state.was_handled(key),
                |key| state.is_pending(key),
            )
        }
    }
}
