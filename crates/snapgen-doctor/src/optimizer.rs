//! Shrinks the raw deferred set.
//!
//! Phase 1 pushes each whole-module defer down to a single import where that
//! suffices. Phase 2 drops defers the application entry point no longer needs
//! because a deferred ancestor already covers them.

use indexmap::IndexSet;
use snapgen_graph::{ModuleGraph, ModuleKey};

use crate::doctor::SnapshotDoctor;
use crate::Result;

pub(crate) struct Optimized {
    pub deferred: IndexSet<ModuleKey>,
    /// `deferred` before redundant defers were removed.
    pub including_implicit: IndexSet<ModuleKey>,
}

pub(crate) struct Optimizer<'a> {
    doctor: &'a SnapshotDoctor,
    graph: &'a ModuleGraph,
}

fn with_extra<'k>(
    base: &IndexSet<ModuleKey>,
    extra: impl IntoIterator<Item = &'k ModuleKey>,
) -> Vec<ModuleKey> {
    let mut probe = base.clone();
    probe.extend(extra.into_iter().cloned());
    probe.into_iter().collect()
}

impl<'a> Optimizer<'a> {
    pub fn new(doctor: &'a SnapshotDoctor, graph: &'a ModuleGraph) -> Self {
        Self { doctor, graph }
    }

    /// `sorted_deferred` must be in leafness order, which makes the result
    /// deterministic and lets fixes to dependencies obviate their dependents.
    pub async fn optimize(
        &self,
        sorted_deferred: &[ModuleKey],
        forced: &[ModuleKey],
        entry: &ModuleKey,
    ) -> Result<Optimized> {
        let mut deferred: IndexSet<ModuleKey> = forced.iter().cloned().collect();

        self.push_down(sorted_deferred, forced, &mut deferred).await?;
        let including_implicit = deferred.clone();
        self.eliminate_redundant(entry, forced, &mut deferred).await?;

        Ok(Optimized {
            deferred,
            including_implicit,
        })
    }

    /// Phase 1: prefer deferring one import over its dependent.
    ///
    /// Only single imports are tried. When a module needs more than one of
    /// its imports deferred, the module itself is deferred instead.
    pub async fn push_down(
        &self,
        sorted_deferred: &[ModuleKey],
        forced: &[ModuleKey],
        optimized: &mut IndexSet<ModuleKey>,
    ) -> Result<()> {
        for key in sorted_deferred {
            if forced.contains(key) {
                continue;
            }
            if optimized.contains(key) {
                tracing::debug!(module = %key, "already deferred as an import of an earlier module");
                continue;
            }

            let imports: IndexSet<&ModuleKey> = self.graph.imports(key.as_str())?.iter().collect();
            if imports.is_empty() {
                optimized.insert(key.clone());
                tracing::info!("Optimize: deferred leaf {}", key);
                continue;
            }

            // Fixed by a defer added for an earlier module.
            let current: Vec<ModuleKey> = optimized.iter().cloned().collect();
            if self.doctor.entry_works_when_deferring(key, &current).await? {
                tracing::info!("Optimize: deferring no longer needed for {}", key);
                continue;
            }

            let all_imports = with_extra(optimized, imports.iter().copied());
            if !self.doctor.entry_works_when_deferring(key, &all_imports).await? {
                optimized.insert(key.clone());
                tracing::info!("Optimize: deferred unfixable parent {}", key);
                continue;
            }

            let mut fixed_by = None;
            for import in &imports {
                let probe = with_extra(optimized, [*import]);
                if self.doctor.entry_works_when_deferring(key, &probe).await? {
                    fixed_by = Some((*import).clone());
                    break;
                }
            }

            match fixed_by {
                Some(import) => {
                    tracing::info!("Optimize: deferred import \"{}\" of \"{}\"", import, key);
                    optimized.insert(import);
                }
                None => {
                    tracing::debug!(
                        "{} only loads when more than one of its imports is deferred, deferring the module instead",
                        key
                    );
                    optimized.insert(key.clone());
                    tracing::info!("Optimize: deferred parent with >1 problematic import {}", key);
                }
            }
        }

        Ok(())
    }

    /// Phase 2: remove defers the real entry point does not need.
    ///
    /// Iterates a snapshot of the set while removing from the live set.
    pub async fn eliminate_redundant(
        &self,
        entry: &ModuleKey,
        forced: &[ModuleKey],
        optimized: &mut IndexSet<ModuleKey>,
    ) -> Result<()> {
        let candidates: Vec<ModuleKey> = optimized.iter().cloned().collect();

        for key in candidates {
            if forced.contains(&key) {
                continue;
            }
            let without: Vec<ModuleKey> = optimized.iter().filter(|k| **k != key).cloned().collect();
            if self.doctor.entry_works_when_deferring(entry, &without).await? {
                optimized.shift_remove(&key);
                tracing::info!(
                    "Optimize: removing defer of \"{}\", already deferred implicitly",
                    key
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_sets_keep_order_and_skip_duplicates() {
        let base: IndexSet<ModuleKey> = ["a.js", "b.js"].into_iter().map(ModuleKey::new).collect();
        let extra = [ModuleKey::new("b.js"), ModuleKey::new("c.js")];

        let probe = with_extra(&base, &extra);
        assert_eq!(
            probe,
            vec![ModuleKey::new("a.js"), ModuleKey::new("b.js"), ModuleKey::new("c.js")]
        );
    }
}
