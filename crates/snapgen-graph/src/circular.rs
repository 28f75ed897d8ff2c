//! Direct two-node circular import detection.
//!
//! Module A's cycle partners are every B with A importing B and B importing A.
//! Longer cycles are not detected. The staging and optimization steps in the
//! doctor only exempt two-node cycles, so this stays pairwise.

use indexmap::IndexSet;
use rustc_hash::FxHashMap as HashMap;

use crate::{ModuleGraph, ModuleKey};

/// Per-module set of direct cycle partners.
#[derive(Debug, Clone, Default)]
pub struct CircularImports {
    partners: HashMap<ModuleKey, IndexSet<ModuleKey>>,
}

impl CircularImports {
    /// Compute the circularity map for a graph.
    pub fn detect(graph: &ModuleGraph) -> Self {
        let mut partners: HashMap<ModuleKey, IndexSet<ModuleKey>> = HashMap::default();

        for node in graph.modules() {
            let circs: IndexSet<ModuleKey> = node
                .imports
                .iter()
                .filter(|import| {
                    graph
                        .imports(import.as_str())
                        .is_ok_and(|back| back.contains(&node.key))
                })
                .cloned()
                .collect();

            if !circs.is_empty() {
                partners.insert(node.key.clone(), circs);
            }
        }

        Self { partners }
    }

    /// Cycle partners of `key`, if it has any.
    pub fn partners(&self, key: &str) -> Option<&IndexSet<ModuleKey>> {
        self.partners.get(key)
    }

    /// Whether `a` and `b` import each other directly.
    pub fn is_circular(&self, a: &str, b: &str) -> bool {
        self.partners(a).is_some_and(|set| set.contains(b))
    }

    /// Number of modules taking part in at least one direct cycle.
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// Number of unordered module pairs forming a direct cycle.
    ///
    /// A self-import counts as one pair.
    pub fn pair_count(&self) -> usize {
        let mut doubled = 0;
        for (key, set) in &self.partners {
            for partner in set {
                doubled += if partner == key { 2 } else { 1 };
            }
        }
        doubled / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, &IndexSet<ModuleKey>)> {
        self.partners.iter()
    }
}
