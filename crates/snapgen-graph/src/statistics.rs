//! Summary statistics for a module graph.

use serde::{Deserialize, Serialize};

use crate::{CircularImports, ModuleGraph};

/// Aggregate numbers about a module graph, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub module_count: usize,
    pub leaf_count: usize,
    pub import_count: usize,
    pub circular_pair_count: usize,
    pub total_bytes: u64,
}

impl GraphStatistics {
    pub fn collect(graph: &ModuleGraph, circulars: &CircularImports) -> Self {
        let mut stats = Self {
            circular_pair_count: circulars.pair_count(),
            ..Self::default()
        };

        for node in graph.modules() {
            stats.module_count += 1;
            stats.import_count += node.imports.len();
            stats.total_bytes += node.bytes;
            if node.is_leaf() {
                stats.leaf_count += 1;
            }
        }

        stats
    }
}

impl std::fmt::Display for GraphStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} modules ({} leaves), {} imports, {} circular pairs, {} bytes",
            self.module_count,
            self.leaf_count,
            self.import_count,
            self.circular_pair_count,
            self.total_bytes
        )
    }
}
