//! In-memory dependency graph built from bundler metadata.

use indexmap::IndexMap;

use crate::{GraphError, Metadata, ModuleKey, Result};

/// A bundled module: its key, ordered imports and byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub key: ModuleKey,
    /// Imported keys in bundler order. Duplicates are possible.
    pub imports: Vec<ModuleKey>,
    pub bytes: u64,
}

impl ModuleNode {
    /// A leaf module has no imports.
    pub fn is_leaf(&self) -> bool {
        self.imports.is_empty()
    }
}

/// Dependency graph keyed by module key, in metadata order.
///
/// Every import is validated against the module table on construction, so
/// lookups of imported keys never fail afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: IndexMap<ModuleKey, ModuleNode>,
}

impl ModuleGraph {
    /// Build the graph from a metadata document.
    ///
    /// Fails with [`GraphError::MissingImport`] when a module imports a key the
    /// metadata does not describe.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self> {
        let modules: IndexMap<ModuleKey, ModuleNode> = metadata
            .inputs
            .iter()
            .map(|(key, input)| {
                let node = ModuleNode {
                    key: key.clone(),
                    imports: input.imports.iter().map(|i| i.path.clone()).collect(),
                    bytes: input.bytes,
                };
                (key.clone(), node)
            })
            .collect();

        for node in modules.values() {
            if let Some(import) = node.imports.iter().find(|i| !modules.contains_key(*i)) {
                return Err(GraphError::MissingImport {
                    module: node.key.clone(),
                    import: import.clone(),
                });
            }
        }

        Ok(Self { modules })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module by key.
    pub fn module(&self, key: &str) -> Result<&ModuleNode> {
        self.modules
            .get(key)
            .ok_or_else(|| GraphError::UnknownModule(ModuleKey::new(key)))
    }

    /// Ordered imports of a module.
    pub fn imports(&self, key: &str) -> Result<&[ModuleKey]> {
        self.module(key).map(|node| node.imports.as_slice())
    }

    /// All modules in metadata order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values()
    }

    /// All keys in metadata order.
    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.modules.keys()
    }

    /// Modules with zero imports, in metadata order.
    pub fn leaves(&self) -> Vec<ModuleKey> {
        self.modules()
            .filter(|node| node.is_leaf())
            .map(|node| node.key.clone())
            .collect()
    }
}
