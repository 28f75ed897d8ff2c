//! Leaf-first ordering of the module graph.

use rustc_hash::FxHashSet as HashSet;

use crate::{CircularImports, ModuleGraph, ModuleKey};

impl ModuleGraph {
    /// Modules that are ready to be tested in the next stage.
    ///
    /// A module is ready when it is neither handled nor pending and every one
    /// of its imports is handled or is a direct cycle partner.
    pub fn verifiable_modules<H, P>(
        &self,
        circulars: &CircularImports,
        is_handled: H,
        is_pending: P,
    ) -> Vec<ModuleKey>
    where
        H: Fn(&ModuleKey) -> bool,
        P: Fn(&ModuleKey) -> bool,
    {
        self.modules()
            .filter(|node| !is_pending(&node.key) && !is_handled(&node.key))
            .filter(|node| {
                let partners = circulars.partners(node.key.as_str());
                node.imports.iter().all(|import| {
                    is_handled(import) || partners.is_some_and(|set| set.contains(import))
                })
            })
            .map(|node| node.key.clone())
            .collect()
    }

    /// Every module, leaves first.
    ///
    /// Each round takes the modules whose imports were all placed in earlier
    /// rounds (or are direct cycle partners), ordered by import count with the
    /// most imports first. Modules caught in longer cycles never become ready;
    /// they are appended in metadata order once no round makes progress.
    pub fn sort_by_leafness(&self, circulars: &CircularImports) -> Vec<ModuleKey> {
        let mut sorted = Vec::with_capacity(self.len());
        let mut handled: HashSet<&ModuleKey> = HashSet::default();

        while handled.len() < self.len() {
            let mut just_sorted: Vec<_> = self
                .modules()
                .filter(|node| !handled.contains(&node.key))
                .filter(|node| {
                    let partners = circulars.partners(node.key.as_str());
                    node.imports.iter().all(|import| {
                        handled.contains(import) || partners.is_some_and(|set| set.contains(import))
                    })
                })
                .collect();

            if just_sorted.is_empty() {
                sorted.extend(
                    self.keys()
                        .filter(|key| !handled.contains(key))
                        .cloned(),
                );
                break;
            }

            just_sorted.sort_by(|a, b| b.imports.len().cmp(&a.imports.len()));
            for node in just_sorted {
                sorted.push(node.key.clone());
                handled.insert(&node.key);
            }
        }

        sorted
    }

    /// The members of `subset` in leafness order.
    pub fn sort_subset_by_leafness<F>(&self, circulars: &CircularImports, subset: F) -> Vec<ModuleKey>
    where
        F: Fn(&ModuleKey) -> bool,
    {
        self.sort_by_leafness(circulars)
            .into_iter()
            .filter(|key| subset(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metadata;

    fn keys(xs: &[&str]) -> Vec<ModuleKey> {
        xs.iter().copied().map(ModuleKey::new).collect()
    }

    fn graph(meta: Metadata) -> (ModuleGraph, CircularImports) {
        let g = ModuleGraph::from_metadata(&meta).unwrap();
        let c = CircularImports::detect(&g);
        (g, c)
    }

    #[test]
    fn leafness_orders_dependencies_first() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("c.js", 1, ["b.js"])
                .with_input("b.js", 1, ["a.js"])
                .with_input("a.js", 1, Vec::<&str>::new()),
        );
        assert_eq!(g.sort_by_leafness(&c), keys(&["a.js", "b.js", "c.js"]));
    }

    #[test]
    fn rounds_prefer_modules_with_more_imports() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("x.js", 1, Vec::<&str>::new())
                .with_input("y.js", 1, Vec::<&str>::new())
                .with_input("one.js", 1, ["x.js"])
                .with_input("two.js", 1, ["x.js", "y.js"]),
        );
        assert_eq!(
            g.sort_by_leafness(&c),
            keys(&["x.js", "y.js", "two.js", "one.js"])
        );
    }

    #[test]
    fn two_node_cycles_are_sorted_together() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("a.js", 1, ["b.js"])
                .with_input("b.js", 1, ["a.js"])
                .with_input("top.js", 1, ["a.js"]),
        );
        assert_eq!(g.sort_by_leafness(&c), keys(&["a.js", "b.js", "top.js"]));
    }

    #[test]
    fn longer_cycles_are_appended_instead_of_looping() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("leaf.js", 1, Vec::<&str>::new())
                .with_input("a.js", 1, ["b.js"])
                .with_input("b.js", 1, ["c.js"])
                .with_input("c.js", 1, ["a.js", "leaf.js"]),
        );
        assert_eq!(
            g.sort_by_leafness(&c),
            keys(&["leaf.js", "a.js", "b.js", "c.js"])
        );
    }

    #[test]
    fn subset_sorting_keeps_only_members() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("c.js", 1, ["b.js"])
                .with_input("b.js", 1, ["a.js"])
                .with_input("a.js", 1, Vec::<&str>::new()),
        );
        let subset = keys(&["c.js", "a.js"]);
        assert_eq!(
            g.sort_subset_by_leafness(&c, |k| subset.contains(k)),
            keys(&["a.js", "c.js"])
        );
    }

    #[test]
    fn verifiables_skip_handled_and_pending() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("a.js", 1, Vec::<&str>::new())
                .with_input("b.js", 1, ["a.js"])
                .with_input("c.js", 1, ["b.js"])
                .with_input("d.js", 1, Vec::<&str>::new()),
        );
        let handled = keys(&["a.js"]);
        let pending = keys(&["d.js"]);
        let ready = g.verifiable_modules(&c, |k| handled.contains(k), |k| pending.contains(k));
        assert_eq!(ready, keys(&["b.js"]));
    }

    #[test]
    fn circular_partners_excuse_each_other() {
        let (g, c) = graph(
            Metadata::new()
                .with_input("leaf.js", 1, Vec::<&str>::new())
                .with_input("a.js", 1, ["b.js", "leaf.js"])
                .with_input("b.js", 1, ["a.js"]),
        );
        let handled = keys(&["leaf.js"]);
        let ready = g.verifiable_modules(&c, |k| handled.contains(k), |_| false);
        assert_eq!(ready, keys(&["a.js", "b.js"]));
    }
}
