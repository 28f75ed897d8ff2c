//! Bookkeeping threaded through a heal.

use indexmap::IndexSet;
use snapgen_graph::ModuleKey;

/// Verified, deferred and pending-defer modules of one heal run.
///
/// A module is never both verified and deferred. Pending modules failed in
/// the current pass and are folded into `deferred` once the pass is over.
/// Sets keep insertion order so results are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealState {
    verified: IndexSet<ModuleKey>,
    deferred: IndexSet<ModuleKey>,
    need_defer: IndexSet<ModuleKey>,
}

impl HealState {
    /// Start with `deferred` already excluded from eager loading.
    pub fn new(deferred: impl IntoIterator<Item = ModuleKey>) -> Self {
        Self {
            deferred: deferred.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn verified(&self) -> &IndexSet<ModuleKey> {
        &self.verified
    }

    pub fn deferred(&self) -> &IndexSet<ModuleKey> {
        &self.deferred
    }

    /// Verified or deferred.
    pub fn was_handled(&self, key: &ModuleKey) -> bool {
        self.verified.contains(key) || self.deferred.contains(key)
    }

    pub fn is_pending(&self, key: &ModuleKey) -> bool {
        self.need_defer.contains(key)
    }

    /// Number of modules that are verified, deferred or pending.
    pub fn visited(&self) -> usize {
        self.verified.len() + self.deferred.len() + self.need_defer.len()
    }

    pub fn mark_verified(&mut self, key: ModuleKey) {
        debug_assert!(
            !self.deferred.contains(&key),
            "{key} cannot be verified while deferred"
        );
        self.verified.insert(key);
    }

    pub fn mark_needs_defer(&mut self, key: ModuleKey) {
        self.need_defer.insert(key);
    }

    pub fn has_pending(&self) -> bool {
        !self.need_defer.is_empty()
    }

    /// Move every pending module into `deferred`.
    ///
    /// Returns the modules that were folded in.
    pub fn fold_pending(&mut self) -> Vec<ModuleKey> {
        let folded: Vec<_> = self.need_defer.iter().cloned().collect();
        self.need_defer.clear();
        self.deferred.extend(folded.iter().cloned());
        folded
    }

    /// Deferred modules as an owned list, in the order they were added.
    pub fn deferred_list(&self) -> Vec<ModuleKey> {
        self.deferred.iter().cloned().collect()
    }

    pub fn into_parts(self) -> (IndexSet<ModuleKey>, IndexSet<ModuleKey>) {
        (self.verified, self.deferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ModuleKey {
        ModuleKey::new(s)
    }

    #[test]
    fn fold_moves_pending_into_deferred() {
        let mut state = HealState::new([key("forced.js")]);
        state.mark_verified(key("a.js"));
        state.mark_needs_defer(key("b.js"));
        state.mark_needs_defer(key("c.js"));

        assert_eq!(state.visited(), 4);
        assert!(state.has_pending());
        assert!(!state.was_handled(&key("b.js")));

        let folded = state.fold_pending();
        assert_eq!(folded, vec![key("b.js"), key("c.js")]);
        assert!(!state.has_pending());
        assert_eq!(
            state.deferred_list(),
            vec![key("forced.js"), key("b.js"), key("c.js")]
        );
        assert!(state.was_handled(&key("b.js")));
    }

    #[test]
    fn empty_state_has_visited_nothing() {
        let state = HealState::default();
        assert_eq!(state.visited(), 0);
        assert!(!state.has_pending());
    }

    #[test]
    #[should_panic(expected = "cannot be verified while deferred")]
    #[cfg(debug_assertions)]
    fn verifying_a_deferred_module_is_a_bug() {
        let mut state = HealState::new([key("a.js")]);
        state.mark_verified(key("a.js"));
    }
}
