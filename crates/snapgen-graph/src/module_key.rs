//! Stable module keys.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A module's path relative to the project base dir, as reported by the bundler.
///
/// Keys are stable across re-bundles as long as the source files are unchanged,
/// so they are safe to carry from one metadata document to the next.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `./`-prefixed form used as a require path and in healing results.
    ///
    /// ```
    /// use snapgen_graph::ModuleKey;
    ///
    /// assert_eq!(ModuleKey::new("lib/a.js").require_path(), "./lib/a.js");
    /// ```
    pub fn require_path(&self) -> String {
        format!("./{}", self.0)
    }

    /// Strip a leading `./` from a require path, the inverse of [`Self::require_path`].
    pub fn from_require_path(path: &str) -> Self {
        Self::new(path.strip_prefix("./").unwrap_or(path))
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ModuleKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_path_round_trips() {
        let key = ModuleKey::new("node_modules/x/index.js");
        assert_eq!(ModuleKey::from_require_path(&key.require_path()), key);
    }

    #[test]
    fn from_require_path_accepts_bare_keys() {
        assert_eq!(ModuleKey::from_require_path("lib/a.js").as_str(), "lib/a.js");
    }
}
