//! Module identity: canonical module names and module sets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical, C-identifier-safe module name.
///
/// Unique within a package graph. Used as the key for baseline digest files
/// (`<baseline-dir>/<module>.json`) and for every per-module report line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    /// Wrap an already-canonical name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive the canonical module name from a target name.
    ///
    /// Every character that is not ASCII alphanumeric or `_` becomes `_`, and a
    /// leading digit is prefixed with `_`.
    pub fn from_target_name(target: &str) -> Self {
        let mut out = String::with_capacity(target.len() + 1);
        if target.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            out.push('_');
        }
        out.extend(target.chars().map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        }));
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of this module's baseline digest inside `baseline_dir`.
    pub fn digest_path(&self, baseline_dir: &Path) -> PathBuf {
        baseline_dir.join(format!("{}.json", self.0))
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A set of modules. Duplicates collapse; iteration is in name order.
pub type ModuleSet = BTreeSet<ModuleName>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_target_name_replaces_invalid_chars() {
        assert_eq!(ModuleName::from_target_name("my-lib").as_str(), "my_lib");
        assert_eq!(ModuleName::from_target_name("a.b c").as_str(), "a_b_c");
        assert_eq!(ModuleName::from_target_name("Foo_Bar").as_str(), "Foo_Bar");
    }

    #[test]
    fn test_from_target_name_prefixes_leading_digit() {
        assert_eq!(ModuleName::from_target_name("3d").as_str(), "_3d");
    }

    #[test]
    fn test_digest_path() {
        let name = ModuleName::new("Foo");
        assert_eq!(
            name.digest_path(Path::new("/tmp/base")),
            PathBuf::from("/tmp/base/Foo.json")
        );
    }

    #[test]
    fn test_module_set_collapses_duplicates() {
        let set: ModuleSet = ["B", "A", "B"].into_iter().map(ModuleName::from).collect();
        let names: Vec<&str> = set.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
