//! Per-module comparison results and the aggregate run outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::diagnostic::Diagnostic;
use super::module::{ModuleName, ModuleSet};
use crate::allowlist::AllowList;

/// Result of comparing one module against its baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub module: ModuleName,

    /// Breaking changes, in the order the digester reported them.
    pub breaking_changes: Vec<Diagnostic>,

    /// Every other diagnostic the digester emitted.
    pub other_diagnostics: Vec<Diagnostic>,
}

impl ComparisonResult {
    pub fn new(module: ModuleName) -> Self {
        Self {
            module,
            breaking_changes: Vec::new(),
            other_diagnostics: Vec::new(),
        }
    }

    pub fn has_no_breaking_changes(&self) -> bool {
        self.breaking_changes.is_empty()
    }

    /// Drop breaking changes whose message is allowlisted.
    pub fn filter_allowed(mut self, allowlist: &AllowList) -> Self {
        self.breaking_changes
            .retain(|change| !allowlist.contains(&change.message));
        self
    }
}

/// Why a requested module was not compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The baseline revision does not define the module.
    NotInBaseline,
    /// The baseline digest for the module could not be generated.
    GenerationFailed,
}

/// Aggregate of a comparison run.
///
/// `requested` is partitioned into `skipped`, `failed` and the modules of
/// `results`; each requested module lands in exactly one of them.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub requested: ModuleSet,
    pub skipped: BTreeMap<ModuleName, SkipReason>,
    /// Failed modules with the error that failed them.
    pub failed: BTreeMap<ModuleName, String>,
    pub results: Vec<ComparisonResult>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> ModuleSet {
        self.results.iter().map(|r| r.module.clone()).collect()
    }

    pub fn result(&self, module: &ModuleName) -> Option<&ComparisonResult> {
        self.results.iter().find(|r| &r.module == module)
    }

    /// Results sorted by module name.
    pub fn sorted_results(&self) -> Vec<&ComparisonResult> {
        let mut sorted: Vec<&ComparisonResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.module.cmp(&b.module));
        sorted
    }

    /// Whether skipped, failed and succeeded partition `requested`.
    pub fn is_partition(&self) -> bool {
        let succeeded = self.succeeded();
        let total = self.skipped.len() + self.failed.len() + self.results.len();
        if total != self.requested.len() || succeeded.len() != self.results.len() {
            return false;
        }
        self.requested.iter().all(|m| {
            let hits = usize::from(self.skipped.contains_key(m))
                + usize::from(self.failed.contains_key(m))
                + usize::from(succeeded.contains(m));
            hits == 1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::Severity;

    fn module_set(names: &[&str]) -> ModuleSet {
        names.iter().map(|n| ModuleName::from(*n)).collect()
    }

    #[test]
    fn test_filter_allowed_removes_exact_matches_only() {
        let mut result = ComparisonResult::new(ModuleName::from("Foo"));
        result.breaking_changes = vec![
            Diagnostic::new(Severity::Error, "API breakage: func foo() has been removed"),
            Diagnostic::new(Severity::Error, "API breakage: func bar() has been removed"),
        ];
        let allowlist =
            AllowList::from_entries(["API breakage: func foo() has been removed".to_string()]);

        let filtered = result.filter_allowed(&allowlist);
        assert_eq!(filtered.breaking_changes.len(), 1);
        assert!(filtered.breaking_changes[0].message.contains("bar"));
        assert!(!filtered.has_no_breaking_changes());
    }

    #[test]
    fn test_partition_detects_duplicates_and_gaps() {
        let mut outcome = RunOutcome {
            requested: module_set(&["A", "B", "C"]),
            ..Default::default()
        };
        outcome.skipped.insert("A".into(), SkipReason::NotInBaseline);
        outcome.failed.insert("B".into(), "boom".to_string());
        assert!(!outcome.is_partition(), "C is missing");

        outcome.results.push(ComparisonResult::new("C".into()));
        assert!(outcome.is_partition());

        outcome.failed.insert("C".into(), "boom".to_string());
        assert!(!outcome.is_partition(), "C appears twice");
    }

    #[test]
    fn test_sorted_results() {
        let outcome = RunOutcome {
            requested: module_set(&["A", "B"]),
            results: vec![
                ComparisonResult::new("B".into()),
                ComparisonResult::new("A".into()),
            ],
            ..Default::default()
        };
        let names: Vec<&str> = outcome
            .sorted_results()
            .iter()
            .map(|r| r.module.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
