//! Breakage gate: the pass/fail verdict of a comparison run.

use serde::{Deserialize, Serialize};

use crate::domain::comparison::RunOutcome;
use crate::obs;

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// API breakage gate rules.
pub struct BreakageGate;

impl BreakageGate {
    /// Evaluate a run outcome.
    ///
    /// Gate rule:
    /// - Every failed module is a violation
    /// - Every compared module with at least one breaking change (after
    ///   allowlist filtering) is a violation
    /// - Skipped modules never fail the gate
    pub fn evaluate(outcome: &RunOutcome) -> GateVerdict {
        let mut violations = Vec::new();

        for (module, error) in &outcome.failed {
            violations.push(format!("Module '{}' could not be compared: {}", module, error));
        }

        for result in outcome.sorted_results() {
            let count = result.breaking_changes.len();
            if count > 0 {
                violations.push(format!(
                    "Module '{}' has {} breaking change{}",
                    result.module,
                    count,
                    if count == 1 { "" } else { "s" }
                ));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "No API breakage detected".to_string()
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };
        obs::emit_gate_evaluated(passed, violations.len());

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comparison::{ComparisonResult, SkipReason};
    use crate::domain::diagnostic::{Diagnostic, Severity};
    use crate::domain::module::ModuleName;

    fn clean(module: &str) -> ComparisonResult {
        ComparisonResult::new(ModuleName::from(module))
    }

    fn breaking(module: &str, messages: &[&str]) -> ComparisonResult {
        let mut result = clean(module);
        result.breaking_changes = messages
            .iter()
            .map(|m| Diagnostic::new(Severity::Error, *m))
            .collect();
        result
    }

    #[test]
    fn test_clean_run_passes() {
        let outcome = RunOutcome {
            requested: ["Foo".into()].into_iter().collect(),
            results: vec![clean("Foo")],
            ..Default::default()
        };
        let verdict = BreakageGate::evaluate(&outcome);
        assert!(verdict.passed);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_skips_do_not_fail_gate() {
        let mut outcome = RunOutcome {
            requested: ["Foo".into(), "Bar".into()].into_iter().collect(),
            results: vec![clean("Foo")],
            ..Default::default()
        };
        outcome.skipped.insert("Bar".into(), SkipReason::NotInBaseline);
        assert!(BreakageGate::evaluate(&outcome).passed);
    }

    #[test]
    fn test_breaking_changes_fail_gate() {
        let outcome = RunOutcome {
            requested: ["Foo".into()].into_iter().collect(),
            results: vec![breaking("Foo", &["removed a", "removed b"])],
            ..Default::default()
        };
        let verdict = BreakageGate::evaluate(&outcome);
        assert!(!verdict.passed);
        assert_eq!(verdict.violations, vec!["Module 'Foo' has 2 breaking changes"]);
        assert!(verdict.message.contains("1 violation"));
    }

    #[test]
    fn test_failed_module_fails_gate() {
        let mut outcome = RunOutcome {
            requested: ["Foo".into()].into_iter().collect(),
            ..Default::default()
        };
        outcome.failed.insert("Foo".into(), "exit code 3".to_string());
        let verdict = BreakageGate::evaluate(&outcome);
        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("exit code 3"));
    }
}
