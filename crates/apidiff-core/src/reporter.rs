//! Human-readable breakage report.
//!
//! The reporter surfaces each compared module's remaining diagnostics through
//! the observability scope and renders one block of report lines per module.
//! Failed modules get no block; their error was emitted when they failed.

use std::io::Write;

use crate::domain::comparison::{ComparisonResult, RunOutcome, SkipReason};
use crate::domain::diagnostic::{Diagnostic, Severity};
use crate::domain::module::ModuleName;
use crate::obs::{ObservabilityScope, ObservedLevel};

/// Rendered report lines, modules in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakageReport {
    pub lines: Vec<String>,
}

impl BreakageReport {
    /// Write every line to `out`.
    pub fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl std::fmt::Display for BreakageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub struct Reporter<'a> {
    scope: &'a ObservabilityScope,
}

impl<'a> Reporter<'a> {
    pub fn new(scope: &'a ObservabilityScope) -> Self {
        Self { scope }
    }

    /// Emit diagnostics and render the report for `outcome`.
    pub fn report(&self, outcome: &RunOutcome) -> BreakageReport {
        let mut report = BreakageReport::default();

        for module in &outcome.requested {
            if let Some(reason) = outcome.skipped.get(module) {
                report.lines.push(skip_line(module, *reason));
            } else if let Some(result) = outcome.result(module) {
                for diagnostic in &result.other_diagnostics {
                    self.emit_diagnostic(diagnostic);
                }
                report.lines.extend(result_lines(result));
            }
        }
        report
    }

    fn emit_diagnostic(&self, diagnostic: &Diagnostic) {
        let level = match diagnostic.severity {
            Severity::Error | Severity::Fatal => ObservedLevel::Error,
            Severity::Warning => ObservedLevel::Warning,
            Severity::Note | Severity::Remark => ObservedLevel::Info,
            Severity::Ignored => return,
        };
        self.scope
            .emit(level, diagnostic.message.clone(), diagnostic.location.clone());
    }
}

fn skip_line(module: &ModuleName, reason: SkipReason) -> String {
    match reason {
        SkipReason::NotInBaseline => {
            format!("Skipping {module} because it does not exist in the baseline")
        }
        SkipReason::GenerationFailed => {
            format!("Skipping {module} because its baseline could not be generated")
        }
    }
}

fn result_lines(result: &ComparisonResult) -> Vec<String> {
    let count = result.breaking_changes.len();
    if count == 0 {
        return vec![format!("No breaking changes detected in {}", result.module)];
    }

    let noun = if count == 1 { "change" } else { "changes" };
    let mut lines = vec![format!(
        "{count} breaking {noun} detected in {}:",
        result.module
    )];
    lines.extend(
        result
            .breaking_changes
            .iter()
            .map(|change| format!("  💔 {}", change.message)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::SourceLocation;

    fn outcome() -> RunOutcome {
        let mut foo = ComparisonResult::new("Foo".into());
        foo.breaking_changes = vec![
            Diagnostic::new(Severity::Error, "func foo() has been removed"),
            Diagnostic::new(Severity::Error, "struct Bar has been renamed"),
        ];
        let mut one = ComparisonResult::new("One".into());
        one.breaking_changes = vec![Diagnostic::new(Severity::Error, "var x changed type")];
        let mut clean = ComparisonResult::new("Clean".into());
        clean.other_diagnostics = vec![
            Diagnostic::new(Severity::Warning, "deprecated")
                .with_location(SourceLocation::new("Clean.swift", Some(3))),
            Diagnostic::new(Severity::Remark, "fyi"),
            Diagnostic::new(Severity::Ignored, "noise"),
        ];

        let mut outcome = RunOutcome {
            requested: ["Foo", "One", "Clean", "New", "Broken", "Crashed"]
                .into_iter()
                .map(ModuleName::from)
                .collect(),
            results: vec![one, foo, clean],
            ..Default::default()
        };
        outcome.skipped.insert("New".into(), SkipReason::NotInBaseline);
        outcome.skipped.insert("Broken".into(), SkipReason::GenerationFailed);
        outcome.failed.insert("Crashed".into(), "boom".to_string());
        outcome
    }

    #[test]
    fn test_report_lines_in_module_order() {
        let scope = ObservabilityScope::new();
        let report = Reporter::new(&scope).report(&outcome());
        assert_eq!(
            report.lines,
            vec![
                "Skipping Broken because its baseline could not be generated",
                "No breaking changes detected in Clean",
                "2 breaking changes detected in Foo:",
                "  💔 func foo() has been removed",
                "  💔 struct Bar has been renamed",
                "Skipping New because it does not exist in the baseline",
                "1 breaking change detected in One:",
                "  💔 var x changed type",
            ]
        );
        assert!(!report.contains("Crashed"));
    }

    #[test]
    fn test_other_diagnostics_are_classified() {
        let scope = ObservabilityScope::new();
        Reporter::new(&scope).report(&outcome());

        let events = scope.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, ObservedLevel::Warning);
        assert_eq!(events[0].location.as_ref().unwrap().line, Some(3));
        assert_eq!(events[1].level, ObservedLevel::Info);
        assert!(!scope.errors_reported());
    }

    #[test]
    fn test_error_diagnostic_sets_error_flag() {
        let mut result = ComparisonResult::new("Foo".into());
        result.other_diagnostics = vec![Diagnostic::new(Severity::Fatal, "digest corrupt")];
        let outcome = RunOutcome {
            requested: ["Foo".into()].into_iter().collect(),
            results: vec![result],
            ..Default::default()
        };

        let scope = ObservabilityScope::new();
        Reporter::new(&scope).report(&outcome);
        assert!(scope.errors_reported());
    }

    #[test]
    fn test_write_to() {
        let report = BreakageReport {
            lines: vec!["a".to_string(), "b".to_string()],
        };
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
        assert_eq!(report.to_string(), "a\nb\n");
    }
}
