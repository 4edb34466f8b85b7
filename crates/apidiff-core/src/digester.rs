//! API digester collaborator: dumps interface digests and compares them.
//!
//! The production adapter, [`CommandApiDigester`], drives an external tool
//! with two subcommands:
//!
//! ```text
//! <digester> dump    --module <m> --module-dir <dir> --output <path>
//! <digester> compare --module <m> --module-dir <dir> --baseline <path>
//!                    [--breakage-allowlist <path>]
//! ```
//!
//! `compare` prints a JSON report on stdout:
//!
//! ```json
//! {"module": "Foo",
//!  "diagnostics": [{"severity": "error", "message": "...",
//!                   "category": "api-breakage",
//!                   "location": {"file": "Foo.swift", "line": 12}}]}
//! ```

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::build::BuildPlan;
use crate::domain::comparison::ComparisonResult;
use crate::domain::diagnostic::{Diagnostic, Severity, SourceLocation};
use crate::domain::error::{ApiDiffError, Result};
use crate::domain::module::ModuleName;
use crate::domain::package::SourceLanguage;
use crate::process::{ProcessError, ToolCommand};

/// Interface digesting tool.
#[async_trait]
pub trait ApiDigester: Send + Sync {
    /// Language whose modules this tool can digest.
    fn diffable_language(&self) -> SourceLanguage {
        SourceLanguage::Swift
    }

    /// Dump `module`'s public interface into `output`.
    async fn dump_api(&self, module: &ModuleName, plan: &BuildPlan, output: &Path) -> Result<()>;

    /// Compare `module` as built by `plan` against the digest at `baseline`.
    ///
    /// The breaking changes of the returned result are not yet allowlist
    /// filtered; `allowlist` is forwarded so the tool may suppress entries
    /// itself.
    async fn compare_api(
        &self,
        baseline: &Path,
        module: &ModuleName,
        plan: &BuildPlan,
        allowlist: Option<&Path>,
    ) -> Result<ComparisonResult>;
}

/// Digester driven as an external command.
#[derive(Debug, Clone)]
pub struct CommandApiDigester {
    program: String,
    timeout: Option<Duration>,
}

impl CommandApiDigester {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn tool_error(&self, module: &ModuleName, err: ProcessError) -> ApiDiffError {
        match err {
            ProcessError::TimedOut { limit, .. } => ApiDiffError::ToolTimeout {
                tool: self.program.clone(),
                module: module.to_string(),
                limit,
            },
            other => ApiDiffError::Tool {
                tool: self.program.clone(),
                module: module.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl ApiDigester for CommandApiDigester {
    async fn dump_api(&self, module: &ModuleName, plan: &BuildPlan, output: &Path) -> Result<()> {
        let cmd = ToolCommand::new(
            self.program.as_str(),
            [
                "dump".to_string(),
                "--module".to_string(),
                module.to_string(),
                "--module-dir".to_string(),
                plan.module_dir.to_string_lossy().to_string(),
                "--output".to_string(),
                output.to_string_lossy().to_string(),
            ],
        )
        .current_dir(&plan.package_root)
        .timeout(self.timeout);

        let result = cmd.run().await.map_err(|e| self.tool_error(module, e))?;
        if !result.success {
            return Err(ApiDiffError::Tool {
                tool: self.program.clone(),
                module: module.to_string(),
                reason: result.failure_summary(),
            });
        }
        Ok(())
    }

    async fn compare_api(
        &self,
        baseline: &Path,
        module: &ModuleName,
        plan: &BuildPlan,
        allowlist: Option<&Path>,
    ) -> Result<ComparisonResult> {
        let mut args = vec![
            "compare".to_string(),
            "--module".to_string(),
            module.to_string(),
            "--module-dir".to_string(),
            plan.module_dir.to_string_lossy().to_string(),
            "--baseline".to_string(),
            baseline.to_string_lossy().to_string(),
        ];
        if let Some(path) = allowlist {
            args.push("--breakage-allowlist".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        let cmd = ToolCommand::new(self.program.as_str(), args)
            .current_dir(&plan.package_root)
            .timeout(self.timeout);
        let result = cmd.run().await.map_err(|e| self.tool_error(module, e))?;

        // Tools may exit non-zero when they found breakage, so the report on
        // stdout decides.
        parse_comparison_report(module, &result.stdout).map_err(|reason| ApiDiffError::Tool {
            tool: self.program.clone(),
            module: module.to_string(),
            reason: if result.success {
                reason
            } else {
                format!("{reason} ({})", result.failure_summary())
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Comparison report schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ComparisonReport {
    #[serde(default)]
    diagnostics: Vec<ReportedDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct ReportedDiagnostic {
    severity: Severity,
    message: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    location: Option<ReportedLocation>,
}

#[derive(Debug, Deserialize)]
struct ReportedLocation {
    file: String,
    #[serde(default)]
    line: Option<i64>,
}

const BREAKAGE_CATEGORY: &str = "api-breakage";

/// Parse a `compare` report into a result for `module`.
///
/// The result is attributed to `module` whatever the report claims.
pub fn parse_comparison_report(
    module: &ModuleName,
    stdout: &str,
) -> std::result::Result<ComparisonResult, String> {
    let report: ComparisonReport = serde_json::from_str(stdout.trim())
        .map_err(|e| format!("unreadable comparison output: {e}"))?;

    let mut result = ComparisonResult::new(module.clone());
    for reported in report.diagnostics {
        let breaking = reported.category.as_deref() == Some(BREAKAGE_CATEGORY);
        let mut diagnostic = Diagnostic::new(reported.severity, reported.message);
        if let Some(loc) = reported.location {
            diagnostic = diagnostic.with_location(SourceLocation::from_raw_line(loc.file, loc.line));
        }
        if breaking {
            result.breaking_changes.push(diagnostic);
        } else {
            result.other_diagnostics.push(diagnostic);
        }
    }
    Ok(result)
}
