use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::comparison::{RunOutcome, SkipReason};
use crate::gate::GateVerdict;
use crate::vcs::Revision;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Final state of one requested module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Clean,
    Breaking,
    Skipped,
    Failed,
}

/// Per-module entry of the report artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleReportArtifact {
    pub module: String,
    pub status: ModuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub breaking_changes: Vec<String>,
}

/// Machine-readable summary of a run, written with `--report-json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakageReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub baseline_treeish: String,
    pub baseline_revision: String,
    pub modules: Vec<ModuleReportArtifact>,
    pub verdict: GateVerdict,
}

impl BreakageReportArtifact {
    pub fn new(
        treeish: &str,
        revision: &Revision,
        outcome: &RunOutcome,
        verdict: &GateVerdict,
    ) -> Self {
        let modules = outcome
            .requested
            .iter()
            .map(|module| {
                let mut entry = ModuleReportArtifact {
                    module: module.to_string(),
                    status: ModuleStatus::Failed,
                    skip_reason: None,
                    error: None,
                    breaking_changes: Vec::new(),
                };
                if let Some(reason) = outcome.skipped.get(module) {
                    entry.status = ModuleStatus::Skipped;
                    entry.skip_reason = Some(*reason);
                } else if let Some(error) = outcome.failed.get(module) {
                    entry.error = Some(error.clone());
                } else if let Some(result) = outcome.result(module) {
                    entry.status = if result.has_no_breaking_changes() {
                        ModuleStatus::Clean
                    } else {
                        ModuleStatus::Breaking
                    };
                    entry.breaking_changes = result
                        .breaking_changes
                        .iter()
                        .map(|d| d.message.clone())
                        .collect();
                }
                entry
            })
            .collect();

        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            baseline_treeish: treeish.to_string(),
            baseline_revision: revision.to_string(),
            modules,
            verdict: verdict.clone(),
        }
    }
}

/// Write the report artifact in pretty JSON format.
pub fn write_report_json(path: &Path, artifact: &BreakageReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize breakage report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
