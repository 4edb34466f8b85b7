//! The run driver.
//!
//! Resolves the baseline revision, selects modules, loads the allowlist,
//! builds the current tree, materializes baseline digests, compares, then
//! reports. Any fatal error aborts before a report exists.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::allowlist::AllowList;
use crate::baseline::{BaselineMaterializer, MaterializedBaseline};
use crate::build::{BuildSystem, SwiftPackageBuildSystem};
use crate::config::{DiffOptions, ToolConfig};
use crate::digester::{ApiDigester, CommandApiDigester};
use crate::domain::comparison::RunOutcome;
use crate::domain::error::Result;
use crate::gate::{BreakageGate, GateVerdict};
use crate::obs::{self, ObservabilityScope};
use crate::reporter::{BreakageReport, Reporter};
use crate::reporting::BreakageReportArtifact;
use crate::scheduler::ComparisonScheduler;
use crate::selector::ModuleSelector;
use crate::vcs::{GitRepository, Revision, SourceTree, VersionControl};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct EngineReport {
    pub treeish: String,
    pub revision: Revision,
    pub outcome: RunOutcome,
    pub report: BreakageReport,
    pub verdict: GateVerdict,
    /// Kept so a temporary baseline directory lives as long as the report.
    pub baseline: MaterializedBaseline,
}

impl EngineReport {
    pub fn artifact(&self) -> BreakageReportArtifact {
        BreakageReportArtifact::new(&self.treeish, &self.revision, &self.outcome, &self.verdict)
    }
}

pub struct ApiDiffEngine {
    package_root: PathBuf,
    vcs: Arc<dyn VersionControl>,
    build: Arc<dyn BuildSystem>,
    digester: Arc<dyn ApiDigester>,
    scope: Arc<ObservabilityScope>,
}

impl ApiDiffEngine {
    pub fn new(
        package_root: impl Into<PathBuf>,
        vcs: Arc<dyn VersionControl>,
        build: Arc<dyn BuildSystem>,
        digester: Arc<dyn ApiDigester>,
        scope: Arc<ObservabilityScope>,
    ) -> Self {
        Self {
            package_root: package_root.into(),
            vcs,
            build,
            digester,
            scope,
        }
    }

    /// Engine wired to git, the configured build tool and digester.
    pub fn from_config(config: &ToolConfig, scope: Arc<ObservabilityScope>) -> Self {
        Self::new(
            config.package_path.clone(),
            Arc::new(GitRepository::new(config.package_path.clone())),
            Arc::new(SwiftPackageBuildSystem::new(
                config.build_tool.clone(),
                config.jobs,
            )),
            Arc::new(
                CommandApiDigester::new(config.digester.clone())
                    .with_timeout(config.comparison_timeout),
            ),
            scope,
        )
    }

    pub fn scope(&self) -> &ObservabilityScope {
        &self.scope
    }

    pub async fn run(&self, options: &DiffOptions) -> Result<EngineReport> {
        self.drive(options)
            .instrument(obs::run_span(&options.treeish))
            .await
    }

    async fn drive(&self, options: &DiffOptions) -> Result<EngineReport> {
        let revision = self.vcs.resolve_revision(&options.treeish).await?;

        let graph = self.build.package_graph(&self.package_root).await?;
        let modules = ModuleSelector::new(&graph, self.digester.diffable_language(), &self.scope)
            .select(&options.products, &options.targets)?;
        obs::emit_run_started(&options.treeish, revision.as_str(), modules.len());

        let allowlist = Arc::new(AllowList::load(options.allowlist_path.as_deref()).await?);

        let plan = self
            .build
            .build(&SourceTree::new(self.package_root.clone()))
            .await?;

        let baseline = BaselineMaterializer::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.build),
            Arc::clone(&self.digester),
            Arc::clone(&self.scope),
        )
        .materialize(
            &modules,
            &revision,
            options.baseline_dir.as_deref(),
            options.regenerate_baseline,
        )
        .await?;
        obs::emit_baseline_materialized(
            &baseline.dir.path().display().to_string(),
            baseline.dumped.len(),
            baseline.generation_failures.len(),
        );

        let outcome = ComparisonScheduler::new(
            Arc::clone(&self.digester),
            Arc::clone(&self.scope),
            self.build.worker_count(),
        )
        .run(
            &modules,
            baseline.dir.path(),
            &plan,
            allowlist,
            &baseline.generation_failures,
        )
        .await;

        let report = Reporter::new(&self.scope).report(&outcome);
        let verdict = BreakageGate::evaluate(&outcome);

        Ok(EngineReport {
            treeish: options.treeish.clone(),
            revision,
            outcome,
            report,
            verdict,
            baseline,
        })
    }
}
