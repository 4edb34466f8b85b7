//! Baseline materialization: one interface digest per module at the
//! baseline revision.
//!
//! Digests live at `<baseline-dir>/<module>.json`. They are reused across runs
//! unless regeneration is forced or the file is missing. When nothing needs
//! generating the baseline revision is neither checked out nor built.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, Instrument, Span};

use crate::build::BuildSystem;
use crate::digester::ApiDigester;
use crate::domain::error::{ApiDiffError, Result};
use crate::domain::module::{ModuleName, ModuleSet};
use crate::obs::ObservabilityScope;
use crate::vcs::{Revision, VersionControl};

/// Directory holding the baseline digests of one invocation.
#[derive(Debug)]
pub enum BaselineDir {
    /// User-supplied; persists across runs.
    Override(PathBuf),
    /// Process-scoped; deleted on drop.
    Temporary(TempDir),
}

impl BaselineDir {
    pub fn path(&self) -> &Path {
        match self {
            BaselineDir::Override(path) => path,
            BaselineDir::Temporary(dir) => dir.path(),
        }
    }

    /// Open `override_dir` (creating it), or a fresh temporary directory
    /// named after `revision`.
    pub async fn open(override_dir: Option<&Path>, revision: &Revision) -> Result<Self> {
        match override_dir {
            Some(path) => {
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|e| ApiDiffError::BaselineDir {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                Ok(BaselineDir::Override(path.to_path_buf()))
            }
            None => {
                let prefix = format!("apidiff-baseline-{}-", revision.short());
                let dir = tempfile::Builder::new()
                    .prefix(&prefix)
                    .tempdir()
                    .map_err(|e| ApiDiffError::BaselineDir {
                        path: std::env::temp_dir(),
                        reason: e.to_string(),
                    })?;
                Ok(BaselineDir::Temporary(dir))
            }
        }
    }
}

/// Outcome of [`BaselineMaterializer::materialize`].
#[derive(Debug)]
pub struct MaterializedBaseline {
    pub dir: BaselineDir,

    /// Modules whose digest was (re)generated by this call.
    pub dumped: ModuleSet,

    /// Modules the baseline defines but whose digest could not be generated.
    pub generation_failures: ModuleSet,

    /// Modules the baseline package does not define.
    pub not_in_baseline: ModuleSet,
}

/// Ensures a baseline digest exists for every selected module.
pub struct BaselineMaterializer {
    vcs: Arc<dyn VersionControl>,
    build: Arc<dyn BuildSystem>,
    digester: Arc<dyn ApiDigester>,
    scope: Arc<ObservabilityScope>,
}

impl BaselineMaterializer {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        build: Arc<dyn BuildSystem>,
        digester: Arc<dyn ApiDigester>,
        scope: Arc<ObservabilityScope>,
    ) -> Self {
        Self {
            vcs,
            build,
            digester,
            scope,
        }
    }

    /// Materialize baseline digests for `modules` at `revision`.
    ///
    /// Checkout and build failures are fatal. A failed dump only excludes
    /// that module from comparison.
    pub async fn materialize(
        &self,
        modules: &ModuleSet,
        revision: &Revision,
        override_dir: Option<&Path>,
        force: bool,
    ) -> Result<MaterializedBaseline> {
        let dir = BaselineDir::open(override_dir, revision).await?;

        let mut needed = ModuleSet::new();
        for module in modules {
            if force || !digest_exists(&module.digest_path(dir.path())).await {
                needed.insert(module.clone());
            }
        }

        let mut materialized = MaterializedBaseline {
            dir,
            dumped: ModuleSet::new(),
            generation_failures: ModuleSet::new(),
            not_in_baseline: ModuleSet::new(),
        };

        if needed.is_empty() {
            debug!(dir = %materialized.dir.path().display(), "all baseline digests present");
            return Ok(materialized);
        }

        let checkout = tempfile::Builder::new()
            .prefix("apidiff-checkout-")
            .tempdir()?;
        let tree = self
            .vcs
            .materialize(revision, &checkout.path().join("baseline"))
            .await?;
        let plan = self.build.build(&tree).await?;
        let baseline_graph = self.build.package_graph(&tree.root).await?;

        let language = self.digester.diffable_language();
        let defined: ModuleSet = baseline_graph
            .root_packages
            .iter()
            .flat_map(|pkg| pkg.targets.iter())
            .filter(|t| t.is_diffable(language))
            .map(|t| t.module.clone())
            .collect();

        let gate = Arc::new(Semaphore::new(self.build.worker_count().max(1)));
        let plan = Arc::new(plan);
        let mut tasks = JoinSet::new();
        let mut scheduled = ModuleSet::new();

        for module in needed {
            let output = module.digest_path(materialized.dir.path());
            if !defined.contains(&module) {
                remove_stale(&output).await;
                materialized.not_in_baseline.insert(module);
                continue;
            }

            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                break;
            };
            scheduled.insert(module.clone());
            let digester = Arc::clone(&self.digester);
            let plan = Arc::clone(&plan);
            tasks.spawn(async move {
                let _permit = permit;
                let result = digester.dump_api(&module, &plan, &output).await;
                if result.is_err() {
                    remove_stale(&output).await;
                }
                (module, result)
            }
            .instrument(Span::current()));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((module, Ok(()))) => {
                    materialized.dumped.insert(module);
                }
                Ok((module, Err(e))) => {
                    self.scope
                        .emit_warning(format!("failed to generate API baseline for {module}: {e}"));
                    materialized.generation_failures.insert(module);
                }
                Err(e) => {
                    self.scope
                        .emit_warning(format!("baseline generation task failed: {e}"));
                }
            }
        }

        // Tasks that died without reporting back.
        let unaccounted: Vec<ModuleName> = scheduled
            .into_iter()
            .filter(|m| {
                !materialized.dumped.contains(m) && !materialized.generation_failures.contains(m)
            })
            .collect();
        for module in unaccounted {
            remove_stale(&module.digest_path(materialized.dir.path())).await;
            materialized.generation_failures.insert(module);
        }

        info!(
            revision = %revision.short(),
            dumped = materialized.dumped.len(),
            failed = materialized.generation_failures.len(),
            absent = materialized.not_in_baseline.len(),
            "baseline digests generated"
        );
        Ok(materialized)
    }
}

async fn digest_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn remove_stale(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "could not remove stale digest");
        }
    }
}
