//! Bounded-parallel comparison of modules against their baseline digests.
//!
//! At most `W` comparisons run at once. The driver acquires an admission
//! permit before spawning each comparison and the permit travels with the
//! task, so a finished module frees its slot for the next pending one.
//! Per-module errors are captured at the task boundary; the scheduler itself
//! never fails.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::{debug, instrument, Instrument, Span};

use crate::allowlist::AllowList;
use crate::build::BuildPlan;
use crate::digester::ApiDigester;
use crate::domain::comparison::{ComparisonResult, RunOutcome, SkipReason};
use crate::domain::module::{ModuleName, ModuleSet};
use crate::obs::{self, ObservabilityScope};

/// Append-only store shared between comparison tasks.
#[derive(Debug)]
pub struct ResultStore<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for ResultStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResultStore<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> ResultStore<T> {
    pub async fn append(&self, item: T) {
        self.inner.lock().await.push(item);
    }

    /// Take every element appended so far.
    pub async fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.inner.lock().await)
    }
}

/// Runs comparisons under an admission gate of fixed width.
pub struct ComparisonScheduler {
    digester: Arc<dyn ApiDigester>,
    scope: Arc<ObservabilityScope>,
    width: usize,
}

impl ComparisonScheduler {
    /// `width` is clamped to at least 1.
    pub fn new(digester: Arc<dyn ApiDigester>, scope: Arc<ObservabilityScope>, width: usize) -> Self {
        Self {
            digester,
            scope,
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Compare every module of `modules` that has a digest in `baseline_dir`.
    ///
    /// Modules without a digest are skipped; `generation_failures` tells a
    /// failed dump apart from a module the baseline never had. Returns once
    /// every admitted comparison has finished.
    #[instrument(skip_all, fields(modules = modules.len(), width = self.width))]
    pub async fn run(
        &self,
        modules: &ModuleSet,
        baseline_dir: &Path,
        plan: &BuildPlan,
        allowlist: Arc<AllowList>,
        generation_failures: &ModuleSet,
    ) -> RunOutcome {
        let mut outcome = RunOutcome {
            requested: modules.clone(),
            ..Default::default()
        };

        let gate = Arc::new(Semaphore::new(self.width));
        let results: ResultStore<ComparisonResult> = ResultStore::default();
        let failures: ResultStore<(ModuleName, String)> = ResultStore::default();
        let plan = Arc::new(plan.clone());
        let mut tasks = JoinSet::new();
        let mut owners: HashMap<task::Id, ModuleName> = HashMap::new();

        for module in modules {
            let baseline = module.digest_path(baseline_dir);
            if !tokio::fs::try_exists(&baseline).await.unwrap_or(false) {
                let reason = if generation_failures.contains(module) {
                    SkipReason::GenerationFailed
                } else {
                    SkipReason::NotInBaseline
                };
                debug!(module = %module, ?reason, "no baseline digest");
                outcome.skipped.insert(module.clone(), reason);
                continue;
            }

            // The gate is never closed, so acquisition only fails if that changes.
            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                outcome
                    .failed
                    .insert(module.clone(), "admission gate closed".to_string());
                continue;
            };
            let owner = module.clone();
            let module = module.clone();
            let digester = Arc::clone(&self.digester);
            let scope = Arc::clone(&self.scope);
            let plan = Arc::clone(&plan);
            let allowlist = Arc::clone(&allowlist);
            let results = results.clone();
            let failures = failures.clone();

            let handle = tasks.spawn(async move {
                let _permit = permit;
                let start = Instant::now();
                let compared = digester
                    .compare_api(&baseline, &module, &plan, allowlist.source())
                    .await;

                match compared {
                    Ok(result) => {
                        let mut result = result.filter_allowed(&allowlist);
                        result.module = module;
                        obs::emit_module_compared(
                            result.module.as_str(),
                            result.breaking_changes.len(),
                            start.elapsed().as_millis() as u64,
                        );
                        results.append(result).await;
                    }
                    Err(e) => {
                        scope.emit_error(format!(
                            "failed to compare API to baseline for {module}: {e}"
                        ));
                        failures.append((module, e.to_string())).await;
                    }
                }
            }
            .instrument(Span::current()));
            owners.insert(handle.id(), owner);
        }

        // A task that panicked reported nothing itself; its own join error
        // is the cause.
        let mut aborted = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = joined {
                let Some(module) = owners.remove(&e.id()) else {
                    continue;
                };
                let reason = e.to_string();
                self.scope.emit_error(format!(
                    "failed to compare API to baseline for {module}: {reason}"
                ));
                aborted.insert(module, reason);
            }
        }

        outcome.results = results.drain().await;
        let failed: BTreeMap<ModuleName, String> = failures.drain().await.into_iter().collect();
        outcome.failed.extend(failed);
        outcome.failed.extend(aborted);

        outcome
    }
}
