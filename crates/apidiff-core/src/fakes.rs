//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `FakeVersionControl`, `FakeBuildSystem`, and `FakeApiDigester`
//! that satisfy the trait contracts without git, a compiler, or a digesting
//! tool. Each records how often it was called.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::build::{BuildPlan, BuildSystem};
use crate::digester::ApiDigester;
use crate::domain::comparison::ComparisonResult;
use crate::domain::diagnostic::{Diagnostic, Severity};
use crate::domain::error::{ApiDiffError, Result};
use crate::domain::module::ModuleName;
use crate::domain::package::{
    LibraryLinkage, Package, PackageGraph, Product, ProductKind, SourceLanguage, Target,
    TargetKind,
};
use crate::vcs::{Revision, SourceTree, VersionControl};

/// Package with one library product per name, each backed by one Swift
/// library target of the same name.
pub fn library_package(name: &str, libraries: &[&str]) -> PackageGraph {
    let products = libraries
        .iter()
        .map(|lib| Product {
            name: lib.to_string(),
            kind: ProductKind::Library(LibraryLinkage::Automatic),
            targets: vec![lib.to_string()],
        })
        .collect();
    let targets = libraries
        .iter()
        .map(|lib| Target {
            name: lib.to_string(),
            module: ModuleName::from_target_name(lib),
            kind: TargetKind::Library,
            language: SourceLanguage::Swift,
        })
        .collect();
    PackageGraph::new(vec![Package {
        name: name.to_string(),
        products,
        targets,
    }])
}

// ---------------------------------------------------------------------------
// FakeVersionControl
// ---------------------------------------------------------------------------

/// Version control with a fixed treeish -> revision table.
#[derive(Debug, Default)]
pub struct FakeVersionControl {
    revisions: HashMap<String, Revision>,
    materialize_calls: AtomicUsize,
}

impl FakeVersionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, treeish: &str, id: &str) -> Self {
        self.revisions.insert(treeish.to_string(), Revision::new(id));
        self
    }

    pub fn materialize_calls(&self) -> usize {
        self.materialize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionControl for FakeVersionControl {
    async fn resolve_revision(&self, treeish: &str) -> Result<Revision> {
        self.revisions
            .get(treeish)
            .cloned()
            .ok_or_else(|| ApiDiffError::RevisionNotFound {
                treeish: treeish.to_string(),
                reason: "unknown revision".to_string(),
            })
    }

    async fn materialize(&self, _revision: &Revision, dest: &Path) -> Result<SourceTree> {
        self.materialize_calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(dest).await?;
        Ok(SourceTree::new(dest))
    }
}

// ---------------------------------------------------------------------------
// FakeBuildSystem
// ---------------------------------------------------------------------------

/// Build system that describes fixed package graphs and builds nothing.
///
/// `package_graph` answers with the current graph for the current root and
/// with the baseline graph (the current one unless overridden) anywhere else.
#[derive(Debug)]
pub struct FakeBuildSystem {
    current_root: PathBuf,
    current: PackageGraph,
    baseline: Option<PackageGraph>,
    workers: usize,
    fail_baseline_build: bool,
    build_calls: AtomicUsize,
    built: Mutex<Vec<PathBuf>>,
}

impl FakeBuildSystem {
    pub fn new(current_root: impl Into<PathBuf>, current: PackageGraph) -> Self {
        Self {
            current_root: current_root.into(),
            current,
            baseline: None,
            workers: 4,
            fail_baseline_build: false,
            build_calls: AtomicUsize::new(0),
            built: Mutex::new(Vec::new()),
        }
    }

    pub fn with_baseline_graph(mut self, graph: PackageGraph) -> Self {
        self.baseline = Some(graph);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn failing_baseline_build(mut self) -> Self {
        self.fail_baseline_build = true;
        self
    }

    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    /// Roots passed to `build`, in call order.
    pub fn built_roots(&self) -> Vec<PathBuf> {
        self.built.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildSystem for FakeBuildSystem {
    async fn package_graph(&self, root: &Path) -> Result<PackageGraph> {
        if root == self.current_root {
            return Ok(self.current.clone());
        }
        Ok(self.baseline.clone().unwrap_or_else(|| self.current.clone()))
    }

    async fn build(&self, tree: &SourceTree) -> Result<BuildPlan> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        self.built.lock().unwrap().push(tree.root.clone());
        if self.fail_baseline_build && tree.root != self.current_root {
            return Err(ApiDiffError::Build(format!(
                "compilation failed in {}",
                tree.root.display()
            )));
        }
        Ok(BuildPlan {
            package_root: tree.root.clone(),
            module_dir: tree.root.join(".build"),
        })
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}

// ---------------------------------------------------------------------------
// FakeApiDigester
// ---------------------------------------------------------------------------

/// Scripted behaviour of one module's comparison.
#[derive(Debug, Clone)]
pub enum FakeComparison {
    Report {
        breaking: Vec<String>,
        other: Vec<Diagnostic>,
    },
    Fail(String),
    Panic,
}

/// Digester that writes placeholder digests and replays scripted comparisons.
///
/// Modules without a script compare clean.
#[derive(Debug, Default)]
pub struct FakeApiDigester {
    comparisons: HashMap<ModuleName, FakeComparison>,
    dump_failures: HashSet<ModuleName>,
    delay: Duration,
    dump_calls: AtomicUsize,
    compare_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    allowlists_seen: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeApiDigester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breaking_changes(mut self, module: &str, messages: &[&str]) -> Self {
        let entry = self.report_entry(module);
        if let FakeComparison::Report { breaking, .. } = entry {
            breaking.extend(messages.iter().map(|m| m.to_string()));
        }
        self
    }

    pub fn with_diagnostic(mut self, module: &str, diagnostic: Diagnostic) -> Self {
        let entry = self.report_entry(module);
        if let FakeComparison::Report { other, .. } = entry {
            other.push(diagnostic);
        }
        self
    }

    pub fn failing_compare(mut self, module: &str, reason: &str) -> Self {
        self.comparisons
            .insert(module.into(), FakeComparison::Fail(reason.to_string()));
        self
    }

    pub fn panicking_compare(mut self, module: &str) -> Self {
        self.comparisons.insert(module.into(), FakeComparison::Panic);
        self
    }

    pub fn failing_dump(mut self, module: &str) -> Self {
        self.dump_failures.insert(module.into());
        self
    }

    /// Hold every comparison for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn dump_calls(&self) -> usize {
        self.dump_calls.load(Ordering::SeqCst)
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    /// Highest number of comparisons observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Allowlist paths forwarded to `compare_api`, in call order.
    pub fn allowlists_seen(&self) -> Vec<Option<PathBuf>> {
        self.allowlists_seen.lock().unwrap().clone()
    }

    fn report_entry(&mut self, module: &str) -> &mut FakeComparison {
        let entry = self
            .comparisons
            .entry(module.into())
            .or_insert_with(|| FakeComparison::Report {
                breaking: Vec::new(),
                other: Vec::new(),
            });
        if !matches!(entry, FakeComparison::Report { .. }) {
            *entry = FakeComparison::Report {
                breaking: Vec::new(),
                other: Vec::new(),
            };
        }
        entry
    }
}

#[async_trait]
impl ApiDigester for FakeApiDigester {
    async fn dump_api(&self, module: &ModuleName, _plan: &BuildPlan, output: &Path) -> Result<()> {
        self.dump_calls.fetch_add(1, Ordering::SeqCst);
        if self.dump_failures.contains(module) {
            return Err(ApiDiffError::Tool {
                tool: "fake-digester".to_string(),
                module: module.to_string(),
                reason: "dump failed".to_string(),
            });
        }
        let digest = serde_json::json!({ "module": module.as_str() });
        tokio::fs::write(output, serde_json::to_vec(&digest)?).await?;
        Ok(())
    }

    async fn compare_api(
        &self,
        _baseline: &Path,
        module: &ModuleName,
        _plan: &BuildPlan,
        allowlist: Option<&Path>,
    ) -> Result<ComparisonResult> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.allowlists_seen
            .lock()
            .unwrap()
            .push(allowlist.map(Path::to_path_buf));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut result = ComparisonResult::new(module.clone());
        match self.comparisons.get(module) {
            None => {}
            Some(FakeComparison::Report { breaking, other }) => {
                result.breaking_changes = breaking
                    .iter()
                    .map(|m| Diagnostic::new(Severity::Error, m.clone()))
                    .collect();
                result.other_diagnostics = other.clone();
            }
            Some(FakeComparison::Fail(reason)) => {
                return Err(ApiDiffError::Tool {
                    tool: "fake-digester".to_string(),
                    module: module.to_string(),
                    reason: reason.clone(),
                });
            }
            Some(FakeComparison::Panic) => panic!("digester crashed on {module}"),
        }
        Ok(result)
    }
}
