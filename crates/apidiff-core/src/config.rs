//! Resolved run configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BUILD_TOOL: &str = "swift";
pub const DEFAULT_DIGESTER: &str = "api-digester";

/// What to compare, for one `diagnose-api-breaking-changes` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Baseline revision expression (commit, branch, tag, ...).
    pub treeish: String,
    pub products: Vec<String>,
    pub targets: Vec<String>,
    /// Persistent digest directory; a temporary one when `None`.
    pub baseline_dir: Option<PathBuf>,
    pub allowlist_path: Option<PathBuf>,
    pub regenerate_baseline: bool,
}

impl DiffOptions {
    pub fn new(treeish: impl Into<String>) -> Self {
        Self {
            treeish: treeish.into(),
            ..Default::default()
        }
    }

    pub fn with_products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = products.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_baseline_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.baseline_dir = Some(dir.into());
        self
    }

    pub fn with_allowlist(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowlist_path = Some(path.into());
        self
    }

    pub fn regenerate(mut self, regenerate: bool) -> Self {
        self.regenerate_baseline = regenerate;
        self
    }
}

/// Tools and resources available to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Root of the package under test.
    pub package_path: PathBuf,
    /// Build tool executable.
    pub build_tool: String,
    /// API digester executable.
    pub digester: String,
    /// Parallel workers for builds, dumps and comparisons.
    pub jobs: usize,
    /// Per-comparison time limit.
    pub comparison_timeout: Option<Duration>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            package_path: PathBuf::from("."),
            build_tool: DEFAULT_BUILD_TOOL.to_string(),
            digester: DEFAULT_DIGESTER.to_string(),
            jobs: default_jobs(),
            comparison_timeout: None,
        }
    }
}

/// Available parallelism, or 1 when it cannot be determined.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
