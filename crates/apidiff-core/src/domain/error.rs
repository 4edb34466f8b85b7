//! Error taxonomy for the API diff engine.

use std::path::PathBuf;
use std::time::Duration;

/// apidiff domain errors.
///
/// Fatal errors unwind the whole run. Per-module tool failures are captured
/// by the scheduler and never escape it.
#[derive(Debug, thiserror::Error)]
pub enum ApiDiffError {
    #[error("invalid module selection: {}", rejected.join(", "))]
    InvalidSelection { rejected: Vec<String> },

    #[error("no modules selected for API comparison")]
    NoModulesSelected,

    #[error("could not resolve revision '{treeish}': {reason}")]
    RevisionNotFound { treeish: String, reason: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("build failed: {0}")]
    Build(String),

    #[error("{tool} failed for module {module}: {reason}")]
    Tool {
        tool: String,
        module: String,
        reason: String,
    },

    #[error("{tool} timed out after {limit:?} for module {module}")]
    ToolTimeout {
        tool: String,
        module: String,
        limit: Duration,
    },

    #[error("failed to read breakage allowlist {path:?}: {source}")]
    AllowlistUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("baseline directory {path:?} is unusable: {reason}")]
    BaselineDir { path: PathBuf, reason: String },

    #[error("invalid package description: {0}")]
    PackageDescription(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for apidiff operations.
pub type Result<T> = std::result::Result<T, ApiDiffError>;
