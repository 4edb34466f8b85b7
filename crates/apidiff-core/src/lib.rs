//! apidiff Core Library
//!
//! Detects breaking changes to the public API of a package's library modules
//! by comparing them against interface digests taken at a baseline revision.

pub mod allowlist;
pub mod baseline;
pub mod build;
pub mod config;
pub mod digester;
pub mod domain;
pub mod engine;
pub mod fakes;
pub mod gate;
pub mod obs;
pub mod process;
pub mod reporter;
pub mod reporting;
pub mod scheduler;
pub mod selector;
pub mod telemetry;
pub mod vcs;

pub use domain::{
    ApiDiffError, ComparisonResult, Diagnostic, LibraryLinkage, ModuleName, ModuleSet, Package,
    PackageGraph, Product, ProductKind, Result, RunOutcome, Severity, SkipReason, SourceLanguage,
    SourceLocation, Target, TargetKind,
};

pub use allowlist::AllowList;
pub use baseline::{BaselineDir, BaselineMaterializer, MaterializedBaseline};
pub use build::{BuildPlan, BuildSystem, SwiftPackageBuildSystem};
pub use config::{DiffOptions, ToolConfig, DEFAULT_BUILD_TOOL, DEFAULT_DIGESTER};
pub use digester::{ApiDigester, CommandApiDigester};
pub use engine::{ApiDiffEngine, EngineReport};
pub use gate::{BreakageGate, GateVerdict};
pub use obs::{ObservabilityScope, ObservedEvent, ObservedLevel};
pub use reporter::{BreakageReport, Reporter};
pub use reporting::{write_report_json, BreakageReportArtifact, ModuleStatus};
pub use scheduler::{ComparisonScheduler, ResultStore};
pub use selector::ModuleSelector;
pub use vcs::{GitRepository, Revision, SourceTree, VersionControl};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
