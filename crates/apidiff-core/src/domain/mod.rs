//! Domain models for apidiff.
//!
//! Canonical definitions for the core entities:
//! - `ModuleName` / `ModuleSet`: what gets compared
//! - `PackageGraph`: root packages, products and targets
//! - `Diagnostic`: digester output
//! - `ComparisonResult` / `RunOutcome`: what a run produced

pub mod comparison;
pub mod diagnostic;
pub mod error;
pub mod module;
pub mod package;

pub use comparison::{ComparisonResult, RunOutcome, SkipReason};
pub use diagnostic::{Diagnostic, Severity, SourceLocation};
pub use error::{ApiDiffError, Result};
pub use module::{ModuleName, ModuleSet};
pub use package::{
    LibraryLinkage, Package, PackageGraph, Product, ProductKind, SourceLanguage, Target,
    TargetKind,
};
