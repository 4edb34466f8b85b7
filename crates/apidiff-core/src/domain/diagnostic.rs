//! Diagnostics produced by the API digester.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Fatal,
    Warning,
    Note,
    Remark,
    Ignored,
}

/// Source location of a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,

    /// Line number (1-indexed). `None` when the tool could not represent it.
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Build a location from a raw line value, dropping sentinels.
    ///
    /// Tools report "unknown" as 0, a negative number, or a saturated maximum.
    pub fn from_raw_line(file: impl Into<PathBuf>, line: Option<i64>) -> Self {
        let line = line
            .filter(|l| *l > 0)
            .and_then(|l| u32::try_from(l).ok())
            .filter(|l| *l != u32::MAX);
        Self::new(file, line)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Human-readable message. For breaking changes this is the exact text
    /// matched against the allowlist.
    pub message: String,

    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Set file location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}
