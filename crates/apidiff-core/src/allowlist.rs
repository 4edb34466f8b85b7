//! Breakage allowlist: exact messages to ignore when classifying breakage.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::error::{ApiDiffError, Result};

/// A set of exact breakage messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: HashSet<String>,
    source: Option<PathBuf>,
}

impl AllowList {
    /// Build an allowlist from in-memory entries.
    pub fn from_entries(entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            source: None,
        }
    }

    /// Load the allowlist at `path`, or an empty one when `path` is `None`.
    ///
    /// One entry per non-empty line, surrounding whitespace stripped. An
    /// unreadable file is fatal.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            ApiDiffError::AllowlistUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut allowlist = Self::parse(&content);
        allowlist.source = Some(path.to_path_buf());
        debug!(path = %path.display(), entries = allowlist.len(), "loaded breakage allowlist");
        Ok(allowlist)
    }

    /// Parse allowlist file content.
    pub fn parse(content: &str) -> Self {
        Self::from_entries(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        )
    }

    pub fn contains(&self, message: &str) -> bool {
        self.entries.contains(message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File the allowlist was loaded from, forwarded to the digester.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
