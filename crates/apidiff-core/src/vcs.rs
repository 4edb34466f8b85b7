//! Version control: resolving baseline revisions and checking them out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::error::{ApiDiffError, Result};
use crate::process::ToolCommand;

/// A fully-resolved commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 chars).
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source tree on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Version-control collaborator.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Resolve a treeish (commit, branch, tag, ...) to a commit.
    async fn resolve_revision(&self, treeish: &str) -> Result<Revision>;

    /// Check out `revision` into `dest`, isolated from the working tree.
    async fn materialize(&self, revision: &Revision, dest: &Path) -> Result<SourceTree>;
}

/// Git repository driven through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let output = ToolCommand::new("git", args.iter().copied())
            .current_dir(cwd)
            .run()
            .await
            .map_err(|e| ApiDiffError::Git(format!("failed to run git: {e}")))?;

        if !output.success {
            return Err(ApiDiffError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl VersionControl for GitRepository {
    async fn resolve_revision(&self, treeish: &str) -> Result<Revision> {
        let revspec = format!("{treeish}^{{commit}}");
        let sha = self
            .git(&self.root, &["rev-parse", "--verify", "--quiet", &revspec])
            .await
            .map_err(|e| ApiDiffError::RevisionNotFound {
                treeish: treeish.to_string(),
                reason: e.to_string(),
            })?;

        if sha.is_empty() {
            return Err(ApiDiffError::RevisionNotFound {
                treeish: treeish.to_string(),
                reason: "git rev-parse returned empty output".to_string(),
            });
        }
        debug!(treeish = %treeish, revision = %sha, "resolved baseline revision");
        Ok(Revision::new(sha))
    }

    async fn materialize(&self, revision: &Revision, dest: &Path) -> Result<SourceTree> {
        let source = self.root.to_string_lossy().to_string();
        let target = dest.to_string_lossy().to_string();
        info!(revision = %revision.short(), dest = %target, "checking out baseline");

        self.git(
            &self.root,
            &["clone", "--quiet", "--shared", "--no-checkout", &source, &target],
        )
        .await?;
        self.git(dest, &["checkout", "--quiet", "--detach", revision.as_str()])
            .await?;

        Ok(SourceTree::new(dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", "--quiet"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(dir.path().join("a.txt"), "v1").unwrap();
        run_git(dir.path(), &["add", "a.txt"]);
        run_git(dir.path(), &["commit", "--quiet", "-m", "v1"]);
        run_git(dir.path(), &["tag", "v1"]);
        std::fs::write(dir.path().join("a.txt"), "v2").unwrap();
        run_git(dir.path(), &["commit", "--quiet", "-am", "v2"]);
        dir
    }

    #[tokio::test]
    async fn resolve_tag_returns_40_hex_chars() {
        let repo = make_git_repo();
        let git = GitRepository::new(repo.path());
        let rev = git.resolve_revision("v1").await.unwrap();
        assert_eq!(rev.as_str().len(), 40, "got: {rev}");
        assert!(rev.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rev.as_str(), run_git(repo.path(), &["rev-parse", "v1^{commit}"]));
    }

    #[tokio::test]
    async fn resolve_unknown_treeish_fails() {
        let repo = make_git_repo();
        let git = GitRepository::new(repo.path());
        let err = git.resolve_revision("does-not-exist").await.unwrap_err();
        assert!(matches!(err, ApiDiffError::RevisionNotFound { .. }));
    }

    #[tokio::test]
    async fn materialize_checks_out_old_content_without_touching_worktree() {
        let repo = make_git_repo();
        let git = GitRepository::new(repo.path());
        let rev = git.resolve_revision("v1").await.unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let dest = scratch.path().join("baseline");
        let tree = git.materialize(&rev, &dest).await.unwrap();

        assert_eq!(std::fs::read_to_string(tree.root.join("a.txt")).unwrap(), "v1");
        assert_eq!(std::fs::read_to_string(repo.path().join("a.txt")).unwrap(), "v2");
    }

    #[test]
    fn revision_short() {
        let rev = Revision::new("0123456789abcdef0123");
        assert_eq!(rev.short(), "0123456789ab");
        assert_eq!(Revision::new("abc").short(), "abc");
        assert_eq!(Revision::new("révision-über-alles").short(), "révision-übe");
    }
}
