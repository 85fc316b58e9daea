//! Per-issue git worktrees.
//!
//! Taking an issue can give the agent an isolated working copy on a dedicated
//! branch. The issue service only sees the [`WorktreeManager`] trait;
//! [`GitWorktreeManager`] implements it by running `git` as a subprocess.
//!
//! Worktrees live next to the repository:
//!
//! ```text
//! <repo>/../ghost-worktrees/<issue-id>
//! ```
//!
//! and are checked out on `ghost/<kebab-title>-<short-id>`.

use crate::domain::{Issue, IssueId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Directory (sibling of the repository) holding all issue worktrees
pub const WORKTREES_DIR_NAME: &str = "ghost-worktrees";

/// Prefix of every issue branch
pub const BRANCH_PREFIX: &str = "ghost/";

const MAX_BRANCH_TITLE_LENGTH: usize = 50;
const SHORT_ID_LENGTH: usize = 8;

/// A worktree checked out for an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    /// Worktree directory
    pub path: PathBuf,
    /// Checked-out branch
    pub branch: String,
    /// Issue the worktree belongs to
    pub issue_id: IssueId,
    /// Commit the worktree was created at
    pub commit: String,
}

/// Creates and tracks isolated working copies per issue.
#[async_trait]
pub trait WorktreeManager: Send + Sync {
    /// Create a worktree on a new branch for `issue`.
    async fn create_worktree(&self, issue: &Issue) -> Result<WorktreeInfo>;

    /// Remove the worktree of `issue_id`.
    async fn remove_worktree(&self, issue_id: &IssueId) -> Result<()>;

    /// All issue worktrees.
    async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>>;
}

/// [`WorktreeManager`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitWorktreeManager {
    base_dir: PathBuf,
}

impl GitWorktreeManager {
    /// Manager for the repository containing `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    async fn worktrees_dir(&self) -> Result<PathBuf> {
        let top_level = self.git(&["rev-parse", "--show-toplevel"]).await?;
        let repo_root = PathBuf::from(top_level.trim());
        let parent = repo_root.parent().unwrap_or(&repo_root);
        Ok(parent.join(WORKTREES_DIR_NAME))
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "Running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.base_dir)
            .output()
            .await
            .map_err(|e| Error::Worktree(format!("Failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("git {} failed", args.join(" "))
            } else {
                stderr
            };
            return Err(Error::Worktree(message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WorktreeManager for GitWorktreeManager {
    async fn create_worktree(&self, issue: &Issue) -> Result<WorktreeInfo> {
        let branch = branch_name(issue);
        let path = self.worktrees_dir().await?.join(issue.id.to_string());
        let path_arg = path.to_string_lossy().into_owned();

        self.git(&["worktree", "add", "-b", &branch, &path_arg])
            .await
            .map_err(|e| Error::Worktree(format!("Failed to create worktree: {e}")))?;
        let commit = self.git(&["rev-parse", "HEAD"]).await?;

        Ok(WorktreeInfo {
            path,
            branch,
            issue_id: issue.id.clone(),
            commit: commit.trim().to_string(),
        })
    }

    async fn remove_worktree(&self, issue_id: &IssueId) -> Result<()> {
        let path = self.worktrees_dir().await?.join(issue_id.to_string());
        let path_arg = path.to_string_lossy().into_owned();

        self.git(&["worktree", "remove", &path_arg, "--force"])
            .await
            .map_err(|e| Error::Worktree(format!("Failed to remove worktree: {e}")))?;
        Ok(())
    }

    async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        let output = self.git(&["worktree", "list", "--porcelain"]).await?;
        Ok(parse_porcelain(&output))
    }
}

/// Branch name for an issue: `ghost/<kebab-title>-<last 8 id chars>`.
pub fn branch_name(issue: &Issue) -> String {
    let mut kebab = String::new();
    for c in issue.title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            kebab.push(c);
        } else if !kebab.is_empty() && !kebab.ends_with('-') {
            kebab.push('-');
        }
    }
    let kebab: String = kebab.chars().take(MAX_BRANCH_TITLE_LENGTH).collect();
    let kebab = kebab.trim_end_matches('-');

    let id = issue.id.to_string();
    let short_id: String = id
        .chars()
        .skip(id.chars().count().saturating_sub(SHORT_ID_LENGTH))
        .collect();

    format!("{BRANCH_PREFIX}{kebab}-{short_id}")
}

/// Parse `git worktree list --porcelain`, keeping entries inside the issue
/// worktree directory whose name is a valid issue id.
fn parse_porcelain(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    for block in output.split("\n\n") {
        let mut path = None;
        let mut commit = None;
        let mut branch = None;
        for line in block.lines() {
            if let Some(value) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(value));
            } else if let Some(value) = line.strip_prefix("HEAD ") {
                commit = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("branch ") {
                branch = Some(value.trim_start_matches("refs/heads/").to_string());
            }
        }

        let (Some(path), Some(commit), Some(branch)) = (path, commit, branch) else {
            continue;
        };
        if let Some(issue_id) = issue_id_from_path(&path) {
            worktrees.push(WorktreeInfo {
                path,
                branch,
                issue_id,
                commit,
            });
        }
    }
    worktrees
}

fn issue_id_from_path(path: &Path) -> Option<IssueId> {
    let parent = path.parent()?;
    if parent.file_name()? != WORKTREES_DIR_NAME {
        return None;
    }
    IssueId::parse(path.file_name()?.to_str()?).ok()
}
