//! Migration from the legacy flat store to the hierarchical layout.
//!
//! Migration is an explicit startup step: [`Migration::needs_migration`]
//! reports whether `.ghost/data/issues.json` exists, and
//! [`Migration::migrate`] converts it. Running it again once the legacy file
//! is gone is a no-op.
//!
//! Records are written parents first. Records whose parent never gets written
//! (an orphaned parent pointer, a cyclic ancestor chain, or a parent whose own
//! write failed) are detached and written at the root of the tree, and so are
//! records that would sit deeper than the hierarchy depth limit. Nothing in
//! the legacy data aborts the migration; bad records are logged and reported.

use super::IssueStorage;
use super::file::FileStorage;
use super::layout::Layout;
use super::legacy::{LegacyStore, LegacyWarning};
use crate::domain::{Issue, IssueId, MAX_HIERARCHY_DEPTH};
use crate::error::{Result, StorageError};
use chrono::{SecondsFormat, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records written to the hierarchical store
    pub migrated: usize,

    /// Legacy records or references that were skipped
    pub skipped: Vec<LegacyWarning>,

    /// Records whose parent could not be placed before them
    pub unresolved: Vec<IssueId>,

    /// Records detached to the root because their parent was never written
    /// or they would exceed the depth limit
    pub detached: Vec<IssueId>,

    /// Records whose write failed
    pub failed: Vec<IssueId>,

    /// Where the legacy file was backed up, if a migration ran
    pub backup_path: Option<PathBuf>,
}

impl MigrationReport {
    /// Whether a legacy store was actually converted.
    pub fn ran(&self) -> bool {
        self.backup_path.is_some()
    }
}

/// Converts `.ghost/data/issues.json` into the directory tree.
#[derive(Debug, Clone)]
pub struct Migration {
    layout: Layout,
    legacy: LegacyStore,
    max_depth: usize,
}

impl Migration {
    /// Migration for the project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let layout = Layout::new(root);
        Self {
            legacy: LegacyStore::new(layout.clone()),
            layout,
            max_depth: MAX_HIERARCHY_DEPTH,
        }
    }

    /// Detach records nested deeper than `max_depth` (clamped to `1..=MAX_HIERARCHY_DEPTH`).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_HIERARCHY_DEPTH);
        self
    }

    /// Whether a legacy store is present.
    pub async fn needs_migration(&self) -> Result<bool> {
        self.legacy.exists().await
    }

    /// Convert the legacy store into `storage`, back it up and remove it.
    ///
    /// # Errors
    ///
    /// Fails only when the legacy file cannot be read as a JSON array or the
    /// filesystem refuses the setup and backup steps. Problems with individual
    /// records are reported in the returned [`MigrationReport`].
    pub async fn migrate(&self, storage: &mut FileStorage) -> Result<MigrationReport> {
        if !self.needs_migration().await? {
            return Ok(MigrationReport::default());
        }

        info!("Starting storage migration");
        self.copy_legacy_agents().await?;
        storage.init().await?;

        let (issues, skipped) = self.legacy.load().await?;
        for warning in &skipped {
            warn!(%warning, "Skipping legacy data");
        }
        info!(count = issues.len(), "Found issues to migrate");

        let (ordered, unresolved) = order_by_hierarchy(issues);
        if !unresolved.is_empty() {
            warn!(
                count = unresolved.len(),
                "Found issues with missing or cyclic parents, adding them anyway"
            );
        }

        let mut report = MigrationReport {
            skipped,
            unresolved: unresolved.iter().map(|issue| issue.id.clone()).collect(),
            ..Default::default()
        };
        // Level of every written record; a root is level 1.
        let mut written: HashMap<IssueId, usize> = HashMap::new();

        for mut issue in ordered.into_iter().chain(unresolved) {
            let mut level = 1;
            if let Some(parent) = &issue.parent_id {
                match written.get(parent) {
                    None => {
                        warn!(id = %issue.id, %parent, "Parent was not migrated, detaching issue to root");
                        issue.parent_id = None;
                        report.detached.push(issue.id.clone());
                    }
                    Some(parent_level) if parent_level + 1 > self.max_depth => {
                        warn!(
                            id = %issue.id,
                            %parent,
                            max_depth = self.max_depth,
                            "Issue is nested too deep, detaching issue to root"
                        );
                        issue.parent_id = None;
                        report.detached.push(issue.id.clone());
                    }
                    Some(parent_level) => level = parent_level + 1,
                }
            }

            match storage.save_issue(&issue).await {
                Ok(()) => {
                    info!(id = %issue.id, title = %issue.title, "Migrated issue");
                    written.insert(issue.id.clone(), level);
                    report.migrated += 1;
                }
                Err(e) => {
                    warn!(id = %issue.id, error = %e, "Failed to migrate issue");
                    report.failed.push(issue.id);
                }
            }
        }

        report.backup_path = Some(self.backup_legacy_file().await?);
        info!(
            migrated = report.migrated,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Migration completed"
        );
        Ok(report)
    }

    async fn copy_legacy_agents(&self) -> Result<()> {
        let legacy = self.layout.legacy_agents_file();
        let current = self.layout.agents_file();
        if try_exists(&legacy).await? && !try_exists(&current).await? {
            fs::copy(&legacy, &current)
                .await
                .map_err(|e| StorageError::io(&legacy, e))?;
            info!(path = %current.display(), "Copied legacy agent registry");
        }
        Ok(())
    }

    async fn backup_legacy_file(&self) -> Result<PathBuf> {
        let backup_dir = self.layout.backup_dir();
        fs::create_dir_all(&backup_dir)
            .await
            .map_err(|e| StorageError::io(&backup_dir, e))?;

        let timestamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let backup_file = backup_dir.join(format!("issues-{timestamp}.json"));

        let legacy_file = self.legacy.issues_file();
        fs::copy(&legacy_file, &backup_file)
            .await
            .map_err(|e| StorageError::io(&backup_file, e))?;
        info!(path = %backup_file.display(), "Old data backed up");

        fs::remove_file(&legacy_file)
            .await
            .map_err(|e| StorageError::io(&legacy_file, e))?;
        Ok(backup_file)
    }
}

/// Order issues so that every parent precedes its children.
///
/// Returns the placeable issues in write order and the remainder whose
/// parent chain never reaches a root (orphaned or cyclic), in input order.
fn order_by_hierarchy(issues: Vec<Issue>) -> (Vec<Issue>, Vec<Issue>) {
    let mut placed: HashSet<IssueId> = HashSet::new();
    let mut ordered = Vec::with_capacity(issues.len());
    let mut remaining = issues;

    loop {
        let (ready, blocked): (Vec<Issue>, Vec<Issue>) =
            remaining.into_iter().partition(|issue| {
                issue
                    .parent_id
                    .as_ref()
                    .is_none_or(|parent| placed.contains(parent))
            });

        if ready.is_empty() {
            return (ordered, blocked);
        }
        placed.extend(ready.iter().map(|issue| issue.id.clone()));
        ordered.extend(ready);
        remaining = blocked;
    }
}

async fn try_exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io(path, e).into())
}
