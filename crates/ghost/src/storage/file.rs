//! Directory-mirrored file backend.
//!
//! Every issue is stored as `issue.json` inside a directory named by its id,
//! and a child's directory lives inside its parent's directory:
//!
//! ```text
//! .ghost/issues/lq3k9z-a7f/issue.json
//! .ghost/issues/lq3k9z-a7f/lq3k9z-a7f.lq3ka1-0k2/issue.json
//! ```
//!
//! Records are addressed by id, so the backend resolves id → path by walking
//! the tree. Resolved paths and decoded records are kept in two LRU caches.
//! Both caches are advisory: a cached path is checked for existence before it
//! is trusted, and a stale entry triggers a full traversal. This is the only
//! protection against another process having moved or deleted a record.

use super::atomic::write_json_atomic;
use super::layout::{ISSUE_FILE_NAME, Layout};
use super::{IssueStorage, sort_issues};
use crate::cache::LruCache;
use crate::domain::{AgentRegistry, DEFAULT_MAX_AGENTS, Issue, IssueId, IssueUpdate};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use walkdir::WalkDir;

struct Caches {
    records: LruCache<Issue>,
    paths: LruCache<PathBuf>,
}

/// Persistent storage backend writing one record file per issue.
pub struct FileStorage {
    layout: Layout,
    caches: Mutex<Caches>,
    max_agents: usize,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("layout", &self.layout)
            .field("max_agents", &self.max_agents)
            .finish_non_exhaustive()
    }
}

impl FileStorage {
    /// Open the store rooted at `root` (the directory containing `.ghost`).
    ///
    /// Nothing is touched on disk; call [`FileStorage::init`] to create the
    /// skeleton if it may be missing.
    pub fn open(root: impl Into<PathBuf>, cache_capacity: usize) -> Self {
        Self {
            layout: Layout::new(root),
            caches: Mutex::new(Caches {
                records: LruCache::new(cache_capacity),
                paths: LruCache::new(cache_capacity),
            }),
            max_agents: DEFAULT_MAX_AGENTS,
        }
    }

    /// Agent limit written into `agents.json` when [`FileStorage::init`] creates it.
    ///
    /// An existing `agents.json` keeps its own `maxAgents`.
    #[must_use]
    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    /// Paths used by this store.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Create `issues/` and an empty `agents.json` when they are missing.
    pub async fn init(&self) -> Result<()> {
        let issues_dir = self.layout.issues_dir();
        fs::create_dir_all(&issues_dir)
            .await
            .map_err(|e| StorageError::io(&issues_dir, e))?;

        let agents_file = self.layout.agents_file();
        if !exists(&agents_file).await? {
            debug!(path = %agents_file.display(), "Creating default agent registry");
            write_json_atomic(&agents_file, &AgentRegistry::new(self.max_agents)).await?;
        }
        Ok(())
    }

    /// Resolve the record file backing `id`, if any.
    ///
    /// A cached path is only returned after checking that it still exists.
    pub async fn record_path(&self, id: &IssueId) -> Result<Option<PathBuf>> {
        let key = id.to_string();
        let cached = self.caches.lock().await.paths.get(&key);

        if let Some(path) = cached {
            if exists(&path).await? {
                debug!(%id, "Path cache hit");
                return Ok(Some(path));
            }
            debug!(%id, path = %path.display(), "Cached path is stale, rescanning");
            let mut caches = self.caches.lock().await;
            caches.paths.delete(&key);
            caches.records.delete(&key);
        }

        let found = self.find_record(id).await?;
        if let Some(path) = &found {
            self.caches.lock().await.paths.set(key, path.clone());
        }
        Ok(found)
    }

    /// Locate a record without consulting the path cache.
    ///
    /// The location implied by the id's ancestry is tried first; the full walk
    /// is only needed for issues that have been re-parented since creation.
    async fn find_record(&self, id: &IssueId) -> Result<Option<PathBuf>> {
        let issues_dir = self.layout.issues_dir();

        let mut expected = issues_dir.clone();
        for ancestor in id.ancestors() {
            expected.push(ancestor.to_string());
        }
        expected.push(id.to_string());
        expected.push(ISSUE_FILE_NAME);
        if exists(&expected).await? {
            return Ok(Some(expected));
        }

        debug!(%id, "Walking issue tree");
        let name = id.to_string();
        let dir = issues_dir.clone();
        tokio::task::spawn_blocking(move || find_record_file(&dir, &name))
            .await
            .map_err(|e| StorageError::io(&issues_dir, io::Error::other(e)))?
            .map_err(|e| StorageError::io(&issues_dir, e).into())
    }

    /// Where `issue` belongs given its current `parent_id`.
    async fn target_path(&self, issue: &Issue) -> Result<PathBuf> {
        let base = match &issue.parent_id {
            None => self.layout.issues_dir(),
            Some(parent) => {
                let parent_record = self
                    .record_path(parent)
                    .await?
                    .ok_or_else(|| StorageError::ParentNotFound(parent.clone()))?;
                record_dir(&parent_record)?
            }
        };
        Ok(base.join(issue.id.to_string()).join(ISSUE_FILE_NAME))
    }

    /// Move the directory of a record (and everything nested in it).
    async fn relocate(&self, id: &IssueId, from: &Path, to: &Path) -> Result<()> {
        let from_dir = record_dir(from)?;
        let to_dir = record_dir(to)?;

        if let Some(parent) = to_dir.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }
        fs::rename(&from_dir, &to_dir)
            .await
            .map_err(|e| StorageError::io(&from_dir, e))?;

        info!(
            %id,
            from = %from_dir.display(),
            to = %to_dir.display(),
            "Relocated issue directory"
        );

        // Descendants moved along with the directory.
        self.caches.lock().await.paths.clear();
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<PathBuf>> {
        let issues_dir = self.layout.issues_dir();
        if !exists(&issues_dir).await? {
            return Ok(Vec::new());
        }

        let dir = issues_dir.clone();
        tokio::task::spawn_blocking(move || collect_record_files(&dir))
            .await
            .map_err(|e| StorageError::io(&issues_dir, io::Error::other(e)))?
            .map_err(|e| StorageError::io(&issues_dir, e).into())
    }
}

#[async_trait]
impl IssueStorage for FileStorage {
    async fn get_issues(&self) -> Result<Vec<Issue>> {
        let files = self.scan().await?;
        let mut issues = Vec::with_capacity(files.len());
        let mut located = Vec::with_capacity(files.len());

        for path in files {
            let issue = read_record(&path).await?;
            located.push((issue.id.to_string(), path));
            issues.push(issue);
        }

        let mut caches = self.caches.lock().await;
        for (key, path) in located {
            caches.paths.set(key, path);
        }
        drop(caches);

        sort_issues(&mut issues);
        Ok(issues)
    }

    async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        let Some(path) = self.record_path(id).await? else {
            return Ok(None);
        };

        let key = id.to_string();
        if let Some(issue) = self.caches.lock().await.records.get(&key) {
            debug!(%id, "Record cache hit");
            return Ok(Some(issue));
        }

        let issue = read_record(&path).await?;
        self.caches.lock().await.records.set(key, issue.clone());
        Ok(Some(issue))
    }

    async fn save_issue(&mut self, issue: &Issue) -> Result<()> {
        let target = self.target_path(issue).await?;

        if let Some(current) = self.record_path(&issue.id).await? {
            if current != target {
                self.relocate(&issue.id, &current, &target).await?;
            }
        }

        let dir = record_dir(&target)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;
        write_json_atomic(&target, issue).await?;

        let key = issue.id.to_string();
        let mut caches = self.caches.lock().await;
        caches.records.set(key.clone(), issue.clone());
        caches.paths.set(key, target);
        Ok(())
    }

    async fn update_issue(&mut self, id: &IssueId, update: IssueUpdate) -> Result<Issue> {
        let mut issue = self
            .get_issue(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        issue.apply(update);
        self.save_issue(&issue).await?;
        Ok(issue)
    }

    async fn delete_issue(&mut self, id: &IssueId) -> Result<()> {
        let path = self
            .record_path(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        let dir = record_dir(&path)?;

        if has_child_records(&dir).await? {
            return Err(StorageError::HasChildren(id.clone()).into());
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        // Only succeeds once the directory is empty; leftovers are kept.
        if let Err(e) = fs::remove_dir(&dir).await {
            debug!(%id, error = %e, "Issue directory not removed");
        }

        let key = id.to_string();
        let mut caches = self.caches.lock().await;
        caches.records.delete(&key);
        caches.paths.delete(&key);
        Ok(())
    }

    async fn get_agent_registry(&self) -> Result<AgentRegistry> {
        let path = self.layout.agents_file();
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content).map_err(StorageError::from)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(AgentRegistry::new(self.max_agents)),
            Err(e) => Err(StorageError::io(&path, e).into()),
        }
    }

    async fn save_agent_registry(&mut self, registry: &AgentRegistry) -> Result<()> {
        let path = self.layout.agents_file();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
        }
        write_json_atomic(&path, registry).await
    }
}

async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io(path, e).into())
}

async fn read_record(path: &Path) -> Result<Issue> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        StorageError::InvalidFormat(format!("{}: {e}", path.display())).into()
    })
}

fn record_dir(record: &Path) -> Result<PathBuf> {
    record
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StorageError::InvalidFormat(format!("{} has no parent", record.display())).into())
}

async fn has_child_records(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| StorageError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        if exists(&entry.path().join(ISSUE_FILE_NAME)).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_record_files(issues_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(issues_dir).min_depth(2).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == ISSUE_FILE_NAME {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn find_record_file(issues_dir: &Path, name: &str) -> io::Result<Option<PathBuf>> {
    if !issues_dir.is_dir() {
        return Ok(None);
    }
    for entry in WalkDir::new(issues_dir).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_dir() && entry.file_name() == name {
            let record = entry.path().join(ISSUE_FILE_NAME);
            if record.is_file() {
                return Ok(Some(record));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueStatus;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn issue(id: &str, parent: Option<&str>) -> Issue {
        let now = Utc::now();
        Issue {
            id: IssueId::parse(id).unwrap(),
            title: format!("Issue {id}"),
            description: None,
            status: IssueStatus::Plan,
            parent_id: parent.map(|p| IssueId::parse(p).unwrap()),
            depends_on: BTreeSet::new(),
            depended_by: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            archived_at: None,
            agent_name: None,
            work_tree_path: None,
        }
    }

    async fn storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path(), 8);
        storage.init().await.unwrap();
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_init_creates_skeleton() {
        let (temp_dir, storage) = storage().await;
        assert!(temp_dir.path().join(".ghost/issues").is_dir());
        let registry = storage.get_agent_registry().await.unwrap();
        assert_eq!(registry, AgentRegistry::default());
    }

    #[tokio::test]
    async fn test_child_is_nested_in_parent_directory() {
        let (temp_dir, mut storage) = storage().await;
        storage.save_issue(&issue("p", None)).await.unwrap();
        storage.save_issue(&issue("p.c", Some("p"))).await.unwrap();

        let path = storage
            .record_path(&IssueId::parse("p.c").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, temp_dir.path().join(".ghost/issues/p/p.c/issue.json"));
    }

    #[tokio::test]
    async fn test_save_with_missing_parent_fails() {
        let (_temp_dir, mut storage) = storage().await;
        let err = storage
            .save_issue(&issue("x", Some("missing")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Storage(StorageError::ParentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_cached_path_falls_back_to_traversal() {
        let (temp_dir, mut storage) = storage().await;
        storage.save_issue(&issue("a", None)).await.unwrap();
        storage.save_issue(&issue("b", None)).await.unwrap();
        let id = IssueId::parse("b").unwrap();
        storage.record_path(&id).await.unwrap();

        // Another process moves `b` under `a` behind our back.
        let issues = temp_dir.path().join(".ghost/issues");
        std::fs::rename(issues.join("b"), issues.join("a").join("b")).unwrap();

        let path = storage.record_path(&id).await.unwrap().unwrap();
        assert_eq!(path, issues.join("a/b/issue.json"));
        assert!(storage.get_issue(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_externally_deleted_record_is_not_served_from_cache() {
        let (temp_dir, mut storage) = storage().await;
        storage.save_issue(&issue("a", None)).await.unwrap();
        let id = IssueId::parse("a").unwrap();
        assert!(storage.get_issue(&id).await.unwrap().is_some());

        std::fs::remove_dir_all(temp_dir.path().join(".ghost/issues/a")).unwrap();

        assert!(storage.get_issue(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_empty_directory() {
        let (temp_dir, mut storage) = storage().await;
        storage.save_issue(&issue("a", None)).await.unwrap();

        storage.delete_issue(&IssueId::parse("a").unwrap()).await.unwrap();

        assert!(!temp_dir.path().join(".ghost/issues/a").exists());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let (temp_dir, storage) = storage().await;
        let dir = temp_dir.path().join(".ghost/issues/bad");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ISSUE_FILE_NAME), "{not json").unwrap();

        let err = storage.get_issues().await.unwrap_err();
        assert_eq!(err.code(), "storage_error");
    }
}
