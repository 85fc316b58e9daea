//! Issue domain service.
//!
//! [`IssueService`] is the only component that mutates issues on behalf of
//! callers. It enforces the business rules the storage layer knows nothing
//! about:
//!
//! - status changes follow [`IssueStatus::allowed_transitions`]
//! - the hierarchy is at most [`MAX_HIERARCHY_DEPTH`] levels deep and acyclic
//! - the dependency graph is acyclic (self-dependencies included)
//! - `depends_on` and `depended_by` stay mutually symmetric
//!
//! Every check runs against a fresh storage snapshot before anything is
//! written, so a rejected call leaves the store untouched. Multi-record
//! writes (both sides of a dependency edge, an archived subtree) are best
//! effort: an I/O failure half way can leave earlier writes applied.

mod agents;
pub mod graph;
pub mod progress;

pub use graph::{IssueGraph, Link};
pub use progress::ProgressCalculator;

use crate::domain::{
    Issue, IssueFilter, IssueId, IssueProgress, IssueStatus, IssueTree, IssueUpdate,
    MAX_HIERARCHY_DEPTH, NewIssue, ParentFilter,
};
use crate::error::{Error, Result, StorageError};
use crate::id_generation::IdGenerator;
use crate::storage::IssueStorage;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Attempts at finding an id that is not already stored.
const MAX_ID_ATTEMPTS: usize = 10;

/// Business operations over an [`IssueStorage`].
pub struct IssueService<'a> {
    storage: &'a mut dyn IssueStorage,
    ids: IdGenerator,
    max_depth: usize,
}

impl std::fmt::Debug for IssueService<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueService")
            .field("storage", &"<dyn IssueStorage>")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl<'a> IssueService<'a> {
    /// Service over `storage` with the default depth limit.
    pub fn new(storage: &'a mut dyn IssueStorage) -> Self {
        Self {
            storage,
            ids: IdGenerator::new(),
            max_depth: MAX_HIERARCHY_DEPTH,
        }
    }

    /// Use a lower hierarchy depth limit (clamped to `1..=MAX_HIERARCHY_DEPTH`).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_HIERARCHY_DEPTH);
        self
    }

    /// The enforced hierarchy depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // ========== Queries ==========

    /// Get an issue by ID.
    pub async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        self.storage.get_issue(id).await
    }

    /// Issues matching `filter`, ordered by creation time.
    pub async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let issues = self.storage.get_issues().await?;
        Ok(issues.into_iter().filter(|issue| filter.matches(issue)).collect())
    }

    /// Direct children of `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IssueNotFound`] if the parent doesn't exist.
    pub async fn get_children(&self, parent_id: &IssueId) -> Result<Vec<Issue>> {
        self.require(parent_id).await?;
        self.get_issues(&IssueFilter {
            parent: ParentFilter::Of(parent_id.clone()),
            ..Default::default()
        })
        .await
    }

    /// Backlog issues that are not archived and whose dependencies are all done.
    ///
    /// A dependency on an issue that no longer exists counts as unmet.
    pub async fn get_available_issues(&self) -> Result<Vec<Issue>> {
        let issues = self.storage.get_issues().await?;
        let status_by_id: HashMap<&IssueId, IssueStatus> =
            issues.iter().map(|issue| (&issue.id, issue.status)).collect();

        Ok(issues
            .iter()
            .filter(|issue| is_available(issue, &status_by_id))
            .cloned()
            .collect())
    }

    /// The issue and all of its descendants.
    pub async fn get_issue_tree(&self, id: &IssueId) -> Result<IssueTree> {
        let issues = self.storage.get_issues().await?;
        let index = TreeIndex::new(&issues);
        let root = index
            .issue(id)
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;
        Ok(index.build(root, &mut HashSet::new()))
    }

    /// Trees for every root issue (including issues whose parent is missing).
    pub async fn get_issue_forest(&self) -> Result<Vec<IssueTree>> {
        let issues = self.storage.get_issues().await?;
        let index = TreeIndex::new(&issues);
        let mut visited = HashSet::new();
        Ok(issues
            .iter()
            .filter(|issue| {
                issue
                    .parent_id
                    .as_ref()
                    .is_none_or(|parent| index.issue(parent).is_none())
            })
            .map(|root| index.build(root, &mut visited))
            .collect())
    }

    /// Completion roll-up of the subtree rooted at `id`.
    pub async fn calculate_progress(&self, id: &IssueId) -> Result<IssueProgress> {
        self.require(id).await?;
        let issues = self.storage.get_issues().await?;
        Ok(ProgressCalculator::new(&issues).calculate_progress(id))
    }

    // ========== Mutations ==========

    /// Create a new issue in `plan` status.
    ///
    /// # Errors
    ///
    /// - [`Error::IssueNotFound`] if the parent doesn't exist
    /// - [`Error::MaxDepthExceeded`] if the parent is already at the deepest level
    pub async fn create_issue(&mut self, new_issue: NewIssue) -> Result<Issue> {
        if let Some(parent_id) = &new_issue.parent_id {
            let depth = self.live_level(parent_id).await? + 1;
            if depth > self.max_depth {
                return Err(Error::MaxDepthExceeded {
                    issue_id: parent_id.clone(),
                    depth,
                    max_depth: self.max_depth,
                });
            }
        }

        let id = self
            .generate_id(&new_issue.title, new_issue.parent_id.as_ref())
            .await?;
        let now = Utc::now();
        let issue = Issue {
            id,
            title: new_issue.title,
            description: new_issue.description,
            status: IssueStatus::Plan,
            parent_id: new_issue.parent_id,
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
        };

        self.storage.save_issue(&issue).await?;
        info!(id = %issue.id, title = %issue.title, "Created issue");
        Ok(issue)
    }

    /// Move an issue to `status`, stamping the matching timestamp.
    ///
    /// # Errors
    ///
    /// - [`Error::IssueNotFound`] if the issue doesn't exist
    /// - [`Error::InvalidStateTransition`] if the transition is not allowed
    pub async fn update_issue_status(&mut self, id: &IssueId, status: IssueStatus) -> Result<Issue> {
        let issue = self.require(id).await?;
        check_transition(&issue, status)?;

        let now = Utc::now();
        let mut update = IssueUpdate {
            status: Some(status),
            ..Default::default()
        };
        match status {
            IssueStatus::InProgress => update.started_at = Some(Some(now)),
            IssueStatus::Done => update.completed_at = Some(Some(now)),
            IssueStatus::Cancelled => update.cancelled_at = Some(Some(now)),
            IssueStatus::Plan | IssueStatus::Backlog => {}
        }

        let updated = self.storage.update_issue(id, update).await?;
        info!(%id, from = %issue.status, to = %status, "Updated issue status");
        Ok(updated)
    }

    /// Approve a planned issue (`plan` -> `backlog`).
    pub async fn approve_issue(&mut self, id: &IssueId) -> Result<Issue> {
        self.update_issue_status(id, IssueStatus::Backlog).await
    }

    /// Merge a partial update into an issue.
    ///
    /// A status change is checked against the transition table and a parent
    /// change against the hierarchy rules. Dependency sets cannot be replaced
    /// wholesale; use [`IssueService::add_dependency`] and
    /// [`IssueService::remove_dependency`].
    pub async fn update_issue(&mut self, id: &IssueId, update: IssueUpdate) -> Result<Issue> {
        let issue = self.require(id).await?;

        if update.depends_on.is_some() || update.depended_by.is_some() {
            return Err(Error::Dependency(
                "dependency sets are changed through add_dependency and remove_dependency"
                    .to_string(),
            ));
        }
        if let Some(status) = update.status {
            if status != issue.status {
                check_transition(&issue, status)?;
            }
        }
        if update.changes_parent_of(&issue) {
            if let Some(Some(parent_id)) = &update.parent_id {
                self.require(parent_id).await?;
                let (_, graph) = self.snapshot().await?;
                self.check_reparent(&graph, parent_id, id)?;
            }
        }

        self.storage.update_issue(id, update).await
    }

    /// Record that `issue_id` depends on `depends_on_id`.
    ///
    /// Adding an edge that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::CircularDependency`] if the edge would close a cycle,
    ///   including `issue_id == depends_on_id`
    /// - [`Error::IssueNotFound`] if either issue doesn't exist
    pub async fn add_dependency(&mut self, issue_id: &IssueId, depends_on_id: &IssueId) -> Result<()> {
        if issue_id == depends_on_id {
            return Err(Error::CircularDependency {
                issue_id: issue_id.clone(),
                depends_on_id: depends_on_id.clone(),
                cycle: vec![issue_id.clone(), issue_id.clone()],
            });
        }

        let issue = self.require(issue_id).await?;
        let dependency = self.require(depends_on_id).await?;

        let (_, graph) = self.snapshot().await?;
        if let Some(cycle) = graph.cycle_through(issue_id, depends_on_id) {
            debug!(%issue_id, %depends_on_id, ?cycle, "Rejected dependency");
            return Err(Error::CircularDependency {
                issue_id: issue_id.clone(),
                depends_on_id: depends_on_id.clone(),
                cycle,
            });
        }

        if !issue.depends_on.contains(depends_on_id) {
            let mut depends_on = issue.depends_on;
            depends_on.insert(depends_on_id.clone());
            self.set_dependency_sets(issue_id, Some(depends_on), None)
                .await?;
        }
        if !dependency.depended_by.contains(issue_id) {
            let mut depended_by = dependency.depended_by;
            depended_by.insert(issue_id.clone());
            self.set_dependency_sets(depends_on_id, None, Some(depended_by))
                .await?;
        }

        info!(%issue_id, %depends_on_id, "Added dependency");
        Ok(())
    }

    /// Remove the edge `issue_id -> depends_on_id` from both sides.
    ///
    /// A missing edge, or a dependency target that no longer exists, is not an error.
    pub async fn remove_dependency(
        &mut self,
        issue_id: &IssueId,
        depends_on_id: &IssueId,
    ) -> Result<()> {
        let issue = self.require(issue_id).await?;

        if issue.depends_on.contains(depends_on_id) {
            let mut depends_on = issue.depends_on;
            depends_on.remove(depends_on_id);
            self.set_dependency_sets(issue_id, Some(depends_on), None)
                .await?;
        }
        if let Some(dependency) = self.storage.get_issue(depends_on_id).await? {
            if dependency.depended_by.contains(issue_id) {
                let mut depended_by = dependency.depended_by;
                depended_by.remove(issue_id);
                self.set_dependency_sets(depends_on_id, None, Some(depended_by))
                    .await?;
            }
        }

        debug!(%issue_id, %depends_on_id, "Removed dependency");
        Ok(())
    }

    /// Archive an issue and, first, all of its descendants.
    ///
    /// Returns the ids that were newly archived, descendants first.
    pub async fn archive_issue(&mut self, id: &IssueId) -> Result<Vec<IssueId>> {
        self.require(id).await?;
        let (issues, graph) = self.snapshot().await?;
        let already_archived: HashSet<&IssueId> = issues
            .iter()
            .filter(|issue| issue.is_archived())
            .map(|issue| &issue.id)
            .collect();

        let mut order = graph.descendants_post_order(id);
        order.push(id.clone());

        let now = Utc::now();
        let mut archived = Vec::new();
        for target in order {
            if already_archived.contains(&target) {
                continue;
            }
            let update = IssueUpdate {
                archived_at: Some(Some(now)),
                ..Default::default()
            };
            self.storage.update_issue(&target, update).await?;
            archived.push(target);
        }

        info!(%id, count = archived.len(), "Archived issue tree");
        Ok(archived)
    }

    /// Make `child_ids` exactly the set of children of `parent_id`.
    ///
    /// Current children not listed are moved to the root; listed issues that
    /// are not yet children are moved under `parent_id`. Every new child is
    /// validated before anything moves.
    ///
    /// # Errors
    ///
    /// - [`Error::IssueNotFound`] if the parent or a new child doesn't exist
    /// - [`Error::CircularHierarchy`] if a new child is the parent or one of its ancestors
    /// - [`Error::MaxDepthExceeded`] if a moved subtree would end up too deep
    pub async fn set_children(&mut self, parent_id: &IssueId, child_ids: &[IssueId]) -> Result<()> {
        self.require(parent_id).await?;
        let (_, graph) = self.snapshot().await?;

        let desired: BTreeSet<IssueId> = child_ids.iter().cloned().collect();
        let current: BTreeSet<IssueId> = graph.children(parent_id).into_iter().collect();

        for child in desired.difference(&current) {
            self.check_reparent(&graph, parent_id, child)?;
        }

        for child in current.difference(&desired) {
            let update = IssueUpdate {
                parent_id: Some(None),
                ..Default::default()
            };
            self.storage.update_issue(child, update).await?;
        }
        for child in desired.difference(&current) {
            let update = IssueUpdate {
                parent_id: Some(Some(parent_id.clone())),
                ..Default::default()
            };
            self.storage.update_issue(child, update).await?;
        }

        info!(%parent_id, children = desired.len(), "Set children");
        Ok(())
    }

    /// Delete a childless issue, detaching its dependency edges first.
    ///
    /// # Errors
    ///
    /// - [`Error::IssueNotFound`] if the issue doesn't exist
    /// - `StorageError::HasChildren` if other issues are nested under it
    pub async fn delete_issue(&mut self, id: &IssueId) -> Result<()> {
        let issue = self.require(id).await?;
        let (_, graph) = self.snapshot().await?;
        if !graph.children(id).is_empty() {
            return Err(StorageError::HasChildren(id.clone()).into());
        }

        for dependency_id in &issue.depends_on {
            if let Some(dependency) = self.storage.get_issue(dependency_id).await? {
                let mut depended_by = dependency.depended_by;
                if depended_by.remove(id) {
                    self.set_dependency_sets(dependency_id, None, Some(depended_by))
                        .await?;
                }
            }
        }
        for dependent_id in &issue.depended_by {
            if let Some(dependent) = self.storage.get_issue(dependent_id).await? {
                let mut depends_on = dependent.depends_on;
                if depends_on.remove(id) {
                    self.set_dependency_sets(dependent_id, Some(depends_on), None)
                        .await?;
                }
            }
        }

        self.storage.delete_issue(id).await?;
        info!(%id, "Deleted issue");
        Ok(())
    }

    // ========== Helpers ==========

    async fn require(&self, id: &IssueId) -> Result<Issue> {
        self.storage
            .get_issue(id)
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))
    }

    async fn snapshot(&self) -> Result<(Vec<Issue>, IssueGraph)> {
        let issues = self.storage.get_issues().await?;
        let graph = IssueGraph::from_issues(&issues);
        Ok((issues, graph))
    }

    /// Level of `id` following live `parent_id` pointers; a root is level 1.
    async fn live_level(&self, id: &IssueId) -> Result<usize> {
        let mut current = self.require(id).await?;
        let mut seen = HashSet::from([id.clone()]);
        let mut level = 1;

        while let Some(parent_id) = current.parent_id.clone() {
            if !seen.insert(parent_id.clone()) {
                warn!(%id, %parent_id, "Parent chain loops, stopping depth walk");
                break;
            }
            let Some(parent) = self.storage.get_issue(&parent_id).await? else {
                break;
            };
            level += 1;
            current = parent;
        }
        Ok(level)
    }

    fn check_reparent(&self, graph: &IssueGraph, parent_id: &IssueId, child_id: &IssueId) -> Result<()> {
        if !graph.contains(child_id) {
            return Err(Error::IssueNotFound(child_id.clone()));
        }
        if graph.is_self_or_ancestor(child_id, parent_id) {
            return Err(Error::CircularHierarchy {
                parent_id: parent_id.clone(),
                child_id: child_id.clone(),
            });
        }

        let depth = graph.level(parent_id) + graph.subtree_height(child_id);
        if depth > self.max_depth {
            return Err(Error::MaxDepthExceeded {
                issue_id: child_id.clone(),
                depth,
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    async fn set_dependency_sets(
        &mut self,
        id: &IssueId,
        depends_on: Option<BTreeSet<IssueId>>,
        depended_by: Option<BTreeSet<IssueId>>,
    ) -> Result<()> {
        let update = IssueUpdate {
            depends_on,
            depended_by,
            ..Default::default()
        };
        self.storage.update_issue(id, update).await?;
        Ok(())
    }

    /// Checks candidates against one snapshot of the stored ids.
    async fn generate_id(&mut self, title: &str, parent: Option<&IssueId>) -> Result<IssueId> {
        let stored: HashSet<IssueId> = self
            .storage
            .get_issues()
            .await?
            .into_iter()
            .map(|issue| issue.id)
            .collect();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate(title, parent).map_err(|e| {
                StorageError::InvalidFormat(format!("ID generation failed: {e}"))
            })?;
            if !stored.contains(&id) {
                return Ok(id);
            }
            debug!(%id, "Generated id is already stored, retrying");
        }
        Err(StorageError::InvalidFormat("ID generation failed: no unused id found".to_string()).into())
    }
}

fn check_transition(issue: &Issue, status: IssueStatus) -> Result<()> {
    if issue.status.can_transition_to(status) {
        Ok(())
    } else {
        Err(Error::InvalidStateTransition {
            issue_id: issue.id.clone(),
            from: issue.status,
            to: status,
        })
    }
}

fn is_available(issue: &Issue, status_by_id: &HashMap<&IssueId, IssueStatus>) -> bool {
    issue.status == IssueStatus::Backlog
        && !issue.is_archived()
        && issue
            .depends_on
            .iter()
            .all(|dependency| status_by_id.get(dependency) == Some(&IssueStatus::Done))
}

/// Parent -> children index over a snapshot, for building [`IssueTree`]s.
struct TreeIndex<'a> {
    by_id: HashMap<&'a IssueId, &'a Issue>,
    children: HashMap<&'a IssueId, Vec<&'a Issue>>,
}

impl<'a> TreeIndex<'a> {
    fn new(issues: &'a [Issue]) -> Self {
        let mut children: HashMap<&IssueId, Vec<&Issue>> = HashMap::new();
        for issue in issues {
            if let Some(parent) = &issue.parent_id {
                children.entry(parent).or_default().push(issue);
            }
        }
        Self {
            by_id: issues.iter().map(|issue| (&issue.id, issue)).collect(),
            children,
        }
    }

    fn issue(&self, id: &IssueId) -> Option<&'a Issue> {
        self.by_id.get(id).copied()
    }

    fn build(&self, issue: &'a Issue, visited: &mut HashSet<&'a IssueId>) -> IssueTree {
        visited.insert(&issue.id);
        let children = self
            .children
            .get(&issue.id)
            .map(|children| {
                children
                    .iter()
                    .filter(|child| !visited.contains(&child.id))
                    .copied()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
            .into_iter()
            .map(|child| self.build(child, visited))
            .collect();

        IssueTree {
            issue: issue.clone(),
            children,
        }
    }
}
