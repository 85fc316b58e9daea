//! Domain types for issue tracking.
//!
//! This module contains the core domain types for the ghost issue tracker:
//! issues and their status state machine, partial updates, query filters,
//! the tree read model and the agent registry.

mod agent;
mod id;

pub use agent::{Agent, AgentRegistry, AgentStatus, DEFAULT_MAX_AGENTS};
pub use id::{IssueId, SEGMENT_SEPARATOR};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Maximum number of hierarchy levels, counting a root issue as level 1.
pub const MAX_HIERARCHY_DEPTH: usize = 4;

/// Represents an issue in the tracking system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Unique, ancestor-encoded identifier
    pub id: IssueId,

    /// Issue title
    pub title: String,

    /// Issue description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Current status
    pub status: IssueStatus,

    /// Current parent in the hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<IssueId>,

    /// Issues this issue depends on
    #[serde(default)]
    pub depends_on: BTreeSet<IssueId>,

    /// Issues that depend on this issue (inverse of `depends_on`)
    #[serde(default)]
    pub depended_by: BTreeSet<IssueId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Set when the issue enters `in_progress`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set when the issue enters `done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Set when the issue enters `cancelled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Set when the issue is archived; archived issues are retained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,

    /// Name of the agent working on the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    /// Working copy created for the issue by the worktree manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_tree_path: Option<PathBuf>,
}

impl Issue {
    /// Whether the issue has been archived.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Merge a partial update into this issue and bump `updated_at`.
    pub fn apply(&mut self, update: IssueUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(depends_on) = update.depends_on {
            self.depends_on = depends_on;
        }
        if let Some(depended_by) = update.depended_by {
            self.depended_by = depended_by;
        }
        if let Some(started_at) = update.started_at {
            self.started_at = started_at;
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(cancelled_at) = update.cancelled_at {
            self.cancelled_at = cancelled_at;
        }
        if let Some(archived_at) = update.archived_at {
            self.archived_at = archived_at;
        }
        if let Some(agent_name) = update.agent_name {
            self.agent_name = agent_name;
        }
        if let Some(work_tree_path) = update.work_tree_path {
            self.work_tree_path = work_tree_path;
        }
        self.updated_at = Utc::now();
    }
}

/// Status of an issue.
///
/// Transitions follow a strict forward-only table:
///
/// | from          | to                        |
/// |---------------|---------------------------|
/// | `plan`        | `backlog`, `cancelled`    |
/// | `backlog`     | `in_progress`, `cancelled`|
/// | `in_progress` | `done`, `cancelled`       |
/// | `done`        | (terminal)                |
/// | `cancelled`   | (terminal)                |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Proposed, not yet approved for work
    Plan,

    /// Approved and ready to be picked up once dependencies are done
    Backlog,

    /// Being worked on
    InProgress,

    /// Completed successfully
    Done,

    /// Abandoned
    Cancelled,
}

impl IssueStatus {
    /// All statuses in workflow order.
    pub const ALL: [IssueStatus; 5] = [
        IssueStatus::Plan,
        IssueStatus::Backlog,
        IssueStatus::InProgress,
        IssueStatus::Done,
        IssueStatus::Cancelled,
    ];

    /// Statuses reachable from this one in a single transition.
    pub fn allowed_transitions(self) -> &'static [IssueStatus] {
        match self {
            IssueStatus::Plan => &[IssueStatus::Backlog, IssueStatus::Cancelled],
            IssueStatus::Backlog => &[IssueStatus::InProgress, IssueStatus::Cancelled],
            IssueStatus::InProgress => &[IssueStatus::Done, IssueStatus::Cancelled],
            IssueStatus::Done | IssueStatus::Cancelled => &[],
        }
    }

    /// Whether `target` is directly reachable from this status.
    pub fn can_transition_to(self, target: IssueStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Status name as stored on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Plan => "plan",
            IssueStatus::Backlog => "backlog",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Done => "done",
            IssueStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// Data for creating a new issue
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    /// Issue title
    pub title: String,

    /// Issue description
    pub description: Option<String>,

    /// Parent to nest the new issue under
    pub parent_id: Option<IssueId>,
}

impl NewIssue {
    /// A root-level issue with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Nest the new issue under `parent_id`.
    #[must_use]
    pub fn under(mut self, parent_id: IssueId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update of an issue; `None` leaves a field untouched.
///
/// Clearable fields use `Option<Option<T>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<Option<String>>,
    /// New status (no transition check at this level)
    pub status: Option<IssueStatus>,
    /// New parent; a change relocates the backing record
    pub parent_id: Option<Option<IssueId>>,
    /// Replacement dependency set
    pub depends_on: Option<BTreeSet<IssueId>>,
    /// Replacement inverse dependency set
    pub depended_by: Option<BTreeSet<IssueId>>,
    /// New start timestamp
    pub started_at: Option<Option<DateTime<Utc>>>,
    /// New completion timestamp
    pub completed_at: Option<Option<DateTime<Utc>>>,
    /// New cancellation timestamp
    pub cancelled_at: Option<Option<DateTime<Utc>>>,
    /// New archive timestamp
    pub archived_at: Option<Option<DateTime<Utc>>>,
    /// New agent assignment
    pub agent_name: Option<Option<String>>,
    /// New worktree path
    pub work_tree_path: Option<Option<PathBuf>>,
}

impl IssueUpdate {
    /// Whether the update would move the issue to a different parent.
    pub fn changes_parent_of(&self, issue: &Issue) -> bool {
        matches!(&self.parent_id, Some(parent) if *parent != issue.parent_id)
    }
}

/// Parent constraint for [`IssueFilter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// No constraint
    #[default]
    Any,
    /// Only issues without a parent
    Root,
    /// Only direct children of the given issue
    Of(IssueId),
}

/// Filter for querying issues
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    /// Keep issues whose status is one of these
    pub status: Option<Vec<IssueStatus>>,

    /// Parent constraint
    pub parent: ParentFilter,
}

impl IssueFilter {
    /// Whether `issue` satisfies every constraint.
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(statuses) = &self.status {
            if !statuses.contains(&issue.status) {
                return false;
            }
        }
        match &self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => issue.parent_id.is_none(),
            ParentFilter::Of(parent) => issue.parent_id.as_ref() == Some(parent),
        }
    }
}

/// An issue together with its descendants, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTree {
    /// The issue at this node
    #[serde(flatten)]
    pub issue: Issue,

    /// Child subtrees ordered by creation time
    pub children: Vec<IssueTree>,
}

/// Completion roll-up for an issue subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IssueProgress {
    /// Completed leaf issues
    pub completed: usize,
    /// Leaf issues counted
    pub total: usize,
    /// `round(completed / total * 100)`, 0 when `total` is 0
    pub percentage: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_issue() -> Issue {
        let now = Utc::now();
        Issue {
            id: IssueId::parse("a").unwrap(),
            title: "Sample".to_string(),
            description: None,
            status: IssueStatus::Plan,
            parent_id: None,
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

    #[rstest]
    #[case::approve(IssueStatus::Plan, IssueStatus::Backlog, true)]
    #[case::cancel_plan(IssueStatus::Plan, IssueStatus::Cancelled, true)]
    #[case::skip_backlog(IssueStatus::Plan, IssueStatus::InProgress, false)]
    #[case::start(IssueStatus::Backlog, IssueStatus::InProgress, true)]
    #[case::finish(IssueStatus::InProgress, IssueStatus::Done, true)]
    #[case::backwards(IssueStatus::InProgress, IssueStatus::Backlog, false)]
    #[case::reopen(IssueStatus::Done, IssueStatus::InProgress, false)]
    #[case::uncancel(IssueStatus::Cancelled, IssueStatus::Plan, false)]
    #[case::self_loop(IssueStatus::Backlog, IssueStatus::Backlog, false)]
    fn test_transition_table(
        #[case] from: IssueStatus,
        #[case] to: IssueStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(IssueStatus::Done.is_terminal());
        assert!(IssueStatus::Cancelled.is_terminal());
        assert!(!IssueStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in IssueStatus::ALL {
            assert_eq!(status.as_str().parse::<IssueStatus>().unwrap(), status);
        }
        assert!("in_review".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_apply_clears_optional_fields() {
        let mut issue = sample_issue();
        issue.agent_name = Some("alice".to_string());
        issue.apply(IssueUpdate {
            title: Some("Renamed".to_string()),
            agent_name: Some(None),
            ..Default::default()
        });
        assert_eq!(issue.title, "Renamed");
        assert_eq!(issue.agent_name, None);
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let mut issue = sample_issue();
        issue.parent_id = Some(IssueId::parse("p").unwrap());
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["parentId"], "p");
        assert!(json["dependsOn"].as_array().unwrap().is_empty());
        assert!(json.get("startedAt").is_none());
    }

    #[test]
    fn test_filter_by_status_and_parent() {
        let mut issue = sample_issue();
        issue.parent_id = Some(IssueId::parse("p").unwrap());

        let by_parent = IssueFilter {
            parent: ParentFilter::Of(IssueId::parse("p").unwrap()),
            ..Default::default()
        };
        assert!(by_parent.matches(&issue));

        let roots = IssueFilter {
            parent: ParentFilter::Root,
            ..Default::default()
        };
        assert!(!roots.matches(&issue));

        let backlog = IssueFilter {
            status: Some(vec![IssueStatus::Backlog]),
            ..Default::default()
        };
        assert!(!backlog.matches(&issue));
    }
}
