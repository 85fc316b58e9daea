//! Completion roll-up over an issue snapshot.

use crate::domain::{Issue, IssueId, IssueProgress, IssueStatus};
use std::collections::{HashMap, HashSet};

/// Computes [`IssueProgress`] for subtrees of a fixed snapshot.
///
/// Leaves count as one unit each, complete when `done` or `cancelled`.
/// An issue with children counts nothing itself and sums its children.
#[derive(Debug)]
pub struct ProgressCalculator<'a> {
    issues: HashMap<&'a IssueId, &'a Issue>,
    children: HashMap<&'a IssueId, Vec<&'a IssueId>>,
}

impl<'a> ProgressCalculator<'a> {
    /// Index a snapshot; children are derived from `parent_id`.
    pub fn new(issues: &'a [Issue]) -> Self {
        let mut children: HashMap<&IssueId, Vec<&IssueId>> = HashMap::new();
        for issue in issues {
            if let Some(parent) = &issue.parent_id {
                children.entry(parent).or_default().push(&issue.id);
            }
        }
        Self {
            issues: issues.iter().map(|issue| (&issue.id, issue)).collect(),
            children,
        }
    }

    /// Progress of the subtree rooted at `id`; an unknown id yields `0/0`.
    pub fn calculate_progress(&self, id: &IssueId) -> IssueProgress {
        let Some((&key, _)) = self.issues.get_key_value(id) else {
            return IssueProgress::default();
        };
        let mut visited = HashSet::new();
        let (completed, total) = self.count(key, &mut visited);
        IssueProgress {
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }

    /// `completed/total`, e.g. `5/8`.
    pub fn format_progress(progress: &IssueProgress) -> String {
        format!("{}/{}", progress.completed, progress.total)
    }

    fn count(&self, id: &'a IssueId, visited: &mut HashSet<&'a IssueId>) -> (usize, usize) {
        let Some(issue) = self.issues.get(id) else {
            return (0, 0);
        };
        if !visited.insert(id) {
            return (0, 0);
        }

        match self.children.get(id) {
            Some(children) if !children.is_empty() => {
                children.iter().fold((0, 0), |(completed, total), child| {
                    let (c, t) = self.count(*child, visited);
                    (completed + c, total + t)
                })
            }
            _ => {
                let done = matches!(issue.status, IssueStatus::Done | IssueStatus::Cancelled);
                (usize::from(done), 1)
            }
        }
    }
}

fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // Rounded half up; completed <= total keeps the result within 0..=100.
    let rounded = (completed * 200 + total) / (total * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
