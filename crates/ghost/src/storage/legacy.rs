//! Read-only access to the legacy flat store.
//!
//! Before the hierarchical layout, every issue lived in one JSON array at
//! `.ghost/data/issues.json`. That format also used a wider status set
//! (`ready`, `in_review`, `archived`) and kept a redundant `childIds` list.
//!
//! Loading is resilient: each array element is converted on its own, and an
//! element that cannot be converted produces a [`LegacyWarning`] instead of
//! failing the whole load. Only an unreadable file or a top-level value that
//! is not an array is an error.

use super::Layout;
use crate::domain::{Issue, IssueId, IssueStatus};
use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use tokio::fs;

/// Non-fatal problems found while reading legacy records.
///
/// The affected record (or reference) is skipped; everything else loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyWarning {
    /// Array element could not be decoded as an issue.
    MalformedRecord {
        /// Position in the legacy array
        index: usize,
        /// Decoder message
        error: String,
    },

    /// Record id is not a valid [`IssueId`].
    InvalidId {
        /// Position in the legacy array
        index: usize,
        /// The rejected id
        id: String,
    },

    /// Record status has no counterpart in the current status set.
    UnknownStatus {
        /// Record id
        id: IssueId,
        /// The rejected status
        status: String,
    },

    /// Record id appears more than once; the later element is skipped.
    DuplicateId {
        /// Position of the skipped element
        index: usize,
        /// The repeated id
        id: IssueId,
    },

    /// A dependency would close a cycle with edges accepted earlier in the file.
    CyclicDependency {
        /// Record holding the dependency
        id: IssueId,
        /// The dropped dependency target
        dependency: IssueId,
    },

    /// A parent or dependency reference is invalid or points nowhere.
    DroppedReference {
        /// Record holding the reference
        id: IssueId,
        /// The dropped reference
        reference: String,
    },
}

impl fmt::Display for LegacyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord { index, error } => {
                write!(f, "record #{index} is malformed: {error}")
            }
            Self::InvalidId { index, id } => write!(f, "record #{index} has invalid id '{id}'"),
            Self::UnknownStatus { id, status } => {
                write!(f, "issue {id} has unknown status '{status}'")
            }
            Self::DuplicateId { index, id } => {
                write!(f, "record #{index} repeats id {id}")
            }
            Self::CyclicDependency { id, dependency } => {
                write!(f, "issue {id} dependency on {dependency} would form a cycle")
            }
            Self::DroppedReference { id, reference } => {
                write!(f, "issue {id} references unknown issue '{reference}'")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyIssue {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    agent_name: Option<String>,
    #[serde(default)]
    work_tree_path: Option<PathBuf>,
}

/// Map a legacy status name to the current status and whether the record was archived.
pub fn map_legacy_status(status: &str) -> Option<(IssueStatus, bool)> {
    match status {
        "ready" => Some((IssueStatus::Backlog, false)),
        "in_review" => Some((IssueStatus::InProgress, false)),
        "archived" => Some((IssueStatus::Done, true)),
        other => other.parse().ok().map(|status| (status, false)),
    }
}

/// Reader for `.ghost/data/issues.json`.
#[derive(Debug, Clone)]
pub struct LegacyStore {
    layout: Layout,
}

impl LegacyStore {
    /// Legacy store of the project described by `layout`.
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Path of the legacy issue file.
    pub fn issues_file(&self) -> PathBuf {
        self.layout.legacy_issues_file()
    }

    /// Whether the legacy issue file exists.
    pub async fn exists(&self) -> Result<bool> {
        let path = self.issues_file();
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(&path, e).into())
    }

    /// Read and convert every legacy record.
    pub async fn load(&self) -> Result<(Vec<Issue>, Vec<LegacyWarning>)> {
        let path = self.issues_file();
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        parse_legacy_issues(&content)
    }
}

/// Convert the content of a legacy issue file.
///
/// Dependency references to issues that are not part of the result are
/// dropped, and `depended_by` is rebuilt from `depends_on` so the returned
/// records are symmetric. Edges are accepted in file order; one that would
/// close a cycle with the edges accepted before it is dropped.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the content is not JSON and
/// `StorageError::InvalidFormat` if it is not an array.
pub fn parse_legacy_issues(content: &str) -> Result<(Vec<Issue>, Vec<LegacyWarning>)> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(StorageError::from)?;
    let serde_json::Value::Array(elements) = value else {
        return Err(StorageError::InvalidFormat(
            "legacy issue file must contain a JSON array".to_string(),
        )
        .into());
    };

    let mut warnings = Vec::new();
    let mut issues: BTreeMap<IssueId, Issue> = BTreeMap::new();
    let mut order = Vec::new();
    let mut raw_dependencies: Vec<(IssueId, Vec<String>)> = Vec::new();

    for (index, element) in elements.into_iter().enumerate() {
        let legacy: LegacyIssue = match serde_json::from_value(element) {
            Ok(legacy) => legacy,
            Err(e) => {
                warnings.push(LegacyWarning::MalformedRecord {
                    index,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let Ok(id) = IssueId::parse(&legacy.id) else {
            warnings.push(LegacyWarning::InvalidId {
                index,
                id: legacy.id,
            });
            continue;
        };
        if issues.contains_key(&id) {
            warnings.push(LegacyWarning::DuplicateId { index, id });
            continue;
        }

        let Some((status, archived)) = map_legacy_status(&legacy.status) else {
            warnings.push(LegacyWarning::UnknownStatus {
                id,
                status: legacy.status,
            });
            continue;
        };

        let parent_id = match legacy.parent_id.as_deref().filter(|p| !p.is_empty()) {
            None => None,
            Some(raw) => match IssueId::parse(raw) {
                Ok(parent) => Some(parent),
                Err(_) => {
                    warnings.push(LegacyWarning::DroppedReference {
                        id: id.clone(),
                        reference: raw.to_string(),
                    });
                    None
                }
            },
        };

        let updated_at = legacy.updated_at.unwrap_or(legacy.created_at);
        let archived_at = legacy
            .archived_at
            .or_else(|| archived.then_some(updated_at));

        raw_dependencies.push((id.clone(), legacy.depends_on));
        order.push(id.clone());
        issues.insert(
            id.clone(),
            Issue {
                id,
                title: legacy.title,
                description: legacy.description,
                status,
                parent_id,
                depends_on: BTreeSet::new(),
                depended_by: BTreeSet::new(),
                created_at: legacy.created_at,
                updated_at,
                started_at: legacy.started_at,
                completed_at: legacy.completed_at,
                cancelled_at: legacy.cancelled_at,
                archived_at,
                agent_name: legacy.agent_name,
                work_tree_path: legacy.work_tree_path,
            },
        );
    }

    for (id, references) in raw_dependencies {
        for reference in references {
            match IssueId::parse(&reference) {
                Ok(target) if target == id || depends_transitively(&issues, &target, &id) => {
                    warnings.push(LegacyWarning::CyclicDependency {
                        id: id.clone(),
                        dependency: target,
                    });
                }
                Ok(target) if issues.contains_key(&target) => {
                    if let Some(issue) = issues.get_mut(&id) {
                        issue.depends_on.insert(target.clone());
                    }
                    if let Some(dependency) = issues.get_mut(&target) {
                        dependency.depended_by.insert(id.clone());
                    }
                }
                _ => warnings.push(LegacyWarning::DroppedReference {
                    id: id.clone(),
                    reference,
                }),
            }
        }
    }

    let converted = order
        .into_iter()
        .filter_map(|id| issues.remove(&id))
        .collect();
    Ok((converted, warnings))
}

/// Whether `from` already reaches `to` over the dependency edges accepted so far.
fn depends_transitively(issues: &BTreeMap<IssueId, Issue>, from: &IssueId, to: &IssueId) -> bool {
    let mut stack = vec![from];
    let mut seen = BTreeSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if seen.insert(current) {
            if let Some(issue) = issues.get(current) {
                stack.extend(issue.depends_on.iter());
            }
        }
    }
    false
}
