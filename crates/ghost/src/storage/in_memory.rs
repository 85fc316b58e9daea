//! In-memory storage backend.
//!
//! A `HashMap` keyed by id honoring the same contract as the file backend:
//! parents must exist before children are saved, and issues with children
//! cannot be deleted. Nothing is persisted.

use super::{IssueStorage, sort_issues};
use crate::domain::{AgentRegistry, Issue, IssueId, IssueUpdate};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Ephemeral storage backend.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    issues: HashMap<IssueId, Issue>,
    agents: AgentRegistry,
}

impl InMemoryStorage {
    /// Empty store with a default agent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether the store holds no issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

#[async_trait]
impl IssueStorage for InMemoryStorage {
    async fn get_issues(&self) -> Result<Vec<Issue>> {
        let mut issues: Vec<Issue> = self.issues.values().cloned().collect();
        sort_issues(&mut issues);
        Ok(issues)
    }

    async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        Ok(self.issues.get(id).cloned())
    }

    async fn save_issue(&mut self, issue: &Issue) -> Result<()> {
        if let Some(parent) = &issue.parent_id {
            if !self.issues.contains_key(parent) {
                return Err(StorageError::ParentNotFound(parent.clone()).into());
            }
        }
        self.issues.insert(issue.id.clone(), issue.clone());
        Ok(())
    }

    async fn update_issue(&mut self, id: &IssueId, update: IssueUpdate) -> Result<Issue> {
        let mut issue = self
            .issues
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        issue.apply(update);
        self.save_issue(&issue).await?;
        Ok(issue)
    }

    async fn delete_issue(&mut self, id: &IssueId) -> Result<()> {
        if !self.issues.contains_key(id) {
            return Err(StorageError::NotFound(id.clone()).into());
        }
        if self
            .issues
            .values()
            .any(|issue| issue.parent_id.as_ref() == Some(id))
        {
            return Err(StorageError::HasChildren(id.clone()).into());
        }
        self.issues.remove(id);
        Ok(())
    }

    async fn get_agent_registry(&self) -> Result<AgentRegistry> {
        Ok(self.agents.clone())
    }

    async fn save_agent_registry(&mut self, registry: &AgentRegistry) -> Result<()> {
        self.agents = registry.clone();
        Ok(())
    }
}
