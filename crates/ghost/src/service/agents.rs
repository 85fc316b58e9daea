//! Agent assignment.

use super::{IssueService, is_available};
use crate::domain::{Agent, AgentRegistry, AgentStatus, Issue, IssueId, IssueStatus, IssueUpdate};
use crate::error::{Error, Result};
use crate::worktree::WorktreeManager;
use chrono::Utc;
use std::collections::HashMap;
use tracing::info;

impl IssueService<'_> {
    /// The persisted agent registry.
    pub async fn agent_registry(&self) -> Result<AgentRegistry> {
        self.storage.get_agent_registry().await
    }

    /// Assign a backlog issue to `agent` and start it.
    ///
    /// When a worktree manager is given, a worktree is created first and its
    /// path recorded on the issue. An agent that is already working moves to
    /// the new issue without counting against the limit again.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidStateTransition`] if the issue is not in `backlog`
    /// - [`Error::Dependency`] if it is archived or has unfinished dependencies
    /// - [`Error::AgentLimitExceeded`] if no more agents may work concurrently
    /// - [`Error::Worktree`] if the worktree cannot be created
    pub async fn take_issue(
        &mut self,
        id: &IssueId,
        agent: &str,
        worktrees: Option<&dyn WorktreeManager>,
    ) -> Result<Issue> {
        let issue = self.require(id).await?;
        if issue.status != IssueStatus::Backlog {
            return Err(Error::InvalidStateTransition {
                issue_id: id.clone(),
                from: issue.status,
                to: IssueStatus::InProgress,
            });
        }

        let issues = self.storage.get_issues().await?;
        let status_by_id: HashMap<&IssueId, IssueStatus> =
            issues.iter().map(|issue| (&issue.id, issue.status)).collect();
        if !is_available(&issue, &status_by_id) {
            return Err(Error::Dependency(format!(
                "Issue {id} is not available: it is archived or has unfinished dependencies"
            )));
        }

        let mut registry = self.storage.get_agent_registry().await?;
        let already_working = registry
            .agents
            .get(agent)
            .is_some_and(|existing| existing.status == AgentStatus::Working);
        if !already_working && registry.working_count() >= registry.max_agents {
            return Err(Error::AgentLimitExceeded {
                limit: registry.max_agents,
            });
        }

        let worktree = match worktrees {
            Some(manager) => Some(manager.create_worktree(&issue).await?),
            None => None,
        };

        let now = Utc::now();
        let update = IssueUpdate {
            status: Some(IssueStatus::InProgress),
            started_at: Some(Some(now)),
            agent_name: Some(Some(agent.to_string())),
            work_tree_path: worktree.map(|info| Some(info.path)),
            ..Default::default()
        };
        let updated = self.storage.update_issue(id, update).await?;

        let entry = registry
            .agents
            .entry(agent.to_string())
            .or_insert_with(|| Agent::new(agent));
        entry.status = AgentStatus::Working;
        entry.current_issue_id = Some(id.clone());
        entry.started_at = Some(now);
        self.storage.save_agent_registry(&registry).await?;

        info!(%id, agent, "Agent took issue");
        Ok(updated)
    }

    /// Mark `agent` idle. Returns `false` if the agent is unknown.
    pub async fn release_agent(&mut self, agent: &str) -> Result<bool> {
        let mut registry = self.storage.get_agent_registry().await?;
        let Some(entry) = registry.agents.get_mut(agent) else {
            return Ok(false);
        };
        entry.status = AgentStatus::Idle;
        entry.current_issue_id = None;
        entry.started_at = None;

        self.storage.save_agent_registry(&registry).await?;
        info!(agent, "Released agent");
        Ok(true)
    }
}
