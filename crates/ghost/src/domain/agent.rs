//! Agent bookkeeping.

use super::IssueId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default bound on concurrently working agents.
pub const DEFAULT_MAX_AGENTS: usize = 10;

/// Whether an agent is currently assigned to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Not working on anything
    #[default]
    Idle,
    /// Assigned to an in-progress issue
    Working,
}

/// A named worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Agent name, also the registry key
    pub name: String,

    /// Current status
    pub status: AgentStatus,

    /// Issue being worked on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_issue_id: Option<IssueId>,

    /// When the current assignment started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// An idle agent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Idle,
            current_issue_id: None,
            started_at: None,
        }
    }
}

/// Registry of known agents, persisted as `agents.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistry {
    /// Agents keyed by name
    #[serde(default)]
    pub agents: BTreeMap<String, Agent>,

    /// Maximum number of agents working at the same time
    pub max_agents: usize,
}

impl AgentRegistry {
    /// Empty registry with the given bound.
    pub fn new(max_agents: usize) -> Self {
        Self {
            agents: BTreeMap::new(),
            max_agents,
        }
    }

    /// Number of agents currently working.
    pub fn working_count(&self) -> usize {
        self.agents
            .values()
            .filter(|agent| agent.status == AgentStatus::Working)
            .count()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_wire_format() {
        let mut registry = AgentRegistry::default();
        let mut agent = Agent::new("alice");
        agent.status = AgentStatus::Working;
        agent.current_issue_id = Some(IssueId::parse("abc").unwrap());
        registry.agents.insert(agent.name.clone(), agent);

        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["maxAgents"], 10);
        assert_eq!(json["agents"]["alice"]["status"], "working");
        assert_eq!(json["agents"]["alice"]["currentIssueId"], "abc");
        assert_eq!(registry.working_count(), 1);
    }

    #[test]
    fn test_registry_parses_without_agents_key() {
        let registry: AgentRegistry = serde_json::from_str(r#"{"maxAgents": 3}"#).unwrap();
        assert!(registry.agents.is_empty());
        assert_eq!(registry.max_agents, 3);
    }
}
