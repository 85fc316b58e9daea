//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::{Parser, Subcommand};

use super::types::IssueStatusArg;
use super::validators::{
    validate_agent_name, validate_description, validate_issue_id, validate_title,
};
use crate::domain::{IssueId, MAX_HIERARCHY_DEPTH};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Maximum hierarchy depth (a root issue is level 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=MAX_HIERARCHY_DEPTH as i64))]
    pub max_depth: Option<u8>,

    /// Maximum number of agents working at the same time
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_agents: Option<u16>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `create` command
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Issue title
    #[arg(value_parser = validate_title)]
    pub title: String,

    /// Detailed description
    #[arg(short = 'D', long, value_parser = validate_description)]
    pub description: Option<String>,

    /// Parent issue to nest the new issue under
    #[arg(short, long, value_parser = validate_issue_id)]
    pub parent: Option<IssueId>,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Filter by status (repeatable)
    #[arg(short, long, value_enum)]
    pub status: Vec<IssueStatusArg>,

    /// Only direct children of this issue
    #[arg(short, long, value_parser = validate_issue_id, conflicts_with = "roots")]
    pub parent: Option<IssueId>,

    /// Only root issues
    #[arg(long)]
    pub roots: bool,

    /// Include archived issues
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for commands that take a single issue id
#[derive(Parser, Debug, Clone)]
pub struct IssueArgs {
    /// Issue ID
    #[arg(value_parser = validate_issue_id)]
    pub issue_id: IssueId,
}

/// Arguments for the `status` command
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Issue ID
    #[arg(value_parser = validate_issue_id)]
    pub issue_id: IssueId,

    /// New status
    #[arg(value_enum)]
    pub status: IssueStatusArg,
}

/// Arguments for the `update` command
#[derive(Parser, Debug, Clone)]
pub struct UpdateArgs {
    /// Issue ID to update
    #[arg(value_parser = validate_issue_id)]
    pub issue_id: IssueId,

    /// New title
    #[arg(long, value_parser = validate_title)]
    pub title: Option<String>,

    /// New description (empty string clears it)
    #[arg(short = 'D', long, value_parser = validate_description)]
    pub description: Option<String>,

    /// Move the issue under another parent
    #[arg(short, long, value_parser = validate_issue_id, conflicts_with = "root")]
    pub parent: Option<IssueId>,

    /// Move the issue to the root of the tree
    #[arg(long)]
    pub root: bool,
}

/// Arguments for the `children` command
#[derive(Parser, Debug, Clone)]
pub struct ChildrenArgs {
    /// Parent issue
    #[arg(value_parser = validate_issue_id)]
    pub parent_id: IssueId,

    /// Replace the children with exactly these issues
    #[arg(long, value_parser = validate_issue_id, num_args = 0.., value_delimiter = ',')]
    pub set: Option<Vec<IssueId>>,
}

/// Arguments for the `dep` command
#[derive(Parser, Debug, Clone)]
pub struct DepArgs {
    /// Dependency subcommand
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency management actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// Add a dependency
    Add {
        /// Issue that depends on another
        #[arg(value_parser = validate_issue_id)]
        from: IssueId,

        /// Issue being depended on
        #[arg(value_parser = validate_issue_id)]
        to: IssueId,
    },

    /// Remove a dependency
    Remove {
        /// Issue that depends on another
        #[arg(value_parser = validate_issue_id)]
        from: IssueId,

        /// Issue being depended on
        #[arg(value_parser = validate_issue_id)]
        to: IssueId,
    },
}

/// Arguments for the `tree` command
#[derive(Parser, Debug, Clone)]
pub struct TreeArgs {
    /// Root of the tree to show (all roots when omitted)
    #[arg(value_parser = validate_issue_id)]
    pub issue_id: Option<IssueId>,
}

/// Arguments for the `take` command
#[derive(Parser, Debug, Clone)]
pub struct TakeArgs {
    /// Issue to start working on
    #[arg(value_parser = validate_issue_id)]
    pub issue_id: IssueId,

    /// Agent taking the issue
    #[arg(short, long, value_parser = validate_agent_name)]
    pub agent: String,

    /// Create a git worktree for the issue
    #[arg(short, long)]
    pub worktree: bool,
}

/// Arguments for the `agent` command
#[derive(Parser, Debug, Clone)]
pub struct AgentArgs {
    /// Agent subcommand
    #[command(subcommand)]
    pub action: AgentAction,
}

/// Agent management actions
#[derive(Subcommand, Debug, Clone)]
pub enum AgentAction {
    /// List agents and their assignments
    List,

    /// Mark an agent idle
    Release {
        /// Agent name
        #[arg(value_parser = validate_agent_name)]
        name: String,
    },
}
