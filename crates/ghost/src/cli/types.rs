//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::IssueStatus;

/// Issue status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatusArg {
    /// Proposed, not yet approved
    Plan,
    /// Approved and waiting to be picked up
    Backlog,
    /// Currently being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Completed
    Done,
    /// Abandoned
    Cancelled,
}

impl std::fmt::Display for IssueStatusArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(IssueStatus::from(*self).as_str())
    }
}

impl From<IssueStatusArg> for IssueStatus {
    fn from(arg: IssueStatusArg) -> Self {
        match arg {
            IssueStatusArg::Plan => IssueStatus::Plan,
            IssueStatusArg::Backlog => IssueStatus::Backlog,
            IssueStatusArg::InProgress => IssueStatus::InProgress,
            IssueStatusArg::Done => IssueStatus::Done,
            IssueStatusArg::Cancelled => IssueStatus::Cancelled,
        }
    }
}
