//! Error types for ghost operations.
//!
//! [`Error`] is the domain-level taxonomy surfaced to callers. Storage
//! failures are grouped under [`StorageError`] and wrapped in
//! [`Error::Storage`] so that callers can match on a single storage kind.
//! Every variant maps to a stable machine-readable kind via [`Error::code`].

use crate::domain::{IssueId, IssueStatus};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for ghost operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Issue not found.
    #[error("Issue not found: {0}")]
    IssueNotFound(IssueId),

    /// The status change is not allowed by the transition table.
    #[error("Invalid state transition for issue {issue_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Issue whose status was being changed
        issue_id: IssueId,
        /// Current status
        from: IssueStatus,
        /// Requested status
        to: IssueStatus,
    },

    /// Adding the dependency would close a cycle in the dependency graph.
    #[error("Circular dependency detected: {}", format_path(.cycle))]
    CircularDependency {
        /// Issue that would hold the new edge
        issue_id: IssueId,
        /// Target of the rejected edge
        depends_on_id: IssueId,
        /// The discovered cycle, starting and ending at `issue_id`
        cycle: Vec<IssueId>,
    },

    /// Re-parenting would make an issue its own ancestor.
    #[error("Circular hierarchy: {child_id} is an ancestor of {parent_id}")]
    CircularHierarchy {
        /// Proposed parent
        parent_id: IssueId,
        /// Proposed child
        child_id: IssueId,
    },

    /// Dependency integrity error that is not a cycle.
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// The hierarchy would exceed the configured maximum depth.
    #[error("Maximum hierarchy depth exceeded for {issue_id}: depth {depth} > {max_depth}")]
    MaxDepthExceeded {
        /// Issue (or proposed parent) whose subtree would be too deep
        issue_id: IssueId,
        /// Depth the operation would produce
        depth: usize,
        /// Configured limit
        max_depth: usize,
    },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Too many agents would be working at once.
    #[error("Agent limit exceeded: maximum {limit} agents allowed")]
    AgentLimitExceeded {
        /// Configured maximum number of concurrently working agents
        limit: usize,
    },

    /// The external worktree tool failed.
    #[error("Worktree error: {0}")]
    Worktree(String),

    /// A string could not be parsed as an issue id.
    #[error("Invalid issue id '{id}': {reason}")]
    InvalidId {
        /// The rejected input
        id: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable machine-readable kind for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IssueNotFound(_) => "issue_not_found",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::CircularDependency { .. } | Self::CircularHierarchy { .. } => {
                "circular_dependency"
            }
            Self::Dependency(_) => "dependency_error",
            Self::MaxDepthExceeded { .. } => "max_depth_exceeded",
            Self::Storage(_) => "storage_error",
            Self::AgentLimitExceeded { .. } => "agent_limit_exceeded",
            Self::Worktree(_) => "worktree_error",
            Self::InvalidId { .. } => "invalid_id",
            Self::Config(_) => "config_error",
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Storage(StorageError::Io {
            path: PathBuf::new(),
            source,
        })
    }
}

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        /// Path the operation was acting on (empty when unknown)
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The directory of the parent that should hold a record does not exist.
    #[error("Parent issue not found: {0}")]
    ParentNotFound(IssueId),

    /// The update or delete target does not exist.
    #[error("Issue not found: {0}")]
    NotFound(IssueId),

    /// The issue still has child records nested under it.
    #[error("Cannot delete issue {0}: it has child issues")]
    HasChildren(IssueId),

    /// On-disk data does not have the expected shape.
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.ghost` directory was found.
    #[error("Not a ghost repository (run 'ghost init' first)")]
    NotInitialized,

    /// `.ghost` already exists.
    #[error("Ghost is already initialized in this directory. Found existing '{0}'")]
    AlreadyInitialized(String),

    /// The configuration file is not valid YAML or has invalid values.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Reading or writing the configuration file failed.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_path(path: &[IssueId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A specialized Result type for ghost operations.
pub type Result<T> = std::result::Result<T, Error>;
