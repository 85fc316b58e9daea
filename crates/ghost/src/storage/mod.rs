//! Storage abstraction layer for ghost.
//!
//! This module provides the core storage trait and its backends:
//!
//! - **File**: the persistent backend. Each issue is one `issue.json` record
//!   inside a directory named by its id; a child's directory is nested inside
//!   its parent's directory, so the physical layout mirrors the hierarchy.
//! - **In-memory**: ephemeral `HashMap` backend with the same contract, used
//!   for tests and throwaway sessions.
//! - **Legacy**: read-only access to the pre-hierarchy flat `issues.json`,
//!   consumed by [`migration`].
//!
//! # Architecture
//!
//! The storage layer uses an async trait so the file backend can use
//! `tokio::fs`. The trait is object-safe, allowing for dynamic dispatch via
//! `Box<dyn IssueStorage>`.
//!
//! # Consistency
//!
//! There are no multi-file transactions. Each record write is a
//! write-to-temp-then-rename of a single file; a sequence of writes that is
//! interrupted can leave earlier writes applied and later ones missing.
//! Callers treat multi-record mutations as best effort.
//!
//! # Example
//!
//! ```no_run
//! use ghost::storage::{IssueStorage, file::FileStorage};
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = FileStorage::open(Path::new("."), 200);
//!     storage.init().await?;
//!
//!     for issue in storage.get_issues().await? {
//!         println!("{} {}", issue.id, issue.title);
//!     }
//!     Ok(())
//! }
//! ```

use crate::domain::{AgentRegistry, Issue, IssueId, IssueUpdate};
use crate::error::Result;
use async_trait::async_trait;

pub(crate) mod atomic;
pub mod file;
pub mod in_memory;
pub mod layout;
pub mod legacy;
pub mod migration;

pub use layout::Layout;

/// Core storage trait for issue records and agent bookkeeping.
///
/// Implementations must be `Send + Sync` so a storage handle can be moved
/// into async tasks.
///
/// # Error Handling
///
/// Failures are reported as [`crate::error::Error::Storage`]:
/// - `NotFound` when an update or delete target doesn't exist
/// - `ParentNotFound` when a record's parent has no backing record
/// - `HasChildren` when deleting an issue that still has children
/// - `Io` / `Serialization` for filesystem and encoding failures
#[async_trait]
pub trait IssueStorage: Send + Sync {
    // ========== Issues ==========

    /// All issue records, ordered by creation time then id.
    async fn get_issues(&self) -> Result<Vec<Issue>>;

    /// Get an issue by ID.
    ///
    /// Returns `None` if the issue doesn't exist.
    async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>>;

    /// Persist a new or existing record.
    ///
    /// If a record with the same id already exists under a different parent,
    /// it is moved to the location implied by `issue.parent_id`.
    async fn save_issue(&mut self, issue: &Issue) -> Result<()>;

    /// Merge `update` into an existing record and persist it.
    ///
    /// A change of `parent_id` relocates the record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the issue doesn't exist.
    async fn update_issue(&mut self, id: &IssueId, update: IssueUpdate) -> Result<Issue>;

    /// Delete an issue record.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if the issue doesn't exist
    /// - `StorageError::HasChildren` if other issues are nested under it
    async fn delete_issue(&mut self, id: &IssueId) -> Result<()>;

    // ========== Agents ==========

    /// Load the agent registry.
    async fn get_agent_registry(&self) -> Result<AgentRegistry>;

    /// Replace the agent registry.
    async fn save_agent_registry(&mut self, registry: &AgentRegistry) -> Result<()>;
}

/// Order records the same way across backends.
pub(crate) fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
