//! Ghost - hierarchical issue tracking.
//!
//! Issues form a tree of at most four levels and a separate acyclic
//! dependency graph. Records are stored one file per issue in a directory
//! tree under `.ghost/issues/` that mirrors the hierarchy.
//!
//! The crate is both the `ghost` CLI and a library:
//!
//! - [`service::IssueService`]: business rules (status machine, cycle and
//!   depth checks, availability, archiving, agent assignment)
//! - [`storage`]: the [`storage::IssueStorage`] trait with file and
//!   in-memory backends, plus migration from the legacy flat store
//! - [`cache::LruCache`]: bounded cache used by the file backend

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod cache;
pub mod domain;
pub mod error;
pub mod id_generation;
pub mod service;
pub mod storage;
pub mod worktree;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Application context and configuration
pub mod app;
pub mod config;

// Output formatting (used by CLI)
pub(crate) mod output;

pub use error::{Error, Result};
