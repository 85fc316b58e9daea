//! Implementation of the `init` command.
//!
//! This module handles initialization of a new ghost repository, creating
//! the `.ghost/` directory structure with configuration, the issue tree root
//! and an empty agent registry.

use crate::config::GhostConfig;
use crate::domain::AgentRegistry;
use crate::error::{ConfigError, Result, StorageError};
use crate::storage::layout::{GHOST_DIR_NAME, Layout};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Maximum directory depth to traverse when searching for the ghost root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

const GITIGNORE_CONTENT: &str = "\
# Ghost metadata files that should not be tracked
# The issues/ tree and agents.json should be tracked for collaboration
backup/
";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created ghost directory
    pub ghost_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created issue tree root
    pub issues_dir: PathBuf,
    /// Path to the created agent registry
    pub agents_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
}

/// Initialize a new ghost repository in the given directory.
///
/// # Arguments
///
/// * `base_dir` - The base directory where `.ghost/` will be created
/// * `config` - Configuration to write to `config.yaml`
///
/// # Errors
///
/// Returns an error if:
/// - The `.ghost/` directory already exists
/// - File system operations fail
pub async fn init(base_dir: &Path, config: &GhostConfig) -> Result<InitResult> {
    config.validate()?;

    let layout = Layout::new(base_dir);
    let ghost_dir = layout.ghost_dir();

    if ghost_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(GHOST_DIR_NAME.to_string()).into());
    }

    let issues_dir = layout.issues_dir();
    fs::create_dir_all(&issues_dir)
        .await
        .map_err(|e| StorageError::io(&issues_dir, e))?;

    let config_file = layout.config_file();
    config.save(&config_file).await?;

    let agents_file = layout.agents_file();
    let registry = AgentRegistry::new(config.max_agents);
    let content = serde_json::to_string_pretty(&registry).map_err(StorageError::from)?;
    fs::write(&agents_file, content)
        .await
        .map_err(|e| StorageError::io(&agents_file, e))?;

    let gitignore_file = layout.gitignore_file();
    fs::write(&gitignore_file, GITIGNORE_CONTENT)
        .await
        .map_err(|e| StorageError::io(&gitignore_file, e))?;

    Ok(InitResult {
        ghost_dir,
        config_file,
        issues_dir,
        agents_file,
        gitignore_file,
    })
}

/// Check if a directory has been initialized with ghost.
///
/// Returns `true` if the `.ghost/` directory exists.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(GHOST_DIR_NAME).exists()
}

/// Find the ghost root directory by searching up the directory tree.
///
/// Starts from the given directory and traverses parent directories
/// until a `.ghost/` directory is found, the root is reached, or
/// the maximum traversal depth is exceeded.
///
/// # Returns
///
/// Returns `Some(path)` with the directory containing `.ghost/`,
/// or `None` if no ghost repository is found within the depth limit.
pub fn find_ghost_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(GHOST_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
