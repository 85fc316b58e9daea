//! On-disk layout of a `.ghost` directory.
//!
//! ```text
//! <root>/.ghost/config.yaml
//! <root>/.ghost/agents.json
//! <root>/.ghost/issues/<id>/issue.json
//! <root>/.ghost/issues/<parent-id>/<child-id>/issue.json
//! <root>/.ghost/backup/issues-<timestamp>.json
//! <root>/.ghost/data/issues.json        (legacy)
//! <root>/.ghost/data/agents.json        (legacy)
//! ```

use std::path::{Path, PathBuf};

/// Name of the ghost directory
pub const GHOST_DIR_NAME: &str = ".ghost";

/// Name of the issue tree directory
pub const ISSUES_DIR_NAME: &str = "issues";

/// Name of the record file inside each issue directory
pub const ISSUE_FILE_NAME: &str = "issue.json";

/// Name of the agent registry file
pub const AGENTS_FILE_NAME: &str = "agents.json";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the gitignore file within `.ghost`
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Directory of the legacy flat store
pub const LEGACY_DATA_DIR_NAME: &str = "data";

/// Name of the legacy flat issue file
pub const LEGACY_ISSUES_FILE_NAME: &str = "issues.json";

/// Directory receiving migration backups
pub const BACKUP_DIR_NAME: &str = "backup";

/// Resolves every well-known path below a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout for the project rooted at `root` (the directory containing `.ghost`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.ghost`
    pub fn ghost_dir(&self) -> PathBuf {
        self.root.join(GHOST_DIR_NAME)
    }

    /// `<root>/.ghost/issues`
    pub fn issues_dir(&self) -> PathBuf {
        self.ghost_dir().join(ISSUES_DIR_NAME)
    }

    /// `<root>/.ghost/agents.json`
    pub fn agents_file(&self) -> PathBuf {
        self.ghost_dir().join(AGENTS_FILE_NAME)
    }

    /// `<root>/.ghost/config.yaml`
    pub fn config_file(&self) -> PathBuf {
        self.ghost_dir().join(CONFIG_FILE_NAME)
    }

    /// `<root>/.ghost/.gitignore`
    pub fn gitignore_file(&self) -> PathBuf {
        self.ghost_dir().join(GITIGNORE_FILE_NAME)
    }

    /// `<root>/.ghost/data/issues.json`
    pub fn legacy_issues_file(&self) -> PathBuf {
        self.ghost_dir()
            .join(LEGACY_DATA_DIR_NAME)
            .join(LEGACY_ISSUES_FILE_NAME)
    }

    /// `<root>/.ghost/data/agents.json`
    pub fn legacy_agents_file(&self) -> PathBuf {
        self.ghost_dir()
            .join(LEGACY_DATA_DIR_NAME)
            .join(AGENTS_FILE_NAME)
    }

    /// `<root>/.ghost/backup`
    pub fn backup_dir(&self) -> PathBuf {
        self.ghost_dir().join(BACKUP_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_under_ghost_dir() {
        let layout = Layout::new("/work");
        assert_eq!(layout.issues_dir(), PathBuf::from("/work/.ghost/issues"));
        assert_eq!(layout.agents_file(), PathBuf::from("/work/.ghost/agents.json"));
        assert_eq!(
            layout.legacy_issues_file(),
            PathBuf::from("/work/.ghost/data/issues.json")
        );
        assert_eq!(layout.backup_dir(), PathBuf::from("/work/.ghost/backup"));
    }
}
