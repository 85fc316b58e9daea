//! Application context for CLI command execution.
//!
//! `App` locates the `.ghost/` directory, loads the configuration, opens the
//! file store and runs a pending legacy migration before any command touches
//! the issues.
//!
//! `max-agents` from `config.yaml` only seeds a missing `agents.json`; once
//! the registry exists its own `maxAgents` is authoritative.
//!
//! # Example
//!
//! ```no_run
//! use ghost::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = App::from_directory(Path::new(".")).await?;
//!     let available = app.issues().get_available_issues().await?;
//!     println!("{} issues ready to start", available.len());
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_ghost_root;
use crate::config::GhostConfig;
use crate::error::{ConfigError, Result};
use crate::service::IssueService;
use crate::storage::Layout;
use crate::storage::file::FileStorage;
use crate::storage::migration::{Migration, MigrationReport};
use std::path::{Path, PathBuf};
use tracing::info;

/// Application context for CLI operations.
pub struct App {
    /// The persistent record store
    storage: FileStorage,

    /// Directory containing `.ghost/`
    root: PathBuf,

    /// Loaded configuration
    config: GhostConfig,

    /// What the startup migration did
    migration_report: MigrationReport,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("migrated", &self.migration_report.migrated)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App instance from the given working directory.
    ///
    /// Searches up the directory tree to find a `.ghost/` directory, loads
    /// configuration, migrates a legacy store if one is present and
    /// initializes storage. The migration runs first so a legacy agent
    /// registry is carried over instead of replaced by a default one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No ghost repository is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage initialization or the migration fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_ghost_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let layout = Layout::new(&root);

        let config = GhostConfig::load(&layout.config_file()).await?;

        let mut storage =
            FileStorage::open(&root, config.cache_capacity).with_max_agents(config.max_agents);
        let migration_report = Migration::new(&root)
            .with_max_depth(config.max_depth)
            .migrate(&mut storage)
            .await?;
        if migration_report.ran() {
            info!(migrated = migration_report.migrated, "Migrated legacy issue store");
        }
        storage.init().await?;

        Ok(Self {
            storage,
            root,
            config,
            migration_report,
        })
    }

    /// Issue service over the file store, honoring the configured depth limit.
    pub fn issues(&mut self) -> IssueService<'_> {
        IssueService::new(&mut self.storage).with_max_depth(self.config.max_depth)
    }

    /// The underlying file store.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Directory containing `.ghost/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded configuration.
    pub fn config(&self) -> &GhostConfig {
        &self.config
    }

    /// Outcome of the startup migration (empty when nothing was migrated).
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration_report
    }
}
