//! Configuration management for ghost.
//!
//! Configuration lives in `.ghost/config.yaml`. A missing file is not an
//! error: every setting has a default.
//!
//! ```yaml
//! cache-capacity: 200
//! max-agents: 10
//! max-depth: 4
//! ```

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::domain::{DEFAULT_MAX_AGENTS, MAX_HIERARCHY_DEPTH};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Configuration file structure for ghost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct GhostConfig {
    /// Entries kept in each storage cache
    pub cache_capacity: usize,

    /// Maximum number of agents working at the same time
    pub max_agents: usize,

    /// Maximum hierarchy depth, counting a root issue as level 1
    pub max_depth: usize,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_agents: DEFAULT_MAX_AGENTS,
            max_depth: MAX_HIERARCHY_DEPTH,
        }
    }
}

impl GhostConfig {
    /// Load configuration from a file, falling back to defaults when it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the file is not valid YAML or a value
    /// is out of range, and `ConfigError::Io` if it exists but cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e).into()),
        };

        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("YAML error: {e}")))?;
        fs::write(path, content).await.map_err(ConfigError::Io)?;
        Ok(())
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_HIERARCHY_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "max-depth must be between 1 and {MAX_HIERARCHY_DEPTH}, got {}",
                self.max_depth
            ))
            .into());
        }
        if self.max_agents == 0 {
            return Err(ConfigError::Invalid("max-agents must be at least 1".to_string()).into());
        }
        Ok(())
    }
}
