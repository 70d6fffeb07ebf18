//! Configuration management for swsync

pub mod schema;

pub use schema::Config;

use crate::error::{SwsyncError, SwsyncResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swsync")
            .join("config.toml")
    }

    /// Get the default state directory path
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swsync")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> SwsyncResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> SwsyncResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SwsyncError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| SwsyncError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> SwsyncResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SwsyncError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            SwsyncError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Directory holding cache partitions, the worker record and the journal
    pub fn state_dir(&self) -> PathBuf {
        self.worker
            .state_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_state_dir)
    }

    /// Root of the on-disk cache partitions
    pub fn caches_dir(&self) -> PathBuf {
        self.state_dir().join("caches")
    }

    /// Persisted worker lifecycle record
    pub fn worker_record_path(&self) -> PathBuf {
        self.state_dir().join("worker.json")
    }

    /// Lifecycle event journal
    pub fn journal_path(&self) -> PathBuf {
        self.state_dir().join("journal.log")
    }
}
