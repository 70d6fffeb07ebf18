//! Configuration schema for swsync
//!
//! Configuration is stored at `~/.config/swsync/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Worker instance settings
    pub worker: WorkerConfig,

    /// Cache partition names
    pub caches: CacheNamesConfig,

    /// Network client settings
    pub network: NetworkConfig,

    /// Manifest generation settings
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append lifecycle events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Worker instance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the worker is served from
    pub origin: String,

    /// Build manifest (resources + shell) for the deployed version
    pub manifest: Option<PathBuf>,

    /// Override for the state directory holding caches and the worker record
    pub state_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            manifest: None,
            state_dir: None,
        }
    }
}

/// Names of the three cache partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNamesConfig {
    /// Partition served to the application
    pub content: String,

    /// Staging partition filled during install
    pub temp: String,

    /// Partition holding the last reconciled manifest
    pub manifest: String,

    /// Entry key of the manifest record
    pub manifest_key: String,
}

impl Default for CacheNamesConfig {
    fn default() -> Self {
        Self {
            content: "app-cache".to_string(),
            temp: "app-temp-cache".to_string(),
            manifest: "app-manifest".to_string(),
            manifest_key: "manifest".to_string(),
        }
    }
}

/// Network client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Overall timeout per request in seconds
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Largest response body accepted, in MB
    pub max_body_mb: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("swsync/{}", env!("CARGO_PKG_VERSION")),
            max_body_mb: 64,
        }
    }
}

/// Manifest generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Shell file candidates, in install order; missing ones are skipped
    pub shell: Vec<String>,

    /// Paths or directory prefixes never fingerprinted
    pub exclude: Vec<String>,

    /// Fingerprint dot-files and dot-directories
    pub include_hidden: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            shell: vec![
                "main.dart.js".to_string(),
                "index.html".to_string(),
                "flutter_bootstrap.js".to_string(),
                "assets/AssetManifest.bin.json".to_string(),
                "assets/FontManifest.json".to_string(),
            ],
            exclude: vec![
                "flutter_service_worker.js".to_string(),
                crate::manifest::MANIFEST_FILE.to_string(),
            ],
            include_hidden: false,
        }
    }
}
