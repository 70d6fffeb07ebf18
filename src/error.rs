//! Error types for swsync
//!
//! All modules use `SwsyncResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for swsync operations
pub type SwsyncResult<T> = Result<T, SwsyncError>;

/// All errors that can occur in swsync
#[derive(Error, Debug)]
pub enum SwsyncError {
    // Network errors
    #[error("Network request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Request for {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    // Cache storage errors
    #[error("Cache storage error in {partition}: {reason}")]
    CacheStorage { partition: String, reason: String },

    #[error("Invalid cache name: {0}")]
    CacheName(String),

    // Manifest errors
    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("No build manifest configured")]
    ManifestNotConfigured,

    // URL errors
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid origin {0}: only http and https origins can host a worker")]
    InvalidOrigin(String),

    // Lifecycle errors
    #[error("Invalid worker state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No installed worker is waiting to activate (worker is {0})")]
    NotInstalled(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl SwsyncError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache storage error for a partition
    pub fn storage(partition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CacheStorage {
            partition: partition.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error came from the network rather than local state
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotConfigured => {
                Some("Pass --manifest or set worker.manifest in the config file")
            }
            Self::NotInstalled(_) => Some("Run: swsync install"),
            Self::Network { .. } => Some("Check that the origin is reachable"),
            Self::InvalidOrigin(_) => Some("Set worker.origin, e.g. http://localhost:8080"),
            Self::CacheStorage { .. } => Some("Run: swsync clear --yes to reset cached state"),
            _ => None,
        }
    }
}
