//! Resource manifest and application-shell file list
//!
//! A build emits one JSON document pairing every servable path with a
//! content fingerprint, plus the ordered list of shell files that must be
//! present before the application can boot offline. The worker treats both
//! as constants for its lifetime; the previous deployment's manifest is
//! persisted in the manifest partition and diffed against on activation.

pub mod generate;

pub use generate::{fingerprint, generate};

use crate::error::{SwsyncError, SwsyncResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Key under which the entry document is served
pub const ROOT_KEY: &str = "/";

/// Default file name of a generated build manifest
pub const MANIFEST_FILE: &str = "swsync-manifest.json";

/// Mapping from resource path to content fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(BTreeMap<String, String>);

impl ResourceManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON object form (`{"path": "fingerprint", ...}`)
    pub fn parse(content: &str) -> SwsyncResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a manifest file: either the flat object form or a build manifest,
    /// whose `resources` are taken
    pub async fn from_file(path: &Path) -> SwsyncResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            SwsyncError::io(format!("reading manifest {}", path.display()), e)
        })?;

        let invalid = |e: serde_json::Error| SwsyncError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&content).map_err(invalid)?;
        match value.get("resources") {
            Some(resources) if resources.is_object() => {
                serde_json::from_value(resources.clone()).map_err(invalid)
            }
            _ => serde_json::from_value(value).map_err(invalid),
        }
    }

    /// Serialize to the compact JSON object form stored in the manifest partition
    pub fn to_json(&self) -> SwsyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Insert or replace a fingerprint
    pub fn insert(&mut self, key: impl Into<String>, fingerprint: impl Into<String>) {
        self.0.insert(key.into(), fingerprint.into());
    }

    /// Fingerprint recorded for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a cached copy of `key` made under `previous` may be kept.
    ///
    /// `self` is the incoming manifest. A key survives only if it is still
    /// listed and its fingerprint is unchanged since `previous`.
    pub fn is_reusable(&self, previous: &ResourceManifest, key: &str) -> bool {
        match self.get(key) {
            Some(current) => previous.get(key) == Some(current),
            None => false,
        }
    }

    /// Compare a previous manifest (`self`) against the next one
    pub fn diff(&self, next: &ResourceManifest) -> ManifestDiff {
        let mut diff = ManifestDiff::default();

        for (key, fp) in next.iter() {
            match self.get(key) {
                Some(old) if old == fp => diff.unchanged.push(key.to_string()),
                Some(_) => diff.changed.push(key.to_string()),
                None => diff.added.push(key.to_string()),
            }
        }
        diff.removed = self
            .keys()
            .filter(|k| !next.contains_key(k))
            .map(str::to_string)
            .collect();

        diff
    }
}

impl FromIterator<(String, String)> for ResourceManifest {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Key-level comparison of two manifests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    /// Same fingerprint in both; cached copies are kept across activation
    pub unchanged: Vec<String>,
    /// Present in both with different fingerprints; evicted on activation
    pub changed: Vec<String>,
    /// Only in the next manifest
    pub added: Vec<String>,
    /// Only in the previous manifest; evicted on activation
    pub removed: Vec<String>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ordered list of resource paths required for first paint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellFiles(Vec<String>);

impl ShellFiles {
    pub fn new(files: Vec<String>) -> Self {
        Self(files)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The build-time constants baked into one worker version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub resources: ResourceManifest,
    #[serde(default)]
    pub shell: ShellFiles,
}

impl BuildManifest {
    pub fn new(resources: ResourceManifest, shell: ShellFiles) -> Self {
        Self { resources, shell }
    }

    /// Parse and validate a build manifest file
    pub async fn from_file(path: &Path) -> SwsyncResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            SwsyncError::io(format!("reading build manifest {}", path.display()), e)
        })?;

        Self::parse(&content).map_err(|e| SwsyncError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse and validate a build manifest from JSON
    pub fn parse(content: &str) -> SwsyncResult<Self> {
        let manifest: Self = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Every shell file must be a resource key, listed once
    pub fn validate(&self) -> SwsyncResult<()> {
        let mut seen = std::collections::BTreeSet::new();
        for file in self.shell.iter() {
            if !self.resources.contains_key(file) {
                return Err(SwsyncError::ManifestInvalid {
                    path: "build manifest".into(),
                    reason: format!("shell file '{}' is not a listed resource", file),
                });
            }
            if !seen.insert(file) {
                return Err(SwsyncError::ManifestInvalid {
                    path: "build manifest".into(),
                    reason: format!("shell file '{}' is listed twice", file),
                });
            }
        }
        Ok(())
    }

    /// Write the manifest as pretty JSON
    pub async fn save(&self, path: &Path) -> SwsyncResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    SwsyncError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await.map_err(|e| {
            SwsyncError::io(format!("writing build manifest {}", path.display()), e)
        })
    }
}
