//! On-disk cache partitions
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<partition>/<entry>.json   request + response metadata
//! <root>/<partition>/<entry>.body   raw response body
//! ```
//!
//! `<entry>` is derived from the request URL, so a put for the same URL
//! replaces the previous entry in place.

use super::{validate_name, Cache, CacheStorage};
use crate::error::{SwsyncError, SwsyncResult};
use crate::http::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Partitions stored as directories under a root
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bytes used by a partition's files; zero when it does not exist
    pub async fn size_on_disk(&self, name: &str) -> SwsyncResult<u64> {
        validate_name(name)?;
        let mut entries = match fs::read_dir(self.partition_dir(name)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SwsyncError::storage(name, e.to_string())),
        };

        let mut total = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SwsyncError::storage(name, e.to_string()))?
        {
            if let Ok(meta) = entry.metadata().await {
                total += meta.len();
            }
        }
        Ok(total)
    }

    fn partition_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> SwsyncResult<Arc<dyn Cache>> {
        validate_name(name)?;
        let dir = self.partition_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwsyncError::storage(name, format!("creating {}: {}", dir.display(), e)))?;

        Ok(Arc::new(DiskCache {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> SwsyncResult<bool> {
        if validate_name(name).is_err() {
            return Ok(false);
        }
        Ok(self.partition_dir(name).is_dir())
    }

    async fn delete(&self, name: &str) -> SwsyncResult<bool> {
        validate_name(name)?;
        let dir = self.partition_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted partition {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SwsyncError::storage(
                name,
                format!("removing {}: {}", dir.display(), e),
            )),
        }
    }

    async fn keys(&self) -> SwsyncResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(SwsyncError::io("reading cache storage root", e)),
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SwsyncError::io("reading cache storage entry", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Metadata persisted next to each body file
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    request: Request,
    status: u16,
    status_text: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    stored_at: DateTime<Utc>,
}

/// One partition directory
pub struct DiskCache {
    name: String,
    dir: PathBuf,
}

impl DiskCache {
    fn entry_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let digest = Sha256::digest(url.as_bytes());
        let stem = hex::encode(&digest[..16]);
        (
            self.dir.join(format!("{}.json", stem)),
            self.dir.join(format!("{}.body", stem)),
        )
    }

    fn err(&self, action: &str, path: &Path, e: impl std::fmt::Display) -> SwsyncError {
        SwsyncError::storage(&self.name, format!("{} {}: {}", action, path.display(), e))
    }

    async fn read_entry(&self, meta_path: &Path) -> SwsyncResult<Option<StoredEntry>> {
        let content = match fs::read_to_string(meta_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err("reading", meta_path, e)),
        };
        let entry = serde_json::from_str(&content).map_err(|e| self.err("parsing", meta_path, e))?;
        Ok(Some(entry))
    }
}

#[async_trait]
impl Cache for DiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> SwsyncResult<Option<Response>> {
        let (meta_path, body_path) = self.entry_paths(request.url_str());
        let Some(entry) = self.read_entry(&meta_path).await? else {
            return Ok(None);
        };
        if entry.request.url != request.url {
            return Ok(None);
        }

        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Entry {} in {} has no body file", request.url, self.name);
                return Ok(None);
            }
            Err(e) => return Err(self.err("reading", &body_path, e)),
        };

        Ok(Some(Response {
            status: entry.status,
            status_text: entry.status_text,
            headers: entry.headers,
            body,
        }))
    }

    async fn put(&self, request: &Request, response: Response) -> SwsyncResult<()> {
        let (meta_path, body_path) = self.entry_paths(request.url_str());

        let mut stored_request = request.clone();
        stored_request.body = None;
        let entry = StoredEntry {
            request: stored_request,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            stored_at: Utc::now(),
        };
        let meta = serde_json::to_string_pretty(&entry)?;

        // Body first: metadata only appears once its body is complete
        fs::write(&body_path, &response.body)
            .await
            .map_err(|e| self.err("writing", &body_path, e))?;

        let tmp_path = meta_path.with_extension("json.tmp");
        fs::write(&tmp_path, meta)
            .await
            .map_err(|e| self.err("writing", &tmp_path, e))?;
        fs::rename(&tmp_path, &meta_path)
            .await
            .map_err(|e| self.err("renaming", &tmp_path, e))?;

        debug!("Stored {} in {}", request.url, self.name);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> SwsyncResult<bool> {
        let (meta_path, body_path) = self.entry_paths(request.url_str());

        let existed = match fs::remove_file(&meta_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(self.err("removing", &meta_path, e)),
        };
        match fs::remove_file(&body_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(self.err("removing", &body_path, e)),
        }

        Ok(existed)
    }

    async fn keys(&self) -> SwsyncResult<Vec<Request>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(self.err("reading", &self.dir, e)),
        };

        let mut requests = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.err("reading", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stored) = self.read_entry(&path).await? {
                    requests.push(stored.request);
                }
            }
        }

        requests.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));
        Ok(requests)
    }
}
