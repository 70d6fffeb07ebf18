//! Cache partitions
//!
//! Provides the named key→response stores the worker owns. Backends
//! implement two traits mirroring the browser cache API:
//! - `CacheStorage`: open/delete/list named partitions
//! - `Cache`: match/put/delete/list entries of one partition
//!
//! Entries are keyed by request URL. Deleting a partition detaches any
//! handle already open on it; callers re-open after a delete.

pub mod disk;
pub mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::config::schema::CacheNamesConfig;
use crate::error::{SwsyncError, SwsyncResult};
use crate::http::{Request, Response};
use crate::network::Fetcher;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Named set of cache partitions
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it empty if it does not exist
    async fn open(&self, name: &str) -> SwsyncResult<Arc<dyn Cache>>;

    /// Check if a partition exists
    async fn has(&self, name: &str) -> SwsyncResult<bool>;

    /// Delete a partition and all its entries; returns whether it existed
    async fn delete(&self, name: &str) -> SwsyncResult<bool>;

    /// Names of all existing partitions
    async fn keys(&self) -> SwsyncResult<Vec<String>>;
}

/// One key→response partition
#[async_trait]
pub trait Cache: Send + Sync {
    /// Partition name
    fn name(&self) -> &str;

    /// Look up the response stored for a request URL
    async fn match_request(&self, request: &Request) -> SwsyncResult<Option<Response>>;

    /// Store a response, replacing any entry for the same URL
    async fn put(&self, request: &Request, response: Response) -> SwsyncResult<()>;

    /// Remove the entry for a request URL; returns whether it existed
    async fn delete(&self, request: &Request) -> SwsyncResult<bool>;

    /// Requests of all stored entries
    async fn keys(&self) -> SwsyncResult<Vec<Request>>;
}

/// Fetch every request and store the responses, all or nothing.
///
/// Requests are fetched concurrently. If any fetch fails or returns a
/// non-ok status nothing is stored and the first failure is returned.
pub async fn add_all(
    cache: &dyn Cache,
    fetcher: &dyn Fetcher,
    requests: Vec<Request>,
) -> SwsyncResult<usize> {
    let fetches = requests.iter().map(|request| async move {
        let response = fetcher.fetch(request).await?;
        if !response.ok() {
            return Err(SwsyncError::HttpStatus {
                url: request.url_str().to_string(),
                status: response.status,
            });
        }
        Ok(response)
    });
    let responses = try_join_all(fetches).await?;

    let count = responses.len();
    for (request, response) in requests.iter().zip(responses) {
        cache.put(request, response).await?;
    }

    debug!("Added {} entries to {}", count, cache.name());
    Ok(count)
}

/// Names of the three partitions plus the manifest record key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub content: String,
    pub temp: String,
    pub manifest: String,
    pub manifest_key: String,
}

impl CacheNames {
    /// All partition names, content first
    pub fn partitions(&self) -> [&str; 3] {
        [
            self.content.as_str(),
            self.temp.as_str(),
            self.manifest.as_str(),
        ]
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::from(&CacheNamesConfig::default())
    }
}

impl From<&CacheNamesConfig> for CacheNames {
    fn from(config: &CacheNamesConfig) -> Self {
        Self {
            content: config.content.clone(),
            temp: config.temp.clone(),
            manifest: config.manifest.clone(),
            manifest_key: config.manifest_key.clone(),
        }
    }
}

/// Reject partition names that cannot double as a directory name
pub(crate) fn validate_name(name: &str) -> SwsyncResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(SwsyncError::CacheName(name.to_string()))
    }
}
