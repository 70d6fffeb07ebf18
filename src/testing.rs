//! Shared fixtures for unit tests

use crate::error::{SwsyncError, SwsyncResult};
use crate::http::{Request, Response};
use crate::journal::Journal;
use crate::manifest::{BuildManifest, ResourceManifest, ShellFiles};
use crate::network::Fetcher;
use crate::storage::{Cache, CacheNames, CacheStorage, MemoryStorage};
use crate::worker::keys::Origin;
use crate::worker::scope::LocalScope;
use crate::worker::{ServiceWorker, WorkerContext};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const ORIGIN: &str = "http://localhost:8080";

/// Scripted network: known URLs answer 200 with their body, unknown URLs 404
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<BTreeMap<String, Response>>,
    unreachable: Mutex<BTreeSet<String>>,
    offline: AtomicBool,
    requests: Mutex<Vec<Request>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: &str) -> Self {
        self.set(url, body);
        self
    }

    pub fn serve_response(self, url: &str, response: Response) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), response);
        self
    }

    /// Fetches of `url` fail with a network error
    pub fn offline(self, url: &str) -> Self {
        self.unreachable.lock().unwrap().insert(url.to_string());
        self
    }

    /// Replace the body served for `url`
    pub fn set(&self, url: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::new(200).with_body(body));
    }

    /// Toggle a network outage for every URL
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches issued for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url_str() == url)
            .count()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> SwsyncResult<Response> {
        self.requests.lock().unwrap().push(request.clone());
        let url = request.url_str();

        if self.offline.load(Ordering::SeqCst) || self.unreachable.lock().unwrap().contains(url) {
            return Err(SwsyncError::network(url, "connection refused"));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Response::new(404)))
    }
}

/// Memory storage whose `failing` partition rejects writes and deletes
pub struct FailingStorage {
    pub inner: MemoryStorage,
    failing: String,
}

impl FailingStorage {
    pub fn new(failing: &str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            failing: failing.to_string(),
        }
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, name: &str) -> SwsyncResult<Arc<dyn Cache>> {
        let cache = self.inner.open(name).await?;
        if name == self.failing {
            return Ok(Arc::new(FailingCache { inner: cache }));
        }
        Ok(cache)
    }

    async fn has(&self, name: &str) -> SwsyncResult<bool> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> SwsyncResult<bool> {
        self.inner.delete(name).await
    }

    async fn keys(&self) -> SwsyncResult<Vec<String>> {
        self.inner.keys().await
    }
}

struct FailingCache {
    inner: Arc<dyn Cache>,
}

#[async_trait]
impl Cache for FailingCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn match_request(&self, request: &Request) -> SwsyncResult<Option<Response>> {
        self.inner.match_request(request).await
    }

    async fn put(&self, _request: &Request, _response: Response) -> SwsyncResult<()> {
        Err(SwsyncError::storage(self.inner.name(), "quota exceeded"))
    }

    async fn delete(&self, _request: &Request) -> SwsyncResult<bool> {
        Err(SwsyncError::storage(self.inner.name(), "quota exceeded"))
    }

    async fn keys(&self) -> SwsyncResult<Vec<Request>> {
        self.inner.keys().await
    }
}

/// Canonical URL of a resource key under the test origin
pub fn resource_url(key: &str) -> String {
    Origin::parse(ORIGIN)
        .and_then(|origin| origin.resolve(key))
        .unwrap()
        .to_string()
}

/// Build manifest from `(key, fingerprint)` pairs and a shell list
pub fn build(resources: &[(&str, &str)], shell: &[&str]) -> BuildManifest {
    let resources: ResourceManifest = resources
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BuildManifest::new(
        resources,
        ShellFiles::new(shell.iter().map(|s| s.to_string()).collect()),
    )
}

/// Worker over the given storage and fetcher with an in-memory scope
pub fn worker(
    manifest: BuildManifest,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<StubFetcher>,
) -> ServiceWorker {
    let context = WorkerContext {
        origin: Origin::parse(ORIGIN).unwrap(),
        manifest,
        names: CacheNames::default(),
        storage,
        fetcher,
        scope: Arc::new(LocalScope::new()),
        journal: Journal::disabled(),
    };
    ServiceWorker::new(context)
}

/// Content cache body for a resource key, if cached
pub async fn cached_body(storage: &dyn CacheStorage, key: &str) -> Option<String> {
    let cache = storage.open(&CacheNames::default().content).await.unwrap();
    let request = Request::get(Url::parse(&resource_url(key)).unwrap());
    cache
        .match_request(&request)
        .await
        .unwrap()
        .map(|r| String::from_utf8(r.body).unwrap())
}

/// Resource keys currently in the content cache, sorted
pub async fn cached_keys(storage: &dyn CacheStorage) -> Vec<String> {
    let origin = Origin::parse(ORIGIN).unwrap();
    let cache = storage.open(&CacheNames::default().content).await.unwrap();
    let mut keys: Vec<String> = cache
        .keys()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| origin.cache_key(&r.url))
        .collect();
    keys.sort();
    keys
}
