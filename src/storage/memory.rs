//! In-memory cache partitions
//!
//! Used for deterministic tests and for embedding the worker without a
//! persistent backend.

use super::{validate_name, Cache, CacheStorage};
use crate::error::SwsyncResult;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Partitions held in process memory
#[derive(Default)]
pub struct MemoryStorage {
    caches: RwLock<BTreeMap<String, Arc<MemoryCache>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> SwsyncResult<Arc<dyn Cache>> {
        validate_name(name)?;
        let mut caches = self.caches.write().await;
        let cache = caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::new(name)))
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> SwsyncResult<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> SwsyncResult<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn keys(&self) -> SwsyncResult<Vec<String>> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }
}

/// A single in-memory partition keyed by request URL
pub struct MemoryCache {
    name: String,
    entries: RwLock<BTreeMap<String, (Request, Response)>>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> SwsyncResult<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(request.url_str())
            .map(|(_, response)| response.clone()))
    }

    async fn put(&self, request: &Request, response: Response) -> SwsyncResult<()> {
        let mut stored = request.clone();
        stored.body = None;
        self.entries
            .write()
            .await
            .insert(request.url_str().to_string(), (stored, response));
        Ok(())
    }

    async fn delete(&self, request: &Request) -> SwsyncResult<bool> {
        Ok(self
            .entries
            .write()
            .await
            .remove(request.url_str())
            .is_some())
    }

    async fn keys(&self) -> SwsyncResult<Vec<Request>> {
        let entries = self.entries.read().await;
        Ok(entries.values().map(|(request, _)| request.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get(Url::parse("http://localhost:8080/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn put_match_delete() {
        let storage = MemoryStorage::new();
        let cache = storage.open("app-cache").await.unwrap();

        cache
            .put(&request("main.dart.js"), Response::new(200).with_body("js"))
            .await
            .unwrap();

        let hit = cache.match_request(&request("main.dart.js")).await.unwrap();
        assert_eq!(hit.unwrap().body, b"js");
        assert!(cache.match_request(&request("other.js")).await.unwrap().is_none());

        assert!(cache.delete(&request("main.dart.js")).await.unwrap());
        assert!(!cache.delete(&request("main.dart.js")).await.unwrap());
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_overwrites_same_url() {
        let storage = MemoryStorage::new();
        let cache = storage.open("app-cache").await.unwrap();

        cache.put(&request("a.js"), Response::new(200).with_body("old")).await.unwrap();
        cache.put(&request("a.js"), Response::new(200).with_body("new")).await.unwrap();

        assert_eq!(cache.keys().await.unwrap().len(), 1);
        let hit = cache.match_request(&request("a.js")).await.unwrap().unwrap();
        assert_eq!(hit.body, b"new");
    }

    #[tokio::test]
    async fn open_returns_same_partition() {
        let storage = MemoryStorage::new();
        let first = storage.open("app-cache").await.unwrap();
        first.put(&request("a.js"), Response::new(200)).await.unwrap();

        let second = storage.open("app-cache").await.unwrap();
        assert_eq!(second.keys().await.unwrap().len(), 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["app-cache"]);
    }

    #[tokio::test]
    async fn delete_detaches_and_reopen_is_empty() {
        let storage = MemoryStorage::new();
        let cache = storage.open("app-cache").await.unwrap();
        cache.put(&request("a.js"), Response::new(200)).await.unwrap();

        assert!(storage.delete("app-cache").await.unwrap());
        assert!(!storage.has("app-cache").await.unwrap());
        assert!(!storage.delete("app-cache").await.unwrap());

        let reopened = storage.open("app-cache").await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_rejects_bad_name() {
        let storage = MemoryStorage::new();
        assert!(storage.open("../escape").await.is_err());
    }
}
