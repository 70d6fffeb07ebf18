//! The cache synchronizer
//!
//! A `ServiceWorker` owns three cache partitions and handles four events:
//!
//! - install: stage the shell files into the temp partition
//! - activate: reconcile the content partition against the previous
//!   manifest and promote the staged files
//! - fetch: serve manifest resources cache-first, the entry document
//!   online-first, and pass everything else through
//! - message: `skipWaiting` and `downloadOffline`
//!
//! Every dependency (storage, network, lifecycle scope, manifest) lives in
//! an explicit `WorkerContext` built once per worker instance.

pub mod activate;
pub mod fetch;
pub mod install;
pub mod keys;
pub mod message;
pub mod offline;
pub mod scope;

pub use activate::{plan_eviction, ActivationOutcome, ActivationReport, EvictionPlan};
pub use fetch::{FetchOutcome, ResponseSource};
pub use keys::Origin;
pub use message::{ControlMessage, MessageOutcome};
pub use offline::missing_resources;
pub use scope::{LocalScope, PersistentScope, ScopeRecord, WorkerScope, WorkerState};

use crate::error::SwsyncResult;
use crate::http::{Request, Response};
use crate::journal::Journal;
use crate::manifest::{BuildManifest, ResourceManifest};
use crate::network::Fetcher;
use crate::storage::{Cache, CacheNames, CacheStorage};
use std::sync::Arc;
use tracing::warn;

/// Everything one worker instance depends on
pub struct WorkerContext {
    /// Origin the worker is served from
    pub origin: Origin,
    /// Resources and shell files of this worker version
    pub manifest: BuildManifest,
    pub names: CacheNames,
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub scope: Arc<dyn WorkerScope>,
    pub journal: Journal,
}

/// Events delivered to a worker
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(String),
}

/// Result of handling one event
#[derive(Debug)]
pub enum EventResult {
    /// Number of shell files staged
    Installed(usize),
    Activated(ActivationReport),
    Fetched(FetchOutcome),
    Message(MessageOutcome),
}

pub struct ServiceWorker {
    ctx: WorkerContext,
}

impl ServiceWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Route an event to its handler
    pub async fn dispatch(&self, event: WorkerEvent) -> SwsyncResult<EventResult> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventResult::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventResult::Activated),
            WorkerEvent::Fetch(request) => {
                self.handle_fetch(&request).await.map(EventResult::Fetched)
            }
            WorkerEvent::Message(data) => {
                self.handle_message(&data).await.map(EventResult::Message)
            }
        }
    }

    /// The manifest persisted by the last successful activation.
    ///
    /// Returns `None` when no record exists or the record cannot be parsed.
    /// Does not create the manifest partition.
    pub async fn stored_manifest(&self) -> SwsyncResult<Option<ResourceManifest>> {
        if !self.ctx.storage.has(&self.ctx.names.manifest).await? {
            return Ok(None);
        }
        let cache = self.open(&self.ctx.names.manifest).await?;
        self.read_manifest(&*cache).await
    }

    async fn open(&self, name: &str) -> SwsyncResult<Arc<dyn Cache>> {
        self.ctx.storage.open(name).await
    }

    /// Request under which the manifest record is stored
    fn manifest_request(&self) -> SwsyncResult<Request> {
        Ok(Request::get(self.ctx.origin.resolve(&self.ctx.names.manifest_key)?))
    }

    async fn read_manifest(&self, cache: &dyn Cache) -> SwsyncResult<Option<ResourceManifest>> {
        let Some(record) = cache.match_request(&self.manifest_request()?).await? else {
            return Ok(None);
        };

        let parsed = String::from_utf8(record.body)
            .map_err(|e| e.to_string())
            .and_then(|body| ResourceManifest::parse(&body).map_err(|e| e.to_string()));
        match parsed {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!("Ignoring unreadable manifest record in {}: {}", cache.name(), e);
                Ok(None)
            }
        }
    }

    async fn write_manifest(&self, cache: &dyn Cache) -> SwsyncResult<()> {
        let record = Response::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(self.ctx.manifest.resources.to_json()?);
        cache.put(&self.manifest_request()?, record).await
    }
}
