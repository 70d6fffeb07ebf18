//! CLI command implementations

pub mod activate;
pub mod clear;
pub mod config;
pub mod fetch;
pub mod install;
pub mod manifest;
pub mod message;
pub mod status;

pub use activate::execute as activate;
pub use clear::execute as clear;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use manifest::execute as manifest;
pub use message::execute as message;
pub use status::execute as status;

use crate::config::Config;
use crate::error::{SwsyncError, SwsyncResult};
use crate::journal::Journal;
use crate::manifest::BuildManifest;
use crate::network::HttpFetcher;
use crate::storage::{CacheNames, DiskStorage};
use crate::worker::{Origin, PersistentScope, ServiceWorker, WorkerContext};
use std::sync::Arc;
use tracing::debug;

/// The build manifest named by the configuration
pub(crate) async fn load_manifest(config: &Config) -> SwsyncResult<BuildManifest> {
    let path = config
        .worker
        .manifest
        .as_ref()
        .ok_or(SwsyncError::ManifestNotConfigured)?;
    if !path.exists() {
        return Err(SwsyncError::PathNotFound(path.clone()));
    }
    BuildManifest::from_file(path).await
}

/// Build a worker over the on-disk state directory and the real network
pub(crate) async fn open_worker(
    config: &Config,
    manifest: BuildManifest,
) -> SwsyncResult<ServiceWorker> {
    let origin = Origin::parse(&config.worker.origin)?;
    let state_dir = config.state_dir();
    debug!("Using state directory {}", state_dir.display());

    let context = WorkerContext {
        origin,
        manifest,
        names: CacheNames::from(&config.caches),
        storage: Arc::new(DiskStorage::new(config.caches_dir())),
        fetcher: Arc::new(HttpFetcher::new(&config.network)),
        scope: Arc::new(PersistentScope::load(config.worker_record_path()).await?),
        journal: Journal::new(config),
    };
    Ok(ServiceWorker::new(context))
}

/// Human-readable byte count
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
