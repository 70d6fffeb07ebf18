//! Full offline hydration

use super::{Origin, ServiceWorker};
use crate::error::SwsyncResult;
use crate::http::Request;
use crate::manifest::ResourceManifest;
use crate::storage::add_all;
use std::collections::BTreeSet;
use tracing::info;

/// Manifest keys with no entry among `cached`, in manifest order
pub fn missing_resources(
    origin: &Origin,
    manifest: &ResourceManifest,
    cached: &[Request],
) -> Vec<String> {
    let present: BTreeSet<String> = cached
        .iter()
        .filter_map(|request| origin.cache_key(&request.url))
        .collect();

    manifest
        .keys()
        .filter(|key| !present.contains(*key))
        .map(str::to_string)
        .collect()
}

impl ServiceWorker {
    /// Fetch and cache every manifest resource not yet in the content cache.
    ///
    /// One failed fetch aborts the whole batch and nothing is stored.
    pub async fn download_offline(&self) -> SwsyncResult<usize> {
        let ctx = &self.ctx;
        let content = self.open(&ctx.names.content).await?;
        let cached = content.keys().await?;

        let missing = missing_resources(&ctx.origin, &ctx.manifest.resources, &cached);
        let requests = missing
            .iter()
            .map(|key| ctx.origin.resolve(key).map(Request::get))
            .collect::<SwsyncResult<Vec<_>>>()?;

        let added = add_all(&*content, &*ctx.fetcher, requests).await?;
        info!("Hydrated {} missing resources", added);
        ctx.journal
            .record("cache.hydrated", &serde_json::json!({ "added": added }))
            .await;
        Ok(added)
    }
}
