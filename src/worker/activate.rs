//! Activate handler: reconcile the content partition with a new manifest
//!
//! With no previous manifest record the content partition is rebuilt from
//! the staged shell files alone. Otherwise every cached entry whose key
//! left the manifest, or whose fingerprint changed, is evicted; unchanged
//! entries stay. Staged files then overwrite whatever survived.
//!
//! Any storage failure during reconciliation wipes all three partitions.

use super::{Origin, ServiceWorker, WorkerState};
use crate::error::SwsyncResult;
use crate::http::Request;
use crate::manifest::ResourceManifest;
use crate::storage::Cache;
use serde::Serialize;
use tracing::{debug, error, info};

/// How an activation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationOutcome {
    /// No previous manifest; content seeded from the staged files only
    Fresh,
    /// Content reconciled against the previous manifest
    Upgraded,
    /// Reconciliation failed and every partition was deleted
    Wiped,
}

/// Summary of one activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub outcome: ActivationOutcome,
    /// Cached entries kept from the previous version
    pub retained: usize,
    /// Keys of evicted entries
    pub evicted: Vec<String>,
    /// Entries copied from the temp partition
    pub promoted: usize,
    /// Failure that caused a wipe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivationReport {
    fn wiped(error: String) -> Self {
        Self {
            outcome: ActivationOutcome::Wiped,
            retained: 0,
            evicted: vec![],
            promoted: 0,
            error: Some(error),
        }
    }
}

/// Which cached requests survive an upgrade
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    pub retain: Vec<Request>,
    /// Requests to delete, with their resource key
    pub evict: Vec<(String, Request)>,
}

/// Split cached requests into kept and evicted.
///
/// An entry is kept only if its key is in `next` with the same fingerprint
/// it had in `previous`. Entries outside the origin are always evicted.
pub fn plan_eviction(
    origin: &Origin,
    previous: &ResourceManifest,
    next: &ResourceManifest,
    cached: Vec<Request>,
) -> EvictionPlan {
    let mut plan = EvictionPlan::default();

    for request in cached {
        match origin.cache_key(&request.url) {
            Some(key) if next.is_reusable(previous, &key) => plan.retain.push(request),
            Some(key) => plan.evict.push((key, request)),
            None => plan.evict.push((request.url_str().to_string(), request)),
        }
    }

    plan
}

impl ServiceWorker {
    /// Reconcile caches for this worker version and take control of clients.
    ///
    /// Reconciliation errors never escape: they are logged, all partitions
    /// are deleted and the report says `Wiped`. Only lifecycle errors (the
    /// worker is not installed) are returned.
    pub async fn activate(&self) -> SwsyncResult<ActivationReport> {
        let ctx = &self.ctx;
        ctx.scope.transition(WorkerState::Activating).await?;

        let report = match self.reconcile().await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to upgrade worker caches: {}", e);
                self.wipe().await;
                ActivationReport::wiped(e.to_string())
            }
        };

        ctx.scope.transition(WorkerState::Activated).await?;
        info!(
            "Activated worker ({:?}): {} retained, {} evicted, {} promoted",
            report.outcome,
            report.retained,
            report.evicted.len(),
            report.promoted
        );
        ctx.journal
            .record(
                "worker.activated",
                &serde_json::to_value(&report).unwrap_or_default(),
            )
            .await;

        Ok(report)
    }

    async fn reconcile(&self) -> SwsyncResult<ActivationReport> {
        let ctx = &self.ctx;
        let names = &ctx.names;
        let next = &ctx.manifest.resources;

        let mut content = self.open(&names.content).await?;
        let temp = self.open(&names.temp).await?;
        let manifest_cache = self.open(&names.manifest).await?;

        let mut report = match self.read_manifest(&*manifest_cache).await? {
            None => {
                debug!("No previous manifest, rebuilding {}", names.content);
                ctx.storage.delete(&names.content).await?;
                content = self.open(&names.content).await?;
                ActivationReport {
                    outcome: ActivationOutcome::Fresh,
                    retained: 0,
                    evicted: vec![],
                    promoted: 0,
                    error: None,
                }
            }
            Some(previous) => {
                let plan = plan_eviction(&ctx.origin, &previous, next, content.keys().await?);
                let mut evicted = Vec::with_capacity(plan.evict.len());
                for (key, request) in plan.evict {
                    debug!("Evicting {}", key);
                    content.delete(&request).await?;
                    evicted.push(key);
                }
                ActivationReport {
                    outcome: ActivationOutcome::Upgraded,
                    retained: plan.retain.len(),
                    evicted,
                    promoted: 0,
                    error: None,
                }
            }
        };

        report.promoted = promote(&*temp, &*content).await?;
        ctx.storage.delete(&names.temp).await?;
        self.write_manifest(&*manifest_cache).await?;
        ctx.scope.claim_clients().await?;

        Ok(report)
    }

    /// Delete all three partitions, continuing past individual failures
    pub(crate) async fn wipe(&self) {
        let ctx = &self.ctx;
        for name in ctx.names.partitions() {
            if let Err(e) = ctx.storage.delete(name).await {
                error!("Failed to delete partition {}: {}", name, e);
            }
        }
        ctx.journal
            .record(
                "cache.wiped",
                &serde_json::json!({ "partitions": ctx.names.partitions() }),
            )
            .await;
    }
}

/// Copy every entry of `from` into `to`, overwriting same-URL entries
async fn promote(from: &dyn Cache, to: &dyn Cache) -> SwsyncResult<usize> {
    let mut promoted = 0;
    for request in from.keys().await? {
        if let Some(response) = from.match_request(&request).await? {
            to.put(&request, response).await?;
            promoted += 1;
        }
    }
    Ok(promoted)
}
