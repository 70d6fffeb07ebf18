//! Fetch handler: request interception
//!
//! Only GET requests for keys listed in the manifest are intercepted. The
//! entry document (`/`) is served online-first so returning users see new
//! deployments; everything else is cache-first with lazy population.
//! Cache lookups use the canonical resource URL, so `a.js?v=1` and `a.js`
//! share one entry.

use super::ServiceWorker;
use crate::error::SwsyncResult;
use crate::http::{Method, Request, Response};
use crate::manifest::ROOT_KEY;
use crate::storage::Cache;
use serde::Serialize;
use tracing::{debug, warn};

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
        }
    }
}

/// What the worker did with a fetch event
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the default network path handles the request
    Passthrough,
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchOutcome {
    fn respond(response: Response, source: ResponseSource) -> Self {
        Self::Respond { response, source }
    }
}

impl ServiceWorker {
    /// Handle a fetch event.
    ///
    /// Returns `Err` only when a network failure cannot be answered from the
    /// cache, or the content partition itself fails.
    pub async fn handle_fetch(&self, request: &Request) -> SwsyncResult<FetchOutcome> {
        let ctx = &self.ctx;
        if request.method != Method::Get {
            return Ok(FetchOutcome::Passthrough);
        }

        let Some(key) = ctx.origin.route_key(&request.url) else {
            debug!("Passthrough cross-origin {}", request.url);
            return Ok(FetchOutcome::Passthrough);
        };
        if !ctx.manifest.resources.contains_key(&key) {
            debug!("Passthrough {} (not in manifest)", key);
            return Ok(FetchOutcome::Passthrough);
        }

        let cache_request = Request {
            url: ctx.origin.resolve(&key)?,
            ..request.clone()
        };

        if key == ROOT_KEY {
            self.online_first(request, &cache_request).await
        } else {
            self.cache_first(request, &cache_request).await
        }
    }

    /// Network first; store every network response, fall back to the cache
    /// when the network fails.
    async fn online_first(
        &self,
        request: &Request,
        cache_request: &Request,
    ) -> SwsyncResult<FetchOutcome> {
        let content = self.open(&self.ctx.names.content).await?;

        match self.ctx.fetcher.fetch(request).await {
            Ok(response) => {
                store(&*content, cache_request, &response).await;
                Ok(FetchOutcome::respond(response, ResponseSource::Network))
            }
            Err(fetch_err) => match content.match_request(cache_request).await {
                Ok(Some(cached)) => {
                    debug!("Network failed for {}, serving cached copy", request.url);
                    Ok(FetchOutcome::respond(cached, ResponseSource::Cache))
                }
                Ok(None) => Err(fetch_err),
                Err(cache_err) => {
                    warn!("Cache lookup failed for {}: {}", request.url, cache_err);
                    Err(fetch_err)
                }
            },
        }
    }

    /// Cache first; on a miss fetch and store ok responses only
    async fn cache_first(
        &self,
        request: &Request,
        cache_request: &Request,
    ) -> SwsyncResult<FetchOutcome> {
        let content = self.open(&self.ctx.names.content).await?;

        if let Some(cached) = content.match_request(cache_request).await? {
            return Ok(FetchOutcome::respond(cached, ResponseSource::Cache));
        }

        let response = self.ctx.fetcher.fetch(request).await?;
        if response.ok() {
            store(&*content, cache_request, &response).await;
        } else {
            debug!("Not caching {} (HTTP {})", request.url, response.status);
        }
        Ok(FetchOutcome::respond(response, ResponseSource::Network))
    }
}

/// Lazy cache write; failures leave the response unaffected
async fn store(cache: &dyn Cache, request: &Request, response: &Response) {
    if let Err(e) = cache.put(request, response.clone()).await {
        warn!("Failed to cache {}: {}", request.url, e);
    }
}
