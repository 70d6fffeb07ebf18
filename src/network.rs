//! Network access for the worker
//!
//! The worker never talks to the network directly; it goes through a
//! `Fetcher` so tests can script responses and failures.

use crate::config::schema::NetworkConfig;
use crate::error::{SwsyncError, SwsyncResult};
use crate::http::{status_text_for, CacheMode, Method, Request, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Performs network fetches on behalf of the worker
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request from the network.
    ///
    /// Any HTTP status is a successful fetch; only transport failures
    /// (DNS, connection, timeout, oversized body) are errors.
    async fn fetch(&self, request: &Request) -> SwsyncResult<Response>;
}

/// Blocking ureq client driven from the tokio blocking pool
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher from network configuration
    pub fn new(config: &NetworkConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_mb.saturating_mul(1024 * 1024),
        }
    }

    fn fetch_blocking(&self, request: &Request) -> SwsyncResult<Response> {
        let url = request.url_str();
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.push(("User-Agent".to_string(), self.user_agent.clone()));
        if request.cache == CacheMode::Reload {
            headers.push(("Cache-Control".to_string(), "no-cache".to_string()));
            headers.push(("Pragma".to_string(), "no-cache".to_string()));
        }

        let result = match request.method {
            Method::Get => with_headers(self.agent.get(url), &headers).call(),
            Method::Head => with_headers(self.agent.head(url), &headers).call(),
            Method::Delete => with_headers(self.agent.delete(url), &headers).call(),
            Method::Options => with_headers(self.agent.options(url), &headers).call(),
            Method::Post => send(with_headers(self.agent.post(url), &headers), request),
            Method::Put => send(with_headers(self.agent.put(url), &headers), request),
            Method::Patch => send(with_headers(self.agent.patch(url), &headers), request),
        };

        let mut resp = result.map_err(|e| SwsyncError::network(url, e.to_string()))?;

        let status = resp.status().as_u16();
        let status_text = resp
            .status()
            .canonical_reason()
            .unwrap_or_else(|| status_text_for(status))
            .to_string();

        let mut response_headers = BTreeMap::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = if request.method == Method::Head {
            Vec::new()
        } else {
            resp.body_mut()
                .with_config()
                .limit(self.max_body_bytes)
                .read_to_vec()
                .map_err(|e| SwsyncError::network(url, format!("reading body: {}", e)))?
        };

        debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(Response {
            status,
            status_text,
            headers: response_headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &Request,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(body) => builder.send(&body[..]),
        None => builder.send_empty(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> SwsyncResult<Response> {
        let fetcher = self.clone();
        let request = request.clone();
        let url = request.url_str().to_string();

        tokio::task::spawn_blocking(move || fetcher.fetch_blocking(&request))
            .await
            .map_err(|e| SwsyncError::network(url, format!("fetch task failed: {}", e)))?
    }
}
