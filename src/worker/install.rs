//! Install handler

use super::{ServiceWorker, WorkerState};
use crate::error::SwsyncResult;
use crate::http::Request;
use crate::storage::add_all;
use tracing::{info, warn};

impl ServiceWorker {
    /// Stage every shell file into the temp partition, bypassing the HTTP cache.
    ///
    /// All or nothing: if any shell file fails to fetch, nothing is staged,
    /// the worker becomes redundant and the error is returned. The new
    /// worker skips waiting for old clients either way.
    pub async fn install(&self) -> SwsyncResult<usize> {
        let ctx = &self.ctx;
        ctx.scope.transition(WorkerState::Installing).await?;
        ctx.scope.skip_waiting().await?;

        match self.stage_shell().await {
            Ok(staged) => {
                ctx.scope.transition(WorkerState::Installed).await?;
                info!("Installed worker: staged {} shell files", staged);
                ctx.journal
                    .record(
                        "worker.installed",
                        &serde_json::json!({ "staged": staged, "origin": ctx.origin.to_string() }),
                    )
                    .await;
                Ok(staged)
            }
            Err(e) => {
                warn!("Install failed: {}", e);
                if let Err(state_err) = ctx.scope.transition(WorkerState::Redundant).await {
                    warn!("Failed to mark worker redundant: {}", state_err);
                }
                ctx.journal
                    .record(
                        "worker.install_failed",
                        &serde_json::json!({ "error": e.to_string() }),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn stage_shell(&self) -> SwsyncResult<usize> {
        let ctx = &self.ctx;
        let requests = ctx
            .manifest
            .shell
            .iter()
            .map(|file| ctx.origin.resolve(file).map(Request::reload))
            .collect::<SwsyncResult<Vec<_>>>()?;

        let temp = self.open(&ctx.names.temp).await?;
        add_all(&*temp, &*ctx.fetcher, requests).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwsyncError;
    use crate::http::CacheMode;
    use crate::storage::{CacheStorage, MemoryStorage};
    use crate::testing::{build, resource_url, worker, StubFetcher};
    use std::sync::Arc;

    fn shell_fetcher() -> StubFetcher {
        StubFetcher::new()
            .serve(&resource_url("main.dart.js"), "js-v1")
            .serve(&resource_url("index.html"), "html-v1")
    }

    #[tokio::test]
    async fn install_stages_shell_with_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(shell_fetcher());
        let sw = worker(
            build(
                &[("main.dart.js", "h1"), ("index.html", "h2"), ("icon.png", "h3")],
                &["main.dart.js", "index.html"],
            ),
            storage.clone(),
            fetcher.clone(),
        );

        assert_eq!(sw.install().await.unwrap(), 2);

        let temp = storage.open("app-temp-cache").await.unwrap();
        assert_eq!(temp.keys().await.unwrap().len(), 2);
        assert!(fetcher
            .requests()
            .iter()
            .all(|r| r.cache == CacheMode::Reload));
        // Non-shell resources are not fetched at install
        assert_eq!(fetcher.calls(&resource_url("icon.png")), 0);

        let record = sw.context().scope.record().await;
        assert_eq!(record.state, WorkerState::Installed);
        assert!(record.skip_waiting);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(shell_fetcher().offline(&resource_url("index.html")));
        let sw = worker(
            build(
                &[("main.dart.js", "h1"), ("index.html", "h2")],
                &["main.dart.js", "index.html"],
            ),
            storage.clone(),
            fetcher,
        );

        let err = sw.install().await.unwrap_err();
        assert!(matches!(err, SwsyncError::Network { .. }));

        let temp = storage.open("app-temp-cache").await.unwrap();
        assert!(temp.keys().await.unwrap().is_empty());
        assert_eq!(sw.context().scope.state().await, WorkerState::Redundant);
    }

    #[tokio::test]
    async fn install_fails_on_error_status() {
        let storage = Arc::new(MemoryStorage::new());
        // flutter_bootstrap.js is unknown to the stub and answers 404
        let sw = worker(
            build(
                &[("main.dart.js", "h1"), ("flutter_bootstrap.js", "h2")],
                &["main.dart.js", "flutter_bootstrap.js"],
            ),
            storage,
            Arc::new(shell_fetcher()),
        );

        let err = sw.install().await.unwrap_err();
        assert!(matches!(err, SwsyncError::HttpStatus { status: 404, .. }));
    }
}
