//! Activate command - reconcile caches and take control

use super::{load_manifest, open_worker};
use crate::config::Config;
use crate::error::{SwsyncError, SwsyncResult};
use crate::ui::{self, UiContext};
use crate::worker::{ActivationOutcome, WorkerState};

/// Execute the activate command
pub async fn execute(config: &Config) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let manifest = load_manifest(config).await?;
    let worker = open_worker(config, manifest).await?;

    let state = worker.context().scope.state().await;
    if state != WorkerState::Installed {
        return Err(SwsyncError::NotInstalled(state.to_string()));
    }

    ui::intro(&ctx, "swsync activate");
    let report = worker.activate().await?;

    match report.outcome {
        ActivationOutcome::Fresh => {
            ui::step_ok(&ctx, "No previous manifest, content cache rebuilt");
        }
        ActivationOutcome::Upgraded => {
            ui::step_ok(&ctx, &format!("Retained {} unchanged entries", report.retained));
            if report.evicted.is_empty() {
                ui::step_ok(&ctx, "Nothing to evict");
            } else {
                ui::step_ok_detail(
                    &ctx,
                    &format!("Evicted {} entries", report.evicted.len()),
                    &report.evicted.join(", "),
                );
            }
        }
        ActivationOutcome::Wiped => {
            let reason = report.error.as_deref().unwrap_or("unknown error");
            ui::step_warn_hint(
                &ctx,
                &format!("Cache upgrade failed: {}", reason),
                "All caches were deleted; resources will be fetched on demand",
            );
            ui::outro_warn(&ctx, "Worker activated with empty caches");
            return Ok(());
        }
    }

    ui::step_ok(&ctx, &format!("Promoted {} shell files", report.promoted));
    ui::outro_success(&ctx, "Worker activated");
    Ok(())
}
