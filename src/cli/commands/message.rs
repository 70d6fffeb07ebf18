//! Message command - send a control message to the worker

use super::{load_manifest, open_worker};
use crate::cli::args::MessageArgs;
use crate::config::Config;
use crate::error::SwsyncResult;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::worker::{ControlMessage, MessageOutcome};

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let manifest = load_manifest(config).await?;
    let worker = open_worker(config, manifest).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    if ControlMessage::parse(&args.data) == Some(ControlMessage::DownloadOffline) {
        spinner.start("Downloading resources for offline use...");
    }

    let outcome = match worker.handle_message(&args.data).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Offline download failed, nothing was stored");
            return Err(e);
        }
    };

    match outcome {
        MessageOutcome::SkippedWaiting => {
            ui::step_ok(&ctx, "Worker will skip waiting");
        }
        MessageOutcome::Hydrated(0) => {
            spinner.stop("All resources already cached");
        }
        MessageOutcome::Hydrated(count) => {
            spinner.stop(&format!("Cached {} resources for offline use", count));
        }
        MessageOutcome::Ignored => {
            ui::step_warn_hint(
                &ctx,
                &format!("Ignored unknown message {:?}", args.data),
                "Known messages: skipWaiting, downloadOffline",
            );
        }
    }

    Ok(())
}
