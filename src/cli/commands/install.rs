//! Install command - stage the shell files of the current build

use super::{load_manifest, open_worker};
use crate::config::Config;
use crate::error::SwsyncResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(config: &Config) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let manifest = load_manifest(config).await?;
    let shell_count = manifest.shell.len();
    let worker = open_worker(config, manifest).await?;

    ui::intro(&ctx, "swsync install");
    ui::key_value(&ctx, "Origin", &worker.context().origin.to_string());

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Staging {} shell files...", shell_count));

    match worker.install().await {
        Ok(staged) => {
            spinner.stop(&format!(
                "Staged {} shell files into {}",
                staged,
                worker.context().names.temp
            ));
            ui::remark(&ctx, "Run: swsync activate");
            ui::outro_success(&ctx, "Worker installed");
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Install failed, worker is redundant");
            Err(e)
        }
    }
}
