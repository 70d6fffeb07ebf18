//! Confirmation prompt with CI fallback

use super::context::UiContext;
use crate::error::{SwsyncError, SwsyncResult};

/// Ask for confirmation.
///
/// `--yes` approves without asking; a non-interactive session answers
/// `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> SwsyncResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| SwsyncError::User(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| SwsyncError::User(format!("Prompt failed: {}", e)))
}
