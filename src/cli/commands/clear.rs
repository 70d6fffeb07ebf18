//! Clear command - delete every cache partition and the worker record

use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::SwsyncResult;
use crate::journal::Journal;
use crate::storage::{CacheNames, CacheStorage, DiskStorage};
use crate::ui::{self, UiContext};
use crate::worker::PersistentScope;
use tracing::debug;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> SwsyncResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let storage = DiskStorage::new(config.caches_dir());
    let names = CacheNames::from(&config.caches);
    let record_path = config.worker_record_path();
    let has_record = record_path.exists();

    let mut existing = vec![];
    for name in names.partitions() {
        if storage.has(name).await? {
            existing.push(name);
        }
    }

    if existing.is_empty() && !has_record {
        ui::step_info(&ctx, "No cache partitions or worker record to clear");
        return Ok(());
    }

    ui::section(&ctx, "To delete");
    for name in &existing {
        println!("  {}", name);
    }
    if has_record {
        println!("  {}", record_path.display());
    }
    println!();

    if !ui::confirm(&ctx, "Delete cached state?", false).await? {
        ui::step_warn_hint(&ctx, "Aborted", "Pass --yes to clear without a prompt");
        return Ok(());
    }

    for name in &existing {
        storage.delete(name).await?;
        debug!("Deleted partition {}", name);
    }
    let record_removed = PersistentScope::remove(&record_path).await?;

    Journal::new(config)
        .record(
            "cache.cleared",
            &serde_json::json!({
                "partitions": existing,
                "worker_record": record_removed,
            }),
        )
        .await;

    let mut summary = format!("Cleared {} partitions", existing.len());
    if record_removed {
        summary.push_str(" and the worker record");
    }
    ui::outro_success(&ctx, &summary);

    Ok(())
}
