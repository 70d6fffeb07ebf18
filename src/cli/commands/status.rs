//! Status command - worker state, cache partitions and manifest drift

use super::{format_bytes, load_manifest, open_worker};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Config;
use crate::error::SwsyncResult;
use crate::journal::Journal;
use crate::manifest::ManifestDiff;
use crate::storage::{CacheStorage, DiskStorage};
use crate::worker::{missing_resources, PersistentScope, ScopeRecord};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// Journal events shown by status
const RECENT_EVENTS: usize = 5;

#[derive(Debug, Serialize)]
struct StatusReport {
    origin: String,
    state_dir: PathBuf,
    worker: Option<ScopeRecord>,
    partitions: Vec<PartitionStatus>,
    manifest: ManifestStatus,
    /// Most recent journal events, oldest first
    recent_events: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct PartitionStatus {
    name: String,
    entries: usize,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct ManifestStatus {
    path: Option<PathBuf>,
    /// Resources in the configured build manifest
    resources: Option<usize>,
    /// Resources in the manifest recorded by the last activation
    stored_resources: Option<usize>,
    /// Stored versus configured, as the next activation would see it
    drift: Option<ManifestDiff>,
    /// Configured resources not in the content cache
    missing: Vec<String>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> SwsyncResult<()> {
    let report = collect(config).await?;

    match args.format {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_plain(&report),
    }

    Ok(())
}

async fn collect(config: &Config) -> SwsyncResult<StatusReport> {
    let current = match config.worker.manifest {
        Some(_) => Some(load_manifest(config).await?),
        None => None,
    };
    let worker = open_worker(config, current.clone().unwrap_or_default()).await?;
    let ctx = worker.context();

    let storage = DiskStorage::new(config.caches_dir());
    let mut partitions = vec![];
    for name in storage.keys().await? {
        let entries = storage.open(&name).await?.keys().await?.len();
        let bytes = storage.size_on_disk(&name).await?;
        partitions.push(PartitionStatus {
            name,
            entries,
            bytes,
        });
    }

    let stored = worker.stored_manifest().await?;
    let (drift, missing) = match &current {
        Some(current) => {
            let cached = if storage.has(&ctx.names.content).await? {
                storage.open(&ctx.names.content).await?.keys().await?
            } else {
                vec![]
            };
            (
                stored.as_ref().map(|stored| stored.diff(&current.resources)),
                missing_resources(&ctx.origin, &current.resources, &cached),
            )
        }
        None => (None, vec![]),
    };

    Ok(StatusReport {
        origin: ctx.origin.to_string(),
        state_dir: config.state_dir(),
        worker: PersistentScope::read(&config.worker_record_path()).await?,
        partitions,
        manifest: ManifestStatus {
            path: config.worker.manifest.clone(),
            resources: current.as_ref().map(|m| m.resources.len()),
            stored_resources: stored.as_ref().map(|m| m.len()),
            drift,
            missing,
        },
        recent_events: Journal::new(config).tail(RECENT_EVENTS).await,
    })
}

fn print_table(report: &StatusReport) {
    println!("{}", style("swsync status").bold().blue());
    println!();

    println!("{}", style("Worker:").bold());
    println!("  Origin:    {}", report.origin);
    println!("  State dir: {}", report.state_dir.display());
    match &report.worker {
        Some(record) => {
            println!("  State:     {}", style(record.state).cyan());
            println!("  Version:   {}", &record.id.to_string()[..8]);
            println!(
                "  Flags:     skip_waiting={} clients_claimed={}",
                record.skip_waiting, record.clients_claimed
            );
            println!(
                "  Updated:   {}",
                record.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("  State:     {}", style("not installed").dim()),
    }

    println!();
    println!("{}", style("Caches:").bold());
    if report.partitions.is_empty() {
        println!("  {}", style("No cache partitions").dim());
    } else {
        println!("  {:<28} {:>8} {:>10}", "PARTITION", "ENTRIES", "SIZE");
        for partition in &report.partitions {
            println!(
                "  {:<28} {:>8} {:>10}",
                partition.name,
                partition.entries,
                format_bytes(partition.bytes)
            );
        }
    }

    println!();
    println!("{}", style("Manifest:").bold());
    let manifest = &report.manifest;
    match (&manifest.path, manifest.resources) {
        (Some(path), Some(resources)) => {
            println!("  Build:     {} ({} resources)", path.display(), resources)
        }
        _ => println!("  Build:     {}", style("not configured").dim()),
    }
    match manifest.stored_resources {
        Some(count) => println!("  Activated: {} resources", count),
        None => println!("  Activated: {}", style("none").dim()),
    }
    if let Some(drift) = &manifest.drift {
        if drift.is_empty() {
            println!("  Drift:     {}", style("up to date").green());
        } else {
            println!(
                "  Drift:     {}",
                style(format!(
                    "{} changed, {} added, {} removed",
                    drift.changed.len(),
                    drift.added.len(),
                    drift.removed.len()
                ))
                .yellow()
            );
        }
    }
    if manifest.resources.is_some() {
        if manifest.missing.is_empty() {
            println!("  Offline:   {}", style("all resources cached").green());
        } else {
            println!(
                "  Offline:   {} resources not cached (swsync message downloadOffline)",
                manifest.missing.len()
            );
        }
    }

    if !report.recent_events.is_empty() {
        println!();
        println!("{}", style("Recent events:").bold());
        for event in &report.recent_events {
            let timestamp = event["timestamp"].as_str().unwrap_or("-");
            let name = event["event"].as_str().unwrap_or("-");
            println!("  {}  {}", style(timestamp).dim(), name);
        }
    }
}

fn print_plain(report: &StatusReport) {
    println!("origin={}", report.origin);
    println!("state_dir={}", report.state_dir.display());
    match &report.worker {
        Some(record) => {
            println!("state={}", record.state);
            println!("worker_id={}", record.id);
        }
        None => println!("state=none"),
    }
    for partition in &report.partitions {
        println!(
            "partition.{}={} entries {} bytes",
            partition.name, partition.entries, partition.bytes
        );
    }
    if let Some(count) = report.manifest.resources {
        println!("manifest.resources={}", count);
        println!("manifest.missing={}", report.manifest.missing.len());
    }
    if let Some(count) = report.manifest.stored_resources {
        println!("manifest.stored_resources={}", count);
    }
}
