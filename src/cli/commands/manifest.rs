//! Manifest command - generate, show and compare build manifests

use super::load_manifest;
use crate::cli::args::{ManifestAction, ManifestArgs};
use crate::config::Config;
use crate::error::{SwsyncError, SwsyncResult};
use crate::manifest::{self, BuildManifest, ManifestDiff, ResourceManifest, MANIFEST_FILE};
use crate::ui::{self, HashProgress, UiContext};
use console::style;
use std::path::{Path, PathBuf};

/// Execute the manifest command
pub async fn execute(args: ManifestArgs, config: &Config) -> SwsyncResult<()> {
    match args.action {
        ManifestAction::Generate {
            dir,
            output,
            shell,
            stdout,
        } => generate(config, dir, output, shell, stdout).await,
        ManifestAction::Show => show(config).await,
        ManifestAction::Diff { old, new } => diff(&old, &new).await,
    }
}

async fn generate(
    config: &Config,
    dir: PathBuf,
    output: Option<PathBuf>,
    shell: Vec<String>,
    stdout: bool,
) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let output = output.unwrap_or_else(|| dir.join(MANIFEST_FILE));

    let mut build = config.build.clone();
    if !shell.is_empty() {
        build.shell = shell;
    }
    if let Ok(relative) = output.strip_prefix(&dir) {
        build.exclude.push(relative.to_string_lossy().replace('\\', "/"));
    }

    // Progress lines would corrupt the JSON on stdout
    let show_progress = !stdout;
    let build_dir = dir.clone();
    let progress_ctx = ctx.clone();
    let manifest = tokio::task::spawn_blocking(move || {
        let progress = show_progress.then(|| HashProgress::new(&progress_ctx));
        let result = manifest::generate(&build_dir, &build, &|index, total, key| {
            if let Some(progress) = &progress {
                progress.on_file(index, total, key);
            }
        });
        if let Some(progress) = &progress {
            progress.finish();
        }
        result
    })
    .await
    .map_err(|e| SwsyncError::Internal(format!("manifest task failed: {}", e)))??;

    if stdout {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    manifest.save(&output).await?;
    ui::step_ok_detail(
        &ctx,
        &format!(
            "Fingerprinted {} resources, {} shell files",
            manifest.resources.len(),
            manifest.shell.len()
        ),
        &output.display().to_string(),
    );
    Ok(())
}

async fn show(config: &Config) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let manifest = load_manifest(config).await?;

    if let Some(path) = &config.worker.manifest {
        ui::key_value(&ctx, "Manifest", &path.display().to_string());
    }
    ui::key_value(&ctx, "Resources", &manifest.resources.len().to_string());

    ui::section(&ctx, "Shell files");
    if manifest.shell.is_empty() {
        ui::remark(&ctx, "No shell files; install stages nothing");
    }
    for (index, file) in manifest.shell.iter().enumerate() {
        println!("  {:>2}. {}", index + 1, file);
    }

    ui::section(&ctx, "Resources");
    for (key, fingerprint) in manifest.resources.iter() {
        println!("  {}  {}", style(fingerprint).dim(), key);
    }
    Ok(())
}

async fn diff(old: &Path, new: &Path) -> SwsyncResult<()> {
    let ctx = UiContext::detect();
    let previous = ResourceManifest::from_file(old).await?;
    let next = BuildManifest::from_file(new).await?;
    let diff = previous.diff(&next.resources);

    print_diff(&ctx, &diff);

    if diff.is_empty() {
        ui::outro_success(&ctx, "Manifests are identical; activation keeps every entry");
    } else {
        ui::outro_warn(
            &ctx,
            &format!(
                "Activation would evict {} entries and stage {} shell files",
                diff.changed.len() + diff.removed.len(),
                next.shell.len()
            ),
        );
    }
    Ok(())
}

fn print_diff(ctx: &UiContext, diff: &ManifestDiff) {
    ui::key_value(ctx, "Unchanged", &diff.unchanged.len().to_string());
    for key in &diff.changed {
        println!("  {} {}", style("~").yellow(), key);
    }
    for key in &diff.added {
        println!("  {} {}", style("+").green(), key);
    }
    for key in &diff.removed {
        println!("  {} {}", style("-").red(), key);
    }
}
