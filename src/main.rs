//! swsync - offline cache synchronizer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use swsync::cli::{commands, Cli, Commands};
use swsync::config::ConfigManager;
use swsync::error::SwsyncResult;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SwsyncResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("swsync=warn"),
        1 => EnvFilter::new("swsync=info"),
        _ => EnvFilter::new("swsync=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    swsync::ui::init_theme();

    if let Some(state_dir) = cli.state_dir {
        config.worker.state_dir = Some(state_dir);
    }
    if let Some(origin) = cli.origin {
        config.worker.origin = origin;
    }
    if let Some(manifest) = cli.manifest {
        config.worker.manifest = Some(manifest);
    }
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Install => commands::install(&config).await,
        Commands::Activate => commands::activate(&config).await,
        Commands::Fetch(args) => commands::fetch(args, &config).await,
        Commands::Message(args) => commands::message(args, &config).await,
        Commands::Status(args) => commands::status(args, &config).await,
        Commands::Manifest(args) => commands::manifest(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
        Commands::Clear(args) => commands::clear(args, &config).await,
    }
}
