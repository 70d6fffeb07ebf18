//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// swsync - offline cache synchronizer for statically-built web apps
///
/// Runs the install, activate, fetch and message handlers of a caching
/// worker against an on-disk cache store.
#[derive(Parser, Debug)]
#[command(name = "swsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SWSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding caches, the worker record and the journal
    #[arg(long, global = true, env = "SWSYNC_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Origin the worker is served from (overrides worker.origin)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Build manifest file (overrides worker.manifest)
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage the shell files of the current build
    Install,

    /// Reconcile caches against the current build and take control
    Activate,

    /// Dispatch a fetch event for a URL
    Fetch(FetchArgs),

    /// Send a control message to the worker
    Message(MessageArgs),

    /// Show worker state, cache partitions and manifest drift
    Status(StatusArgs),

    /// Generate, show or compare build manifests
    Manifest(ManifestArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Delete every cache partition
    Clear(ClearArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// URL to request; a path is resolved against the origin
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Write the response body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the message command
#[derive(Parser, Debug)]
pub struct MessageArgs {
    /// Message payload: skipWaiting or downloadOffline
    pub data: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the manifest command
#[derive(Parser, Debug)]
pub struct ManifestArgs {
    #[command(subcommand)]
    pub action: ManifestAction,
}

/// Manifest subcommands
#[derive(Subcommand, Debug)]
pub enum ManifestAction {
    /// Fingerprint a build directory into a manifest
    Generate {
        /// Build output directory (e.g. build/web)
        dir: PathBuf,

        /// Output file (defaults to <dir>/swsync-manifest.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Shell files, overriding build.shell (comma-separated)
        #[arg(long, value_delimiter = ',')]
        shell: Vec<String>,

        /// Print the manifest instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Show the configured build manifest
    Show,

    /// Compare two manifests as activation would
    Diff {
        /// Previous manifest (build manifest or flat resource map)
        old: PathBuf,
        /// Next manifest
        new: PathBuf,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Output format for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple key=value lines
    Plain,
}
