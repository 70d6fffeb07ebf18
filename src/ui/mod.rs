//! Terminal output for the CLI
//!
//! Uses `cliclack` for spinners and prompts in an interactive terminal and
//! falls back to plain tagged lines (`[OK]`, `[WARN]`) in CI or when output
//! is piped.
//!
//! ```rust,ignore
//! use swsync::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "swsync install");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Staging shell files...");
//! spinner.stop("Staged 5 shell files");
//!
//! ui::outro_success(&ctx, "Installed");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, remark, section, step_error,
    step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{HashProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, SwsyncTheme};
