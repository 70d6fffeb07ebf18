//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Blue-branded theme
#[derive(Debug, Clone, Default)]
pub struct SwsyncTheme;

impl cliclack::Theme for SwsyncTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().blue().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install the theme for every later prompt and spinner
pub fn init_theme() {
    cliclack::set_theme(SwsyncTheme);
}
