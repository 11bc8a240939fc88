mod claude_settings;
mod settings;

pub use claude_settings::{
    status_line_command, ClaudeSettingsFile, InstallOutcome, StatusLineSettings,
    REFRESH_INTERVAL_MS,
};
pub use settings::{Command, Config, Settings};
