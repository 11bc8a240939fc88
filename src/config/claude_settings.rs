//! Claude Code settings writer for the `statusLine` entry
//!
//! Only the `statusLine` key is touched; every other setting is written back
//! unchanged. An unreadable or malformed settings file is treated as empty.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use chonker_core::JsonFile;

/// How often Claude Code re-runs the status line command (milliseconds)
pub const REFRESH_INTERVAL_MS: u64 = 5000;

/// The `statusLine` entry in Claude Code settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLineSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}

impl StatusLineSettings {
    /// Command-type status line running `command`
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            command: command.into(),
            refresh_interval: Some(REFRESH_INTERVAL_MS),
        }
    }
}

/// Result of an install or uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Settings were written
    Installed,
    /// The status line already pointed at us
    AlreadyInstalled,
    /// Our entry was removed
    Removed,
    /// No entry of ours was present
    NotInstalled,
}

/// Reads and updates the status line entry in Claude Code's settings.json
pub struct ClaudeSettingsFile {
    file: JsonFile,
}

impl ClaudeSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Current settings as a JSON object (empty if missing or malformed)
    fn read(&self) -> Map<String, Value> {
        match self.file.load_or(Value::Null) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Current status line entry, if it is well-formed
    pub fn status_line(&self) -> Option<StatusLineSettings> {
        let settings = self.read();
        serde_json::from_value(settings.get("statusLine")?.clone()).ok()
    }

    /// Check if the status line already runs `command`
    pub fn is_installed(&self, command: &str) -> bool {
        self.status_line()
            .map(|sl| sl.command == command)
            .unwrap_or(false)
    }

    /// Point the status line at `command`
    pub fn install(&self, command: &str) -> Result<InstallOutcome> {
        if self.is_installed(command) {
            debug!("Status line already configured in {}", self.path().display());
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let mut settings = self.read();
        let entry = serde_json::to_value(StatusLineSettings::command(command))
            .context("Failed to serialize status line settings")?;
        settings.insert("statusLine".to_string(), entry);

        self.file
            .save_pretty(&settings)
            .with_context(|| format!("Failed to write {}", self.path().display()))?;
        info!("Status line configured in {}", self.path().display());
        Ok(InstallOutcome::Installed)
    }

    /// Remove the status line entry if it runs `command`
    pub fn uninstall(&self, command: &str) -> Result<InstallOutcome> {
        if !self.is_installed(command) {
            return Ok(InstallOutcome::NotInstalled);
        }

        let mut settings = self.read();
        settings.remove("statusLine");
        self.file
            .save_pretty(&settings)
            .with_context(|| format!("Failed to write {}", self.path().display()))?;
        info!("Status line removed from {}", self.path().display());
        Ok(InstallOutcome::Removed)
    }
}

/// Status line command for an executable path
pub fn status_line_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}
