use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use chonker_core::usage::orchestrator::{DEFAULT_CACHE_TTL, UsagePolicy};
use chonker_core::JsonFile;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Context, cost and rate-limit meter for the Claude Code status line"
)]
pub struct Config {
    /// Enable debug logging (stderr)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file (default: ~/.chonker/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not show or fetch rate-limit usage
    #[arg(long)]
    pub no_usage: bool,

    /// Subcommand (renders the status line from stdin when omitted)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Point the Claude Code status line at this executable
    Install {
        /// Report as a session-start hook response (JSON on stdout)
        #[arg(long)]
        hook: bool,
    },
    /// Remove the status line entry added by `install`
    Uninstall,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// User settings (from `config.json`)
///
/// Colors are 256-color palette indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model name and token counts
    pub accent: u8,
    /// Bar color below 50%
    pub normal: u8,
    /// Bar color above 50%
    pub warning: u8,
    /// Bar color above 70%
    pub danger: u8,
    /// Bar color above 85%
    pub critical: u8,
    /// Current/window token counts
    pub tokens: u8,
    /// Separators, labels and the empty part of the bar
    pub dim: u8,

    /// Width of the context bar in cells
    pub bar_width: usize,

    /// Show the rate-limit usage line
    pub show_usage: bool,

    /// Show time until each usage window resets
    pub show_resets: bool,

    /// Show lifetime tokens and cost across sessions
    pub show_lifetime: bool,

    /// Seconds cached usage is served without a refresh
    pub cache_ttl: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accent: 208,
            normal: 255,
            warning: 208,
            danger: 160,
            critical: 196,
            tokens: 80,
            dim: 242,
            bar_width: 20,
            show_usage: true,
            show_resets: false,
            show_lifetime: true,
            cache_ttl: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl Settings {
    /// Load settings from a config file, or use defaults
    ///
    /// A missing or malformed file yields the defaults. Keys are applied over
    /// the defaults one at a time, so a key with a bad value falls back to its
    /// default without discarding the rest of the file.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        debug!("Loading settings from {}", path.display());

        let overrides: Option<Map<String, Value>> = JsonFile::new(path).load_or(None);
        match overrides {
            Some(overrides) => Self::with_overrides(overrides),
            None => {
                warn!("Ignoring malformed config file {}", path.display());
                Self::default()
            }
        }
    }

    /// Defaults with each valid key of `overrides` applied
    fn with_overrides(overrides: Map<String, Value>) -> Self {
        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Self::default(),
        };

        for (key, value) in overrides {
            let previous = merged.insert(key.clone(), value);
            if serde_json::from_value::<Self>(Value::Object(merged.clone())).is_err() {
                warn!("Ignoring invalid config value for '{}'", key);
                if let Some(previous) = previous {
                    merged.insert(key, previous);
                } else {
                    merged.remove(&key);
                }
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if cli.no_usage {
            self.show_usage = false;
        }
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        const MAX_BAR_WIDTH: usize = 100;

        if self.cache_ttl == 0 {
            self.cache_ttl = DEFAULT_CACHE_TTL.as_secs();
        }
        self.bar_width = self.bar_width.clamp(1, MAX_BAR_WIDTH);
    }

    /// Usage refresh policy derived from these settings
    pub fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy {
            enabled: self.show_usage,
            ttl: Duration::from_secs(self.cache_ttl),
            ..UsagePolicy::default()
        }
    }
}
