//! Resolved file locations shared by every component.
//!
//! Nothing in the crate looks up the home directory on its own; callers build
//! a `ChonkerPaths` once and hand it to the components that need it.

use std::path::PathBuf;

/// Name of chonker's data directory under the home directory
const CHONKER_DIR: &str = ".chonker";

/// Name of the host application's directory under the home directory
const CLAUDE_DIR: &str = ".claude";

/// All paths chonker reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChonkerPaths {
    /// chonker's own directory (config, session state, usage cache)
    root: PathBuf,
    /// Host application directory (credentials, settings)
    claude_dir: PathBuf,
}

impl ChonkerPaths {
    /// Build paths from explicit directories
    pub fn new(root: impl Into<PathBuf>, claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claude_dir: claude_dir.into(),
        }
    }

    /// Resolve paths relative to the current user's home directory
    pub fn from_home() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::new(home.join(CHONKER_DIR), home.join(CLAUDE_DIR)))
    }

    /// Paths under the system temp directory, used when no home directory exists
    pub fn fallback() -> Self {
        let tmp = std::env::temp_dir();
        Self::new(tmp.join("chonker"), tmp.join("chonker").join(CLAUDE_DIR))
    }

    /// User configuration document
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Lifetime session counters
    pub fn session_file(&self) -> PathBuf {
        self.root.join("session.json")
    }

    /// Cached remote usage envelope
    pub fn usage_cache_file(&self) -> PathBuf {
        self.root.join("usage.json")
    }

    /// OAuth credentials written by the host application
    pub fn credentials_file(&self) -> PathBuf {
        self.claude_dir.join(".credentials.json")
    }

    /// Host application settings (status line hook lives here)
    pub fn claude_settings_file(&self) -> PathBuf {
        self.claude_dir.join("settings.json")
    }
}
