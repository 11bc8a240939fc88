//! OAuth access token lookup.
//!
//! On macOS the host application keeps its credentials in the Keychain; the
//! JSON credentials file is used everywhere else and as the macOS fallback.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

#[cfg(target_os = "macos")]
use std::process::Command;

/// Supplies the bearer token for the usage endpoint
pub trait CredentialSource: Send + Sync {
    /// Current access token, or `None` when no credentials are available
    fn access_token(&self) -> Option<String>;
}

/// Credentials document written by the host application
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsDocument {
    claude_ai_oauth: Option<OAuthCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthCredentials {
    access_token: Option<String>,
}

/// Host application credentials (Keychain on macOS, then the credentials file)
#[derive(Debug, Clone)]
pub struct ClaudeCredentials {
    path: PathBuf,
}

impl ClaudeCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn file_token(&self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No credentials file at {}: {}", self.path.display(), e);
                return None;
            }
        };
        parse_access_token(&content)
    }
}

impl CredentialSource for ClaudeCredentials {
    fn access_token(&self) -> Option<String> {
        #[cfg(target_os = "macos")]
        {
            if let Some(token) = keychain_token() {
                return Some(token);
            }
        }

        self.file_token()
    }
}

/// Read the credentials JSON from the macOS Keychain
#[cfg(target_os = "macos")]
fn keychain_token() -> Option<String> {
    let output = Command::new("security")
        .args(["find-generic-password", "-s", "Claude Code-credentials", "-w"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("Keychain item not found");
        return None;
    }

    let json = String::from_utf8(output.stdout).ok()?;
    parse_access_token(&json)
}

/// Extract a non-empty access token from a credentials document
fn parse_access_token(json: &str) -> Option<String> {
    let doc: CredentialsDocument = match serde_json::from_str(json.trim()) {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to parse credentials: {}", e);
            return None;
        }
    };

    doc.claude_ai_oauth
        .and_then(|oauth| oauth.access_token)
        .filter(|token| !token.trim().is_empty())
}
