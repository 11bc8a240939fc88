//! ANSI 256-color escapes resolved from settings.

use crate::config::Settings;

/// Reset all attributes
pub const RESET: &str = "\x1b[0m";

/// Foreground escape for a 256-color palette index
pub fn c256(n: u8) -> String {
    format!("\x1b[38;5;{n}m")
}

/// Escapes for every role the status line uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub accent: String,
    pub tokens: String,
    pub dim: String,
    normal: String,
    warning: String,
    danger: String,
    critical: String,
}

impl Palette {
    pub fn new(settings: &Settings) -> Self {
        Self {
            accent: c256(settings.accent),
            tokens: c256(settings.tokens),
            dim: c256(settings.dim),
            normal: c256(settings.normal),
            warning: c256(settings.warning),
            danger: c256(settings.danger),
            critical: c256(settings.critical),
        }
    }

    /// Color for a utilization percentage
    pub fn threshold(&self, pct: f64) -> &str {
        if pct > 85.0 {
            &self.critical
        } else if pct > 70.0 {
            &self.danger
        } else if pct > 50.0 {
            &self.warning
        } else {
            &self.normal
        }
    }

    /// Dimmed middle dot with surrounding spaces
    pub fn separator(&self) -> String {
        format!(" {}\u{00b7}{RESET} ", self.dim)
    }
}
