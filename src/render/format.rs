//! Number, bar and countdown formatting.

use chrono::{DateTime, Utc};

use super::style::RESET;

/// Compact token count: `950`, `12k`, `1.2m`
pub fn fmt_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}m", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{}k", (n as f64 / 1_000.0).round() as u64)
    } else {
        n.to_string()
    }
}

/// Percentage rounded to a whole number
pub fn fmt_percent(pct: f64) -> String {
    format!("{}%", pct.round() as i64)
}

/// Filled/empty bar of `width` cells for a percentage
pub fn build_bar(pct: f64, color: &str, dim: &str, width: usize) -> String {
    let filled = ((width as f64 * pct / 100.0).round().max(0.0) as usize).min(width);
    let empty = width - filled;
    format!(
        "{color}{}{dim}{}{RESET}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(empty)
    )
}

/// Time until `resets_at` as `~3h`, `~12m` or `~40s`; empty if unparsable
pub fn fmt_reset_time(resets_at: &str, now: DateTime<Utc>) -> String {
    let Ok(reset) = DateTime::parse_from_rfc3339(resets_at) else {
        return String::new();
    };

    let seconds = (reset.with_timezone(&Utc) - now).num_seconds().max(0);
    if seconds >= 3600 {
        format!("~{}h", seconds / 3600)
    } else if seconds >= 60 {
        format!("~{}m", seconds / 60)
    } else {
        format!("~{seconds}s")
    }
}
