//! Session snapshot Claude Code pipes to the status line command.
//!
//! Every field is optional; missing or `null` numbers read as zero.

use serde::{Deserialize, Deserializer};

/// Top-level status line input
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusInput {
    #[serde(deserialize_with = "null_as_default")]
    pub context_window: ContextWindow,
    #[serde(deserialize_with = "null_as_default")]
    pub cost: CostInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub model: ModelInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContextWindow {
    pub used_percentage: Option<f64>,
    pub context_window_size: Option<f64>,
    pub total_input_tokens: Option<f64>,
    pub total_output_tokens: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CostInfo {
    pub total_cost_usd: Option<f64>,
    pub total_duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub display_name: Option<String>,
    pub id: Option<String>,
}

impl StatusInput {
    /// Parse stdin contents
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl ContextWindow {
    /// Context used, in percent
    pub fn percent(&self) -> f64 {
        finite_or_zero(self.used_percentage)
    }

    pub fn window_size(&self) -> u64 {
        as_count(self.context_window_size)
    }

    pub fn input_tokens(&self) -> u64 {
        as_count(self.total_input_tokens)
    }

    pub fn output_tokens(&self) -> u64 {
        as_count(self.total_output_tokens)
    }

    /// Tokens consumed by this session (input plus output)
    pub fn session_tokens(&self) -> u64 {
        self.input_tokens().saturating_add(self.output_tokens())
    }

    /// Tokens currently occupying the context window
    pub fn current_tokens(&self) -> u64 {
        (self.window_size() as f64 * self.percent() / 100.0).round() as u64
    }
}

impl CostInfo {
    pub fn session_cost(&self) -> f64 {
        finite_or_zero(self.total_cost_usd)
    }
}

impl ModelInfo {
    /// Display name, then id, then a placeholder
    pub fn name(&self) -> &str {
        [self.display_name.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or("?")
    }

    /// Name with its first "Claude " removed
    pub fn short_name(&self) -> String {
        self.name().replacen("Claude ", "", 1)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Non-negative whole count; `as` saturates and maps NaN to zero
fn as_count(value: Option<f64>) -> u64 {
    finite_or_zero(value).max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_snapshot() {
        let raw = r#"{
            "session_id": "abc",
            "model": {"id": "claude-opus-4-1", "display_name": "Claude Opus 4.1"},
            "cost": {"total_cost_usd": 1.25, "total_duration_ms": 45000},
            "context_window": {
                "used_percentage": 42.5,
                "context_window_size": 200000,
                "total_input_tokens": 15000,
                "total_output_tokens": 3200
            }
        }"#;

        let input = StatusInput::parse(raw).unwrap();
        assert_eq!(input.context_window.percent(), 42.5);
        assert_eq!(input.context_window.session_tokens(), 18_200);
        assert_eq!(input.context_window.current_tokens(), 85_000);
        assert_eq!(input.cost.session_cost(), 1.25);
        assert_eq!(input.model.short_name(), "Opus 4.1");
    }

    #[test]
    fn test_short_name_strips_first_occurrence_only() {
        let raw = r#"{"model": {"display_name": "Claude Claude Haiku"}}"#;
        let input = StatusInput::parse(raw).unwrap();
        assert_eq!(input.model.short_name(), "Claude Haiku");
    }

    #[test]
    fn test_missing_fields_default() {
        let input = StatusInput::parse("{}").unwrap();
        assert_eq!(input.context_window.percent(), 0.0);
        assert_eq!(input.context_window.session_tokens(), 0);
        assert_eq!(input.cost.session_cost(), 0.0);
        assert_eq!(input.model.name(), "?");
    }

    #[test]
    fn test_null_fields_default() {
        let raw = r#"{"context_window": {"used_percentage": null, "total_input_tokens": null}, "model": {"display_name": null, "id": "sonnet"}}"#;
        let input = StatusInput::parse(raw).unwrap();
        assert_eq!(input.context_window.percent(), 0.0);
        assert_eq!(input.context_window.input_tokens(), 0);
        assert_eq!(input.model.name(), "sonnet");
    }

    #[test]
    fn test_null_sections_default() {
        let input = StatusInput::parse(r#"{"context_window": null, "cost": null, "model": null}"#)
            .unwrap();
        assert_eq!(input.context_window.window_size(), 0);
        assert_eq!(input.model.name(), "?");
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        let raw = r#"{"context_window": {"total_input_tokens": -5, "total_output_tokens": 10.4}}"#;
        let input = StatusInput::parse(raw).unwrap();
        assert_eq!(input.context_window.session_tokens(), 10);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(StatusInput::parse("not json").is_err());
        assert!(StatusInput::parse("").is_err());
    }
}
