//! Rate-limit usage as reported by the account usage endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserialize a field, keeping its default when the value has the wrong shape
///
/// One odd field in the payload drops only that field instead of the whole
/// response.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Known windows in display order, with their short labels
pub const USAGE_BUCKETS: [(&str, &str); 4] = [
    ("five_hour", "5h"),
    ("seven_day", "7d"),
    ("seven_day_opus", "opus"),
    ("seven_day_sonnet", "sonnet"),
];

/// A single rate-limit window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    /// Utilization percentage (0-100)
    #[serde(default, deserialize_with = "lenient")]
    pub utilization: Option<f64>,
    /// ISO-8601 timestamp when the window resets
    #[serde(default, deserialize_with = "lenient")]
    pub resets_at: Option<String>,
}

impl UsageBucket {
    pub fn percent(&self) -> f64 {
        self.utilization.unwrap_or(0.0)
    }
}

/// Pay-as-you-go usage beyond the plan limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraUsage {
    #[serde(default, deserialize_with = "lenient")]
    pub is_enabled: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub utilization: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub monthly_limit: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub used_credits: Option<f64>,
}

impl ExtraUsage {
    pub fn percent(&self) -> f64 {
        self.utilization.unwrap_or(0.0)
    }
}

/// Usage payload from the endpoint
///
/// Windows the endpoint reports as `null`, or in a shape this type does not
/// understand, deserialize to `None`. Keys this
/// type does not know about are kept in `other` so the cached document
/// carries the full response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageData {
    #[serde(default, deserialize_with = "lenient")]
    pub five_hour: Option<UsageBucket>,
    #[serde(default, deserialize_with = "lenient")]
    pub seven_day: Option<UsageBucket>,
    #[serde(default, deserialize_with = "lenient")]
    pub seven_day_opus: Option<UsageBucket>,
    #[serde(default, deserialize_with = "lenient")]
    pub seven_day_sonnet: Option<UsageBucket>,
    #[serde(default, deserialize_with = "lenient")]
    pub extra_usage: Option<ExtraUsage>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl UsageData {
    /// Look up a window by its endpoint key
    pub fn bucket(&self, key: &str) -> Option<&UsageBucket> {
        match key {
            "five_hour" => self.five_hour.as_ref(),
            "seven_day" => self.seven_day.as_ref(),
            "seven_day_opus" => self.seven_day_opus.as_ref(),
            "seven_day_sonnet" => self.seven_day_sonnet.as_ref(),
            _ => None,
        }
    }

    /// Reported windows in display order, paired with their labels
    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, &UsageBucket)> + '_ {
        USAGE_BUCKETS
            .iter()
            .filter_map(|(key, label)| self.bucket(key).map(|b| (*label, b)))
    }

    /// Extra usage, only when it is switched on for the account
    pub fn enabled_extra_usage(&self) -> Option<&ExtraUsage> {
        self.extra_usage.as_ref().filter(|e| e.is_enabled)
    }
}
