//! One status line render: parse the snapshot, update lifetime counters,
//! resolve usage data and format the text.

use chrono::Utc;
use tracing::debug;

use chonker_core::usage::{PendingRefresh, UsageOrchestrator};
use chonker_core::{ChonkerPaths, SessionAccumulator};

use crate::config::Settings;
use crate::input::StatusInput;
use crate::render::Renderer;

/// Text to print plus any refresh still warming the cache
#[derive(Debug)]
pub struct Rendered {
    /// Status line text; empty when the input could not be parsed
    pub text: String,
    pub pending: Option<PendingRefresh>,
}

/// Renders the status line against one set of paths and settings
pub struct StatusLine {
    settings: Settings,
    accumulator: SessionAccumulator,
    usage: UsageOrchestrator,
}

impl StatusLine {
    pub fn new(paths: &ChonkerPaths, settings: Settings) -> Self {
        let usage = UsageOrchestrator::new(settings.usage_policy(), paths);
        Self::with_orchestrator(paths, settings, usage)
    }

    /// Status line with a caller-built usage orchestrator
    pub fn with_orchestrator(
        paths: &ChonkerPaths,
        settings: Settings,
        usage: UsageOrchestrator,
    ) -> Self {
        Self {
            settings,
            accumulator: SessionAccumulator::new(paths.session_file()),
            usage,
        }
    }

    /// Render from raw stdin; never fails
    pub async fn render(&self, raw: &str) -> Rendered {
        let input = match StatusInput::parse(raw) {
            Ok(input) => input,
            Err(e) => {
                debug!("Unparsable status line input: {}", e);
                return Rendered {
                    text: String::new(),
                    pending: None,
                };
            }
        };

        let lifetime = self.accumulator.accumulate(
            input.context_window.session_tokens(),
            input.cost.session_cost(),
        );

        let outcome = self.usage.get_usage_data().await;
        debug!("Usage resolution: {:?}", outcome.resolution);

        let text =
            Renderer::new(&self.settings).render(&input, lifetime, outcome.data(), Utc::now());
        Rendered {
            text,
            pending: outcome.pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::strip_ansi;
    use chonker_core::usage::cache::unix_now;
    use chonker_core::usage::{
        CredentialSource, UsageBucket, UsageCache, UsageCacheEntry, UsageData, UsagePolicy,
        UsageSource,
    };
    use std::sync::Arc;

    struct NoCredentials;

    impl CredentialSource for NoCredentials {
        fn access_token(&self) -> Option<String> {
            None
        }
    }

    struct Unreachable;

    impl UsageSource for Unreachable {
        fn fetch(&self, _access_token: &str) -> Option<UsageData> {
            None
        }
    }

    fn paths(dir: &tempfile::TempDir) -> ChonkerPaths {
        ChonkerPaths::new(dir.path().join(".chonker"), dir.path().join(".claude"))
    }

    fn offline_status_line(paths: &ChonkerPaths, settings: Settings) -> StatusLine {
        let usage = UsageOrchestrator::with_sources(
            settings.usage_policy(),
            UsageCache::new(paths.usage_cache_file()),
            Arc::new(NoCredentials),
            Arc::new(Unreachable),
        );
        StatusLine::with_orchestrator(paths, settings, usage)
    }

    const SNAPSHOT: &str = r#"{"context_window":{"used_percentage":50,"context_window_size":200000,"total_input_tokens":1000,"total_output_tokens":500},"cost":{"total_cost_usd":0.5},"model":{"id":"claude-opus"}}"#;

    #[tokio::test]
    async fn test_render_valid_input() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        let status = offline_status_line(&paths, Settings::default());

        let rendered = status.render(SNAPSHOT).await;
        assert!(!rendered.text.is_empty());
        assert!(rendered.pending.is_none());
        let plain = strip_ansi(&rendered.text);
        assert!(plain.contains("50%"));
        assert!(plain.contains("100k/200k"));
        assert!(plain.contains("claude-opus"));
        assert_eq!(plain.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_render_minimal_input() {
        let dir = tempfile::tempdir().unwrap();
        let status = offline_status_line(&paths(&dir), Settings::default());

        let rendered = status.render(r#"{"context_window":{"used_percentage":50}}"#).await;
        assert!(!rendered.text.is_empty());
        assert!(strip_ansi(&rendered.text).contains("50%"));
    }

    #[tokio::test]
    async fn test_render_invalid_input_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        let status = offline_status_line(&paths, Settings::default());

        let rendered = status.render("not json").await;
        assert_eq!(rendered.text, "");
        // Nothing persisted for unparsable input
        assert!(!paths.session_file().exists());
    }

    #[tokio::test]
    async fn test_render_accumulates_lifetime_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        let status = offline_status_line(&paths, Settings::default());

        status.render(SNAPSHOT).await;
        let next = r#"{"context_window":{"total_input_tokens":100,"total_output_tokens":0},"cost":{"total_cost_usd":0.25}}"#;
        let rendered = status.render(next).await;

        // 1500 carried + 100 current, $0.50 + $0.25
        let plain = strip_ansi(&rendered.text);
        assert!(plain.contains("\u{03a3}2k $0.75"), "{plain}");
    }

    #[tokio::test]
    async fn test_render_includes_stale_usage_when_offline() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        UsageCache::new(paths.usage_cache_file()).write_entry(&UsageCacheEntry {
            fetched_at: unix_now() - 200.0,
            data: UsageData {
                seven_day: Some(UsageBucket {
                    utilization: Some(64.0),
                    resets_at: None,
                }),
                ..Default::default()
            },
        });
        let status = offline_status_line(&paths, Settings::default());

        let rendered = status.render(SNAPSHOT).await;
        let plain = strip_ansi(&rendered.text);
        assert_eq!(plain.lines().count(), 3);
        assert!(plain.ends_with(" 7d:64%"));
    }

    #[tokio::test]
    async fn test_render_with_usage_disabled_ignores_cache() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        UsageCache::new(paths.usage_cache_file()).write(&UsageData {
            five_hour: Some(UsageBucket::default()),
            ..Default::default()
        });
        let settings = Settings {
            show_usage: false,
            ..Default::default()
        };
        assert!(!settings.usage_policy().enabled);
        assert_eq!(UsagePolicy::default().grace, settings.usage_policy().grace);

        let status = offline_status_line(&paths, settings);
        let rendered = status.render(SNAPSHOT).await;
        assert_eq!(strip_ansi(&rendered.text).lines().count(), 2);
    }
}
