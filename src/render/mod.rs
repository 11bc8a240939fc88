//! Status line text: a context bar, a token/model line and an optional
//! rate-limit usage line.

mod format;
mod style;

pub use format::{build_bar, fmt_percent, fmt_reset_time, fmt_tokens};
pub use style::{c256, Palette, RESET};

use chrono::{DateTime, Utc};

use chonker_core::usage::UsageData;
use chonker_core::Lifetime;

use crate::config::Settings;
use crate::input::StatusInput;

/// Renders status line text for one snapshot
pub struct Renderer<'a> {
    settings: &'a Settings,
    palette: Palette,
}

impl<'a> Renderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            palette: Palette::new(settings),
        }
    }

    /// Full status line: context bar, tokens/model, then usage when present
    pub fn render(
        &self,
        input: &StatusInput,
        lifetime: Lifetime,
        usage: Option<&UsageData>,
        now: DateTime<Utc>,
    ) -> String {
        let mut lines = vec![self.context_line(input), self.token_line(input, lifetime)];
        if let Some(line) = usage.and_then(|u| self.usage_line(u, now)) {
            lines.push(line);
        }
        lines.join("\n")
    }

    /// ` ████░░░░ 42%  85k/200k`
    pub fn context_line(&self, input: &StatusInput) -> String {
        let ctx = &input.context_window;
        let pct = ctx.percent();
        let color = self.palette.threshold(pct);
        let bar = build_bar(pct, color, &self.palette.dim, self.settings.bar_width);

        format!(
            " {bar} {color}{}{RESET}  {}{}/{}{RESET}",
            fmt_percent(pct),
            self.palette.tokens,
            fmt_tokens(ctx.current_tokens()),
            fmt_tokens(ctx.window_size()),
        )
    }

    /// ` ↑15k ↓3k · Opus 4.1 · Σ1.2m $12.40`
    pub fn token_line(&self, input: &StatusInput, lifetime: Lifetime) -> String {
        let ctx = &input.context_window;
        let accent = &self.palette.accent;
        let dim = &self.palette.dim;

        let mut segments = vec![
            format!(
                " {dim}\u{2191}{RESET}{accent}{} {dim}\u{2193}{RESET}{accent}{}",
                fmt_tokens(ctx.input_tokens()),
                fmt_tokens(ctx.output_tokens()),
            ),
            format!("{accent}{}{RESET}", input.model.short_name()),
        ];

        if self.settings.show_lifetime {
            segments.push(format!(
                "{dim}\u{03a3}{RESET}{}{}{RESET} {dim}${:.2}{RESET}",
                self.palette.tokens,
                fmt_tokens(lifetime.tokens),
                lifetime.cost,
            ));
        }

        segments.join(&self.palette.separator())
    }

    /// ` 5h:42% · 7d:12% · xtra:25%`, or `None` when no window is reported
    pub fn usage_line(&self, usage: &UsageData, now: DateTime<Utc>) -> Option<String> {
        let dim = &self.palette.dim;
        let mut segments = Vec::new();

        for (label, bucket) in usage.buckets() {
            let pct = bucket.percent();
            let color = self.palette.threshold(pct);
            let mut segment = format!("{dim}{label}:{RESET}{color}{}{RESET}", fmt_percent(pct));

            if self.settings.show_resets {
                let reset = bucket
                    .resets_at
                    .as_deref()
                    .map(|r| fmt_reset_time(r, now))
                    .unwrap_or_default();
                if !reset.is_empty() {
                    segment.push_str(&format!(" {dim}{reset}{RESET}"));
                }
            }
            segments.push(segment);
        }

        if let Some(extra) = usage.enabled_extra_usage() {
            let pct = extra.percent();
            let color = self.palette.threshold(pct);
            segments.push(format!("{dim}xtra:{RESET}{color}{}{RESET}", fmt_percent(pct)));
        }

        if segments.is_empty() {
            return None;
        }
        Some(format!(" {}", segments.join(&self.palette.separator())))
    }
}

/// Remove ANSI escape sequences (for width checks and tests)
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI: ESC [ params... final byte in @..~
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
