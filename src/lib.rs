//! chonker: a context, cost and rate-limit meter for the Claude Code status line.

pub mod config;
pub mod input;
pub mod render;
pub mod status_line;

pub use status_line::{Rendered, StatusLine};
