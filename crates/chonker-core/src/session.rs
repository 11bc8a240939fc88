//! Lifetime token and cost totals across host sessions.
//!
//! The host reports per-session counters that restart at zero with every new
//! session. A drop in the token count is taken as a restart and the previous
//! session's last observed values are folded into the carried totals. The
//! heuristic cannot tell a new session from any other counter reset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::store::JsonFile;

/// Persisted counters, overwritten on every render
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Token count seen on the previous invocation
    pub last_tokens: u64,
    /// Cost seen on the previous invocation
    pub last_cost: f64,
    /// Tokens from sessions that have since reset
    pub carry_tokens: u64,
    /// Cost from sessions that have since reset
    pub carry_cost: f64,
}

impl SessionState {
    /// Record the current counters, carrying over the previous session on a reset
    ///
    /// Returns true if a carry-over happened.
    pub fn observe(&mut self, tokens: u64, cost: f64) -> bool {
        let reset = tokens < self.last_tokens;
        if reset {
            self.carry_tokens = self.carry_tokens.saturating_add(self.last_tokens);
            self.carry_cost += self.last_cost;
        }
        self.last_tokens = tokens;
        self.last_cost = cost;
        reset
    }

    /// Totals including the current session
    pub fn lifetime(&self) -> Lifetime {
        Lifetime {
            tokens: self.carry_tokens.saturating_add(self.last_tokens),
            cost: self.carry_cost + self.last_cost,
        }
    }

    /// Replace negative or non-finite costs loaded from disk with zero
    fn sanitized(mut self) -> Self {
        self.last_cost = non_negative(self.last_cost);
        self.carry_cost = non_negative(self.carry_cost);
        self
    }
}

/// Lifetime totals across all observed sessions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    pub tokens: u64,
    pub cost: f64,
}

/// Updates the session state document on every render
pub struct SessionAccumulator {
    file: JsonFile,
}

impl SessionAccumulator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// Fold the current session's counters into the persisted state
    ///
    /// Never fails: a missing or corrupt state starts from zero and a failed
    /// write only costs the carry-over for the next invocation.
    pub fn accumulate(&self, tokens: u64, cost: f64) -> Lifetime {
        let mut state = self.file.load_or_default::<SessionState>().sanitized();

        if state.observe(tokens, non_negative(cost)) {
            info!(
                "Session counters reset; carrying {} tokens (${:.2}) total",
                state.carry_tokens, state.carry_cost
            );
        }

        if let Err(e) = self.file.save(&state) {
            warn!("Failed to persist session state: {:#}", e);
        } else {
            debug!("Session state saved to {}", self.file.path().display());
        }

        state.lifetime()
    }

    /// Current persisted state (zeroed if missing or corrupt)
    pub fn state(&self) -> SessionState {
        self.file.load_or_default::<SessionState>().sanitized()
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
