//! Core library for chonker.
//!
//! Everything here is disk-backed state shared between short-lived status
//! line invocations: lifetime session counters and a cache of the remote
//! rate-limit usage, refreshed with a stale-while-revalidate policy.

pub mod paths;
pub mod session;
pub mod store;
pub mod usage;

pub use paths::ChonkerPaths;
pub use session::{Lifetime, SessionAccumulator, SessionState};
pub use store::JsonFile;
