//! Rate-limit usage from the account usage endpoint, cached across renders.
//!
//! The orchestrator reads the cache, refreshes it through the fetcher when it
//! is stale, and falls back to stale data within a grace period.

pub mod cache;
pub mod credentials;
pub mod fetcher;
pub mod orchestrator;
pub mod types;

pub use cache::{CachedUsage, UsageCache, UsageCacheEntry};
pub use credentials::{ClaudeCredentials, CredentialSource};
pub use fetcher::{FetchError, HttpUsageFetcher, UsageSource};
pub use orchestrator::{
    shutdown_within, PendingRefresh, UsageOrchestrator, UsageOutcome, UsagePolicy,
    UsageResolution,
};
pub use types::{ExtraUsage, UsageBucket, UsageData, USAGE_BUCKETS};
