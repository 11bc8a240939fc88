//! Stale-while-revalidate policy for the usage line.
//!
//! Per render:
//! 1. Feature disabled: nothing, without touching disk or network
//! 2. Cache younger than the TTL: serve it
//! 3. Otherwise start a refresh on the blocking pool and wait for it at most
//!    `refresh_bound`. A refresh that misses the bound keeps running so it
//!    can still warm the cache; this render falls back to the cached data if
//!    it is within the grace period.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::{CachedUsage, UsageCache};
use super::credentials::{ClaudeCredentials, CredentialSource};
use super::fetcher::{HttpUsageFetcher, UsageSource, DEFAULT_FETCH_TIMEOUT};
use super::types::UsageData;
use crate::paths::ChonkerPaths;

/// Default age below which cached data is served without a refresh
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
/// Age below which stale data is still shown when a refresh fails
pub const CACHE_GRACE: Duration = Duration::from_secs(300);
/// Longest a render waits for a refresh
pub const REFRESH_BOUND: Duration = Duration::from_secs(2);

/// Timing and feature switch for the usage subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsagePolicy {
    pub enabled: bool,
    pub ttl: Duration,
    pub grace: Duration,
    pub fetch_timeout: Duration,
    pub refresh_bound: Duration,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL,
            grace: CACHE_GRACE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            refresh_bound: REFRESH_BOUND,
        }
    }
}

/// How this render's usage data was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum UsageResolution {
    /// Cache was within the TTL
    Cached(UsageData),
    /// Refresh completed within the bound
    Refreshed(UsageData),
    /// Refresh failed or timed out; cache was within the grace period
    Stale(UsageData),
    /// Nothing to show
    Absent,
}

impl UsageResolution {
    fn stale_or_absent(data: Option<UsageData>) -> Self {
        data.map_or(Self::Absent, Self::Stale)
    }

    pub fn data(&self) -> Option<&UsageData> {
        match self {
            Self::Cached(d) | Self::Refreshed(d) | Self::Stale(d) => Some(d),
            Self::Absent => None,
        }
    }
}

/// A refresh that outlived the render's wait
///
/// Dropping it does not cancel the refresh.
#[derive(Debug)]
pub struct PendingRefresh {
    handle: JoinHandle<UsageResolution>,
}

impl PendingRefresh {
    /// Wait up to `limit` for the refresh to finish writing the cache
    ///
    /// Returns true if it finished in time.
    pub async fn wait(self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.handle).await {
            Ok(Ok(resolution)) => {
                debug!(
                    "Background refresh finished (fresh data: {})",
                    matches!(resolution, UsageResolution::Refreshed(_))
                );
                true
            }
            Ok(Err(e)) => {
                warn!("Background refresh panicked: {}", e);
                true
            }
            Err(_) => {
                debug!("Gave up waiting for background refresh");
                false
            }
        }
    }
}

/// Give a pending refresh up to `limit`, then shut the runtime down
///
/// Dropping a runtime blocks until every blocking task returns, so a refresh
/// stuck in a credential lookup or fetch would hold the process open. The
/// runtime is shut down in the background instead; a refresh still running
/// at that point is abandoned with the process.
///
/// Returns true if there was nothing left running.
pub fn shutdown_within(
    runtime: Runtime,
    pending: Option<PendingRefresh>,
    limit: Duration,
) -> bool {
    let finished = match pending {
        Some(pending) => runtime.block_on(pending.wait(limit)),
        None => true,
    };
    runtime.shutdown_background();
    finished
}

/// Result of one `get_usage_data` call
#[derive(Debug)]
pub struct UsageOutcome {
    pub resolution: UsageResolution,
    /// Set when a refresh is still running after the bound
    pub pending: Option<PendingRefresh>,
}

impl UsageOutcome {
    fn resolved(resolution: UsageResolution) -> Self {
        Self {
            resolution,
            pending: None,
        }
    }

    pub fn data(&self) -> Option<&UsageData> {
        self.resolution.data()
    }
}

/// Decides per render between cached, refreshed, stale or no usage data
pub struct UsageOrchestrator {
    policy: UsagePolicy,
    cache: UsageCache,
    credentials: Arc<dyn CredentialSource>,
    source: Arc<dyn UsageSource>,
}

impl UsageOrchestrator {
    /// Orchestrator wired to the real credentials and HTTP endpoint
    pub fn new(policy: UsagePolicy, paths: &ChonkerPaths) -> Self {
        Self::with_sources(
            policy,
            UsageCache::new(paths.usage_cache_file()),
            Arc::new(ClaudeCredentials::new(paths.credentials_file())),
            Arc::new(HttpUsageFetcher::new(policy.fetch_timeout)),
        )
    }

    pub fn with_sources(
        policy: UsagePolicy,
        cache: UsageCache,
        credentials: Arc<dyn CredentialSource>,
        source: Arc<dyn UsageSource>,
    ) -> Self {
        Self {
            policy,
            cache,
            credentials,
            source,
        }
    }

    /// Usage data for this render; never blocks longer than the refresh bound
    pub async fn get_usage_data(&self) -> UsageOutcome {
        if !self.policy.enabled {
            return UsageOutcome::resolved(UsageResolution::Absent);
        }

        let cached = self.cache.read();
        if let Some(data) = cached.younger_than(self.policy.ttl.as_secs_f64()) {
            debug!("Serving cached usage ({:.0}s old)", cached.age);
            return UsageOutcome::resolved(UsageResolution::Cached(data));
        }

        let grace = self.policy.grace.as_secs_f64();
        let fallback = cached.younger_than(grace);
        let mut handle = self.spawn_refresh(cached);

        match tokio::time::timeout(self.policy.refresh_bound, &mut handle).await {
            Ok(Ok(resolution)) => UsageOutcome::resolved(resolution),
            Ok(Err(e)) => {
                warn!("Usage refresh panicked: {}", e);
                UsageOutcome::resolved(UsageResolution::stale_or_absent(fallback))
            }
            Err(_) => {
                info!(
                    "Usage refresh exceeded {:?}; continuing in background",
                    self.policy.refresh_bound
                );
                UsageOutcome {
                    resolution: UsageResolution::stale_or_absent(fallback),
                    pending: Some(PendingRefresh { handle }),
                }
            }
        }
    }

    /// Start a refresh on the blocking pool
    fn spawn_refresh(&self, cached: CachedUsage) -> JoinHandle<UsageResolution> {
        let cache = self.cache.clone();
        let credentials = Arc::clone(&self.credentials);
        let source = Arc::clone(&self.source);
        let grace = self.policy.grace.as_secs_f64();

        tokio::task::spawn_blocking(move || {
            refresh(&cache, credentials.as_ref(), source.as_ref(), &cached, grace)
        })
    }
}

/// Fetch fresh usage and persist it, or fall back to stale-if-within-grace
fn refresh(
    cache: &UsageCache,
    credentials: &dyn CredentialSource,
    source: &dyn UsageSource,
    cached: &CachedUsage,
    grace: f64,
) -> UsageResolution {
    let stale = || UsageResolution::stale_or_absent(cached.younger_than(grace));

    let Some(token) = credentials.access_token() else {
        debug!("No access token available; skipping usage fetch");
        return stale();
    };

    match source.fetch(&token) {
        Some(data) => {
            cache.write(&data);
            UsageResolution::Refreshed(data)
        }
        None => stale(),
    }
}
