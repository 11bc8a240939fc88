//! Timestamped envelope around the last successful usage fetch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::types::UsageData;
use crate::store::JsonFile;

/// On-disk cache document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCacheEntry {
    /// Wall clock seconds since the epoch when `data` was fetched
    pub fetched_at: f64,
    pub data: UsageData,
}

/// Cached data together with how old it is
#[derive(Debug, Clone, PartialEq)]
pub struct CachedUsage {
    pub data: Option<UsageData>,
    /// Seconds since the fetch; infinite when nothing usable is cached
    pub age: f64,
}

impl CachedUsage {
    pub fn missing() -> Self {
        Self {
            data: None,
            age: f64::INFINITY,
        }
    }

    /// Cached data if it is younger than `max_age` seconds
    pub fn younger_than(&self, max_age: f64) -> Option<UsageData> {
        if self.age < max_age {
            self.data.clone()
        } else {
            None
        }
    }
}

/// Usage cache backed by an atomically written JSON file
#[derive(Debug, Clone)]
pub struct UsageCache {
    file: JsonFile,
}

impl UsageCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// Read the cached payload and its age; never fails
    pub fn read(&self) -> CachedUsage {
        let entry: Option<UsageCacheEntry> = self.file.load_or(None);
        match entry {
            Some(entry) if entry.fetched_at.is_finite() && entry.fetched_at > 0.0 => {
                // Clock skew can put fetched_at in the future; treat as just fetched
                let age = (unix_now() - entry.fetched_at).max(0.0);
                CachedUsage {
                    data: Some(entry.data),
                    age,
                }
            }
            Some(_) => {
                debug!("Ignoring usage cache with invalid timestamp");
                CachedUsage::missing()
            }
            None => CachedUsage::missing(),
        }
    }

    /// Store a freshly fetched payload stamped with the current time
    pub fn write(&self, data: &UsageData) {
        self.write_entry(&UsageCacheEntry {
            fetched_at: unix_now(),
            data: data.clone(),
        });
    }

    /// Store an entry as-is
    pub fn write_entry(&self, entry: &UsageCacheEntry) {
        if let Err(e) = self.file.save(entry) {
            warn!("Failed to write usage cache: {:#}", e);
        }
    }

    /// Raw entry on disk, if any
    pub fn entry(&self) -> Option<UsageCacheEntry> {
        self.file.load_or(None)
    }
}

/// Wall clock seconds since the epoch
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
