//! Cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_DETAIL_TTL_SECS: u64 = 86_400; // 24h
const DEFAULT_LIST_TTL_SECS: u64 = 43_200; // 12h
const DEFAULT_LINK_TTL_SECS: u64 = 21_600; // 6h
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 250;
const DEFAULT_POPULAR_COUNT: u32 = 10;
const DEFAULT_ACCESS_QUEUE_CAPACITY: usize = 1024;

/// Cache configuration from `studyhall.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the read-through cache. Ranking stays active regardless.
    pub enabled: bool,
    /// TTL for single-entity detail entries, in seconds.
    pub detail_ttl_seconds: u64,
    /// TTL for category list entries, in seconds.
    pub list_ttl_seconds: u64,
    /// TTL for association read-views, in seconds.
    pub link_ttl_seconds: u64,
    /// Upper bound on any single cache backend call, in milliseconds.
    pub backend_timeout_ms: u64,
    /// Top-N count used when a caller asks for zero results.
    pub popular_count: u32,
    /// Capacity of the bounded access-event queue; events beyond it are
    /// dropped and counted.
    pub access_queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detail_ttl_seconds: DEFAULT_DETAIL_TTL_SECS,
            list_ttl_seconds: DEFAULT_LIST_TTL_SECS,
            link_ttl_seconds: DEFAULT_LINK_TTL_SECS,
            backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            popular_count: DEFAULT_POPULAR_COUNT,
            access_queue_capacity: DEFAULT_ACCESS_QUEUE_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_seconds)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_seconds)
    }

    pub fn link_ttl(&self) -> Duration {
        Duration::from_secs(self.link_ttl_seconds)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// At least one event fits even when configured to zero.
    pub fn access_queue_capacity_non_zero(&self) -> usize {
        self.access_queue_capacity.max(1)
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            detail_ttl_seconds: settings.detail_ttl_seconds,
            list_ttl_seconds: settings.list_ttl_seconds,
            link_ttl_seconds: settings.link_ttl_seconds,
            backend_timeout_ms: settings.backend_timeout_ms,
            popular_count: settings.popular_count,
            access_queue_capacity: settings.access_queue_capacity,
        }
    }
}
