//! Caching subsystem.
//!
//! - [`CacheStore`] — the storage contract: opaque serialized payloads with
//!   a per-entry TTL. Two implementations ship:
//!   [`MemoryCacheStore`] (moka, in-process) and [`SqliteCacheStore`]
//!   (a table shared by several processes).
//!
//! - [`ResponseCache`] — typed façade every adapter goes through. It
//!   serializes values to JSON, keys them with [`CacheKey`], and implements
//!   load-or-compute. Store failures never reach the caller: a broken store
//!   degrades to "always miss".
//!
//! - [`Ttl`] — TTL classes keyed on data volatility.

mod key;
mod memory;
pub mod response;
mod sqlite;
mod ttl;

pub use key::{CacheKey, CacheKeyBuilder};
pub use memory::MemoryCacheStore;
pub use response::ResponseCache;
pub use sqlite::SqliteCacheStore;
pub use ttl::Ttl;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Storage contract for cached payloads.
///
/// Values are serialized text; two loads of the same live key return
/// byte-identical payloads. A read at or after the entry's expiry is a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name used in logs and metrics labels.
    fn name(&self) -> &str;

    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite `key`, fresh for `ttl` from now.
    async fn save(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Drop every entry.
    async fn clear(&self) -> Result<()>;
}

/// Configuration for the in-memory store.
///
/// ```rust
/// # use huginn::CacheConfig;
/// let config = CacheConfig::new().max_entries(50_000);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}
