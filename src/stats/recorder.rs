//! Async façade over a [`StatsStore`].
//!
//! [`StatsRecorder`] is what request handlers and the telemetry middleware
//! hold. It moves blocking store calls onto tokio's blocking pool and owns
//! the cached aggregate snapshot.
//!
//! # Failure semantics
//!
//! - [`log_request`](StatsRecorder::log_request) never fails the caller: a
//!   write error is logged at `warn`, counted in
//!   [`STATS_WRITE_FAILURES_TOTAL`](crate::telemetry::STATS_WRITE_FAILURES_TOTAL),
//!   and the request is simply not counted.
//! - [`stats`](StatsRecorder::stats) falls back to the empty snapshot.
//! - [`reset`](StatsRecorder::reset) is administrative and does report errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{instrument, warn};

use super::snapshot::{self, EndpointActivity, LiveSnapshot, StatsSnapshot};
use super::store::{RequestRecord, StatsStore, format_timestamp};
use crate::cache::{CacheKey, ResponseCache, Ttl};
use crate::error::{HuginnError, Result};
use crate::telemetry;

/// Tunables for the recorder.
///
/// ```rust
/// # use huginn::stats::StatsConfig;
/// # use std::time::Duration;
/// let config = StatsConfig::new().snapshot_ttl(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// How long the aggregate snapshot is served from cache. Default: 60 s.
    pub snapshot_ttl: Duration,
    /// Request-log rows older than this are pruned. Default: 7 days.
    pub retention: Duration,
    /// Entries in `topEndpoints`. Default: 10.
    pub top_n: usize,
    /// Entries in the live view. Default: 20.
    pub live_recent: usize,
    /// Entries in the per-endpoint activity view. Default: 50.
    pub endpoint_recent: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(60),
            retention: Duration::from_secs(7 * 24 * 3600),
            top_n: 10,
            live_recent: 20,
            endpoint_recent: 50,
        }
    }
}

impl StatsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }
}

fn snapshot_key() -> CacheKey {
    CacheKey::fixed("stats", "snapshot")
}

/// Records requests and serves aggregated views. Cheap to clone.
#[derive(Clone)]
pub struct StatsRecorder {
    store: Arc<dyn StatsStore>,
    cache: ResponseCache,
    config: StatsConfig,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn StatsStore>, cache: ResponseCache, config: StatsConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Run a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StatsStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| HuginnError::Storage(format!("stats task failed: {e}")))?
    }

    /// Record one completed request. Fire-and-forget: never fails.
    #[instrument(skip(self, record), fields(path = %record.path, method = %record.method, status = record.status))]
    pub async fn log_request(&self, record: RequestRecord) {
        match self.blocking(move |store| store.record(&record)).await {
            Ok(()) => self.cache.invalidate(&snapshot_key()).await,
            Err(e) => {
                warn!(error = %e, "dropping request statistics");
                metrics::counter!(telemetry::STATS_WRITE_FAILURES_TOTAL).increment(1);
            }
        }
    }

    /// The aggregated snapshot, served from cache when fresh.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> StatsSnapshot {
        let ttl = Ttl::Custom(self.config.snapshot_ttl);
        match self
            .cache
            .load_or_compute(&snapshot_key(), ttl, || self.compute_snapshot())
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "stats unavailable, serving empty snapshot");
                StatsSnapshot::empty()
            }
        }
    }

    async fn compute_snapshot(&self) -> Result<StatsSnapshot> {
        // 24 buckets: the current hour and the 23 before it
        let since = Utc::now() - chrono::Duration::hours(23);
        let top_n = self.config.top_n;
        self.blocking(move |store| {
            let endpoints = store.endpoints()?;
            let hourly = store.hourly_since(since)?;
            Ok(snapshot::build(&endpoints, &hourly, top_n))
        })
        .await
    }

    /// Clear every statistic. Irreversible.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        self.blocking(|store| store.reset()).await?;
        self.cache.invalidate(&snapshot_key()).await;
        tracing::info!("statistics reset");
        Ok(())
    }

    /// Delete request-log rows past retention. Returns rows removed.
    #[instrument(skip(self))]
    pub async fn prune(&self) -> usize {
        let cutoff = chrono::Duration::from_std(self.config.retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention));
        // retention reaches past the earliest representable time
        let Some(cutoff) = cutoff else {
            return 0;
        };
        match self.blocking(move |store| store.prune_before(cutoff)).await {
            Ok(n) => {
                tracing::debug!(removed = n, "pruned request log");
                n
            }
            Err(e) => {
                warn!(error = %e, "request log prune failed");
                0
            }
        }
    }

    /// Requests in the last minute, lifetime total and the latest entries.
    pub async fn live(&self) -> Result<LiveSnapshot> {
        let now = Utc::now();
        let limit = self.config.live_recent;
        self.blocking(move |store| {
            let requests_last_minute = store.count_since(now - chrono::Duration::minutes(1))?;
            let total_requests: u64 = store.endpoints()?.iter().map(|e| e.requests).sum();
            let recent = store.recent_requests(limit)?;
            Ok(LiveSnapshot {
                requests_last_minute,
                total_requests,
                recent,
                timestamp: format_timestamp(now),
            })
        })
        .await
    }

    /// One endpoint's aggregate and its most recent log entries.
    pub async fn endpoint_activity(&self, path: &str, method: &str) -> Result<EndpointActivity> {
        let path = path.to_string();
        let method = method.to_uppercase();
        let limit = self.config.endpoint_recent;
        self.blocking(move |store| {
            let endpoint = store
                .endpoint(&path, &method)?
                .ok_or_else(|| HuginnError::NotFound(format!("no statistics for {method} {path}")))?;
            let recent = store.recent_for_endpoint(&path, &method, limit)?;
            Ok(EndpointActivity { endpoint, recent })
        })
        .await
    }
}

impl std::fmt::Debug for StatsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsRecorder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
