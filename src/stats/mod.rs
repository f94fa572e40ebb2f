//! Request statistics.
//!
//! Every request's latency and outcome is recorded into a transactional
//! [`StatsStore`]; [`StatsRecorder`] serves aggregated views through its own
//! short-lived snapshot cache.
//!
//! Tables:
//!
//! - `endpoint_stats` — one aggregate per `(path, method)`
//! - `hourly_stats` — request count per hour bucket
//! - `request_log` — append-only, pruned past retention

pub mod recorder;
pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use recorder::{StatsConfig, StatsRecorder};
pub use snapshot::{
    CategoryStat, EndpointActivity, EndpointSummary, LiveSnapshot, StatsSnapshot, category,
};
pub use sqlite::SqliteStatsStore;
pub use store::{EndpointStat, HourlyBucket, RequestLogEntry, RequestRecord, StatsStore};
