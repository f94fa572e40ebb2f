//! Storage contract and records for request statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Timestamp format persisted by stores. Lexicographic order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted form of a timestamp, e.g. `2024-05-01 13:07:42`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Hour bucket a timestamp falls into, e.g. `2024-05-01 13:00:00`.
pub fn hour_bucket(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:00:00").to_string()
}

/// One completed request, as handed to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Normalized path, base path already stripped.
    pub path: String,
    pub method: String,
    pub status: u16,
    pub latency_ms: f64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestRecord {
    pub fn new(path: impl Into<String>, method: impl Into<String>, status: u16, latency_ms: f64) -> Self {
        Self {
            path: path.into(),
            method: method.into().to_uppercase(),
            status,
            latency_ms,
            ip: None,
            user_agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Success is any status in `[200, 400)`.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Aggregate for one `(path, method)` pair.
///
/// `requests == success + errors` and `avg_time == total_time / requests`
/// hold after every update; `min_time`/`max_time` only ever widen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStat {
    pub path: String,
    pub method: String,
    pub requests: u64,
    pub success: u64,
    pub errors: u64,
    pub total_time: f64,
    pub avg_time: f64,
    pub min_time: Option<f64>,
    pub max_time: Option<f64>,
    pub last_request_at: Option<String>,
}

/// A row of the append-only request log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub status: u16,
    pub latency_ms: f64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: String,
    pub requests: u64,
}

/// Transactional storage for request statistics.
///
/// Implementations must tolerate many concurrent writers: `record` is one
/// atomic unit covering the log append, the endpoint aggregate upsert and
/// the hourly upsert. A failed `record` leaves no partial state behind.
///
/// Calls are synchronous; async callers go through
/// [`StatsRecorder`](super::StatsRecorder), which moves them off the runtime.
pub trait StatsStore: Send + Sync {
    fn record(&self, record: &RequestRecord) -> Result<()>;

    /// All endpoint aggregates, busiest first.
    fn endpoints(&self) -> Result<Vec<EndpointStat>>;

    fn endpoint(&self, path: &str, method: &str) -> Result<Option<EndpointStat>>;

    /// Hour buckets at or after the bucket containing `since`, oldest first.
    fn hourly_since(&self, since: DateTime<Utc>) -> Result<Vec<HourlyBucket>>;

    /// Newest log entries first.
    fn recent_requests(&self, limit: usize) -> Result<Vec<RequestLogEntry>>;

    fn recent_for_endpoint(&self, path: &str, method: &str, limit: usize) -> Result<Vec<RequestLogEntry>>;

    /// Log entries at or after `since`.
    fn count_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Clear aggregates, hourly buckets and the request log.
    fn reset(&self) -> Result<()>;

    /// Delete log entries older than `cutoff`. Aggregates are untouched.
    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
