//! Aggregated statistics views.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::store::{EndpointStat, HourlyBucket, RequestLogEntry};

/// Aggregated view served by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_requests: u64,
    /// Percentage, 0–100, two decimals.
    pub success_rate: f64,
    /// Milliseconds, weighted by request volume, two decimals.
    pub avg_response_time: f64,
    pub endpoint_count: usize,
    pub top_endpoints: Vec<EndpointSummary>,
    pub categories: Vec<CategoryStat>,
    /// Trailing 24 h: hour bucket → request count.
    pub by_hour: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    /// The snapshot for a store with zero requests.
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            success_rate: 100.0,
            avg_response_time: 0.0,
            endpoint_count: 0,
            top_endpoints: Vec::new(),
            categories: Vec::new(),
            by_hour: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub path: String,
    pub method: String,
    pub requests: u64,
    pub success: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub avg_time: f64,
    pub min_time: Option<f64>,
    pub max_time: Option<f64>,
    pub last_request_at: Option<String>,
}

/// Rollup by first path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub name: String,
    pub requests: u64,
    pub errors: u64,
    pub avg_time: f64,
}

/// Lightweight view pushed by the live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub requests_last_minute: u64,
    pub total_requests: u64,
    pub recent: Vec<RequestLogEntry>,
    pub timestamp: String,
}

/// One endpoint's aggregate plus its latest log entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointActivity {
    pub endpoint: EndpointStat,
    pub recent: Vec<RequestLogEntry>,
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        100.0
    } else {
        round2(part as f64 * 100.0 / whole as f64)
    }
}

/// Category of a normalized path: its first segment, `root` for `/`.
pub fn category(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root")
}

/// Build a snapshot from endpoint aggregates (busiest first) and hour buckets.
pub fn build(endpoints: &[EndpointStat], hourly: &[HourlyBucket], top_n: usize) -> StatsSnapshot {
    let total_requests: u64 = endpoints.iter().map(|e| e.requests).sum();
    if total_requests == 0 {
        return StatsSnapshot::empty();
    }
    let total_success: u64 = endpoints.iter().map(|e| e.success).sum();
    let total_time: f64 = endpoints.iter().map(|e| e.total_time).sum();

    let mut ranked: Vec<&EndpointStat> = endpoints.iter().collect();
    ranked.sort_by(|a, b| {
        b.requests
            .cmp(&a.requests)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.method.cmp(&b.method))
    });
    let top_endpoints = ranked
        .into_iter()
        .take(top_n)
        .map(|e| EndpointSummary {
            path: e.path.clone(),
            method: e.method.clone(),
            requests: e.requests,
            success: e.success,
            errors: e.errors,
            success_rate: percent(e.success, e.requests),
            avg_time: round2(e.avg_time),
            min_time: e.min_time.map(round2),
            max_time: e.max_time.map(round2),
            last_request_at: e.last_request_at.clone(),
        })
        .collect();

    // name -> (requests, errors, total_time)
    let mut rollup: HashMap<&str, (u64, u64, f64)> = HashMap::new();
    for e in endpoints {
        let slot = rollup.entry(category(&e.path)).or_default();
        slot.0 += e.requests;
        slot.1 += e.errors;
        slot.2 += e.total_time;
    }
    let mut categories: Vec<CategoryStat> = rollup
        .into_iter()
        .map(|(name, (requests, errors, time))| CategoryStat {
            name: name.to_string(),
            requests,
            errors,
            avg_time: if requests == 0 {
                0.0
            } else {
                round2(time / requests as f64)
            },
        })
        .collect();
    categories.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.name.cmp(&b.name)));

    StatsSnapshot {
        total_requests,
        success_rate: percent(total_success, total_requests),
        avg_response_time: round2(total_time / total_requests as f64),
        endpoint_count: endpoints.len(),
        top_endpoints,
        categories,
        by_hour: hourly
            .iter()
            .map(|b| (b.hour.clone(), b.requests))
            .collect(),
    }
}
