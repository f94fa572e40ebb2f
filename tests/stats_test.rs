//! Integration tests for [`StatsRecorder`] over SQLite.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use huginn::cache::ResponseCache;
use huginn::stats::{RequestRecord, SqliteStatsStore, StatsConfig, StatsRecorder, StatsSnapshot, StatsStore};
use huginn::HuginnError;

fn recorder_with(store: Arc<dyn StatsStore>) -> StatsRecorder {
    StatsRecorder::new(store, ResponseCache::in_memory(), StatsConfig::default())
}

fn recorder() -> StatsRecorder {
    recorder_with(Arc::new(SqliteStatsStore::in_memory().unwrap()))
}

#[tokio::test]
async fn dog_scenario_through_recorder() {
    let stats = recorder();
    for (status, latency) in [(200, 50.0), (200, 70.0), (500, 200.0)] {
        stats
            .log_request(RequestRecord::new("/dog", "GET", status, latency))
            .await;
    }

    let snapshot = stats.stats().await;
    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.success_rate, 66.67);
    assert_eq!(snapshot.avg_response_time, 106.67);
    assert_eq!(snapshot.endpoint_count, 1);

    let dog = &snapshot.top_endpoints[0];
    assert_eq!((dog.requests, dog.success, dog.errors), (3, 2, 1));
    assert_eq!(dog.min_time, Some(50.0));
    assert_eq!(dog.max_time, Some(200.0));
    assert_eq!(dog.avg_time, 106.67);
    assert_eq!(snapshot.categories[0].name, "dog");
    assert_eq!(snapshot.by_hour.values().sum::<u64>(), 3);
}

#[tokio::test]
async fn write_invalidates_cached_snapshot() {
    let stats = recorder();
    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 10.0))
        .await;
    assert_eq!(stats.stats().await.total_requests, 1);

    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 10.0))
        .await;
    assert_eq!(stats.stats().await.total_requests, 2);
}

#[tokio::test]
async fn reset_yields_empty_snapshot() {
    let stats = recorder();
    for path in ["/a", "/b/c", "/"] {
        stats
            .log_request(RequestRecord::new(path, "POST", 201, 3.0))
            .await;
    }
    assert_eq!(stats.stats().await.total_requests, 3);

    stats.reset().await.unwrap();

    assert_eq!(stats.stats().await, StatsSnapshot::empty());
    let live = stats.live().await.unwrap();
    assert_eq!(live.total_requests, 0);
    assert!(live.recent.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.db");

    // Two handles on one file stand in for two daemon processes.
    let first = recorder_with(Arc::new(SqliteStatsStore::open(&path).unwrap()));
    let second = recorder_with(Arc::new(SqliteStatsStore::open(&path).unwrap()));

    let mut tasks = Vec::new();
    for worker in 0..8u32 {
        let stats = if worker % 2 == 0 {
            first.clone()
        } else {
            second.clone()
        };
        tasks.push(tokio::spawn(async move {
            for i in 0..25u32 {
                let status = if i % 5 == 0 { 503 } else { 200 };
                let latency = f64::from(worker * 100 + i + 1);
                stats
                    .log_request(RequestRecord::new("/load", "GET", status, latency))
                    .await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let activity = first.endpoint_activity("/load", "get").await.unwrap();
    let stat = activity.endpoint;
    assert_eq!(stat.requests, 200);
    assert_eq!(stat.errors, 8 * 5);
    assert_eq!(stat.success + stat.errors, stat.requests);
    assert_eq!(stat.min_time, Some(1.0));
    assert_eq!(stat.max_time, Some(725.0));
    assert!((stat.avg_time - stat.total_time / 200.0).abs() < 1e-6);
    assert_eq!(activity.recent.len(), 50);
}

#[tokio::test]
async fn prune_drops_only_old_log_rows() {
    let stats = StatsRecorder::new(
        Arc::new(SqliteStatsStore::in_memory().unwrap()),
        ResponseCache::in_memory(),
        StatsConfig::new().retention(Duration::from_secs(24 * 3600)),
    );
    let now = Utc::now();
    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 1.0).at(now - chrono::Duration::days(3)))
        .await;
    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 1.0).at(now - chrono::Duration::hours(2)))
        .await;
    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 1.0))
        .await;

    assert_eq!(stats.prune().await, 1);
    assert_eq!(stats.prune().await, 0);

    let activity = stats.endpoint_activity("/a", "GET").await.unwrap();
    assert_eq!(activity.endpoint.requests, 3, "aggregates survive pruning");
    assert_eq!(activity.recent.len(), 2);
}

#[tokio::test]
async fn prune_with_unbounded_retention_keeps_everything() {
    let stats = StatsRecorder::new(
        Arc::new(SqliteStatsStore::in_memory().unwrap()),
        ResponseCache::in_memory(),
        StatsConfig::new().retention(Duration::MAX),
    );
    stats
        .log_request(RequestRecord::new("/a", "GET", 200, 1.0).at(Utc::now() - chrono::Duration::days(400)))
        .await;

    assert_eq!(stats.prune().await, 0);
    let activity = stats.endpoint_activity("/a", "GET").await.unwrap();
    assert_eq!(activity.recent.len(), 1);
}

#[tokio::test]
async fn by_hour_covers_the_last_24_buckets() {
    let stats = recorder();
    let now = Utc::now();
    let bucket = |ts: chrono::DateTime<Utc>| ts.format("%Y-%m-%d %H:00:00").to_string();
    for hours_ago in [24, 23, 0] {
        stats
            .log_request(
                RequestRecord::new("/a", "GET", 200, 1.0).at(now - chrono::Duration::hours(hours_ago)),
            )
            .await;
    }

    let snapshot = stats.stats().await;
    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.by_hour.len(), 2, "{:?}", snapshot.by_hour);
    assert!(!snapshot.by_hour.contains_key(&bucket(now - chrono::Duration::hours(24))));
    assert_eq!(snapshot.by_hour.get(&bucket(now - chrono::Duration::hours(23))), Some(&1));
    assert_eq!(snapshot.by_hour.get(&bucket(now)), Some(&1));
}

#[tokio::test]
async fn live_snapshot_counts_last_minute() {
    let stats = recorder();
    stats
        .log_request(
            RequestRecord::new("/a", "GET", 200, 1.0).at(Utc::now() - chrono::Duration::minutes(5)),
        )
        .await;
    for _ in 0..3 {
        stats
            .log_request(RequestRecord::new("/b", "GET", 200, 1.0).ip("203.0.113.7"))
            .await;
    }

    let live = stats.live().await.unwrap();
    assert_eq!(live.requests_last_minute, 3);
    assert_eq!(live.total_requests, 4);
    assert_eq!(live.recent[0].path, "/b");
    assert_eq!(live.recent[0].ip.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn unknown_endpoint_is_not_found() {
    let stats = recorder();
    let err = stats.endpoint_activity("/nope", "GET").await.unwrap_err();
    assert!(matches!(err, HuginnError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
}
