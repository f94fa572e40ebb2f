//! SQLite implementation of [`StatsStore`].
//!
//! All aggregate arithmetic runs inside SQLite as `ON CONFLICT DO UPDATE`
//! upserts, so concurrent writers (threads or processes) never lose an
//! update to a read-modify-write race. Every `record` runs in a
//! `BEGIN IMMEDIATE` transaction: the write lock is taken up front and the
//! busy timeout handles contention.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::store::{
    EndpointStat, HourlyBucket, RequestLogEntry, RequestRecord, StatsStore, format_timestamp,
    hour_bucket,
};
use crate::db;
use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS request_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    status INTEGER NOT NULL,
    latency_ms REAL NOT NULL,
    ip TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_request_log_created ON request_log(created_at);
CREATE INDEX IF NOT EXISTS idx_request_log_endpoint ON request_log(path, method, created_at);

CREATE TABLE IF NOT EXISTS endpoint_stats (
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    requests INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL DEFAULT 0,
    errors INTEGER NOT NULL DEFAULT 0,
    total_time REAL NOT NULL DEFAULT 0,
    avg_time REAL NOT NULL DEFAULT 0,
    min_time REAL,
    max_time REAL,
    last_request_at TEXT,
    PRIMARY KEY (path, method)
);

CREATE TABLE IF NOT EXISTS hourly_stats (
    hour TEXT PRIMARY KEY,
    requests INTEGER NOT NULL DEFAULT 0
);
";

const INSERT_LOG: &str = "
INSERT INTO request_log (path, method, status, latency_ms, ip, user_agent, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

// SET expressions all see the pre-update row, so avg/min/max use old values.
const UPSERT_ENDPOINT: &str = "
INSERT INTO endpoint_stats
    (path, method, requests, success, errors, total_time, avg_time, min_time, max_time, last_request_at)
VALUES (?1, ?2, 1, ?3, ?4, ?5, ?5, ?5, ?5, ?6)
ON CONFLICT(path, method) DO UPDATE SET
    requests = requests + 1,
    success = success + excluded.success,
    errors = errors + excluded.errors,
    total_time = total_time + excluded.total_time,
    avg_time = (total_time + excluded.total_time) / (requests + 1),
    min_time = CASE
        WHEN min_time IS NULL OR excluded.min_time < min_time THEN excluded.min_time
        ELSE min_time END,
    max_time = CASE
        WHEN max_time IS NULL OR excluded.max_time > max_time THEN excluded.max_time
        ELSE max_time END,
    last_request_at = excluded.last_request_at";

const UPSERT_HOURLY: &str = "
INSERT INTO hourly_stats (hour, requests) VALUES (?1, 1)
ON CONFLICT(hour) DO UPDATE SET requests = requests + 1";

const ENDPOINT_COLUMNS: &str = "path, method, requests, success, errors, total_time, avg_time, \
                                min_time, max_time, last_request_at";

const LOG_COLUMNS: &str = "id, path, method, status, latency_ms, ip, user_agent, created_at";

pub struct SqliteStatsStore {
    conn: Mutex<Connection>,
}

impl SqliteStatsStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(db::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(db::open_in_memory()?)
    }

    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn endpoint_from_row(row: &Row<'_>) -> rusqlite::Result<EndpointStat> {
    Ok(EndpointStat {
        path: row.get(0)?,
        method: row.get(1)?,
        requests: count(row.get(2)?),
        success: count(row.get(3)?),
        errors: count(row.get(4)?),
        total_time: row.get(5)?,
        avg_time: row.get(6)?,
        min_time: row.get(7)?,
        max_time: row.get(8)?,
        last_request_at: row.get(9)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<RequestLogEntry> {
    let status: i64 = row.get(3)?;
    Ok(RequestLogEntry {
        id: row.get(0)?,
        path: row.get(1)?,
        method: row.get(2)?,
        status: u16::try_from(status).unwrap_or(0),
        latency_ms: row.get(4)?,
        ip: row.get(5)?,
        user_agent: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl StatsStore for SqliteStatsStore {
    fn record(&self, record: &RequestRecord) -> Result<()> {
        let mut conn = db::lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ts = format_timestamp(record.timestamp);
        let (success, errors) = if record.is_success() { (1, 0) } else { (0, 1) };

        tx.execute(
            INSERT_LOG,
            params![
                record.path,
                record.method,
                i64::from(record.status),
                record.latency_ms,
                record.ip,
                record.user_agent,
                ts,
            ],
        )?;
        tx.execute(
            UPSERT_ENDPOINT,
            params![
                record.path,
                record.method,
                success,
                errors,
                record.latency_ms,
                ts
            ],
        )?;
        tx.execute(UPSERT_HOURLY, params![hour_bucket(record.timestamp)])?;

        // dropping an uncommitted transaction rolls it back
        tx.commit()?;
        Ok(())
    }

    fn endpoints(&self) -> Result<Vec<EndpointStat>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENDPOINT_COLUMNS} FROM endpoint_stats ORDER BY requests DESC, path, method"
        ))?;
        let rows = stmt
            .query_map([], endpoint_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn endpoint(&self, path: &str, method: &str) -> Result<Option<EndpointStat>> {
        let conn = db::lock(&self.conn)?;
        let row = conn
            .query_row(
                &format!("SELECT {ENDPOINT_COLUMNS} FROM endpoint_stats WHERE path = ?1 AND method = ?2"),
                params![path, method],
                endpoint_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn hourly_since(&self, since: DateTime<Utc>) -> Result<Vec<HourlyBucket>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT hour, requests FROM hourly_stats WHERE hour >= ?1 ORDER BY hour")?;
        let rows = stmt
            .query_map(params![hour_bucket(since)], |r| {
                Ok(HourlyBucket {
                    hour: r.get(0)?,
                    requests: count(r.get(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn recent_requests(&self, n: usize) -> Result<Vec<RequestLogEntry>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM request_log ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit(n)], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn recent_for_endpoint(&self, path: &str, method: &str, n: usize) -> Result<Vec<RequestLogEntry>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM request_log WHERE path = ?1 AND method = ?2 \
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![path, method, limit(n)], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let conn = db::lock(&self.conn)?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM request_log WHERE created_at >= ?1",
            params![format_timestamp(since)],
            |r| r.get(0),
        )?;
        Ok(count(n))
    }

    fn reset(&self) -> Result<()> {
        let mut conn = db::lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(
            "DELETE FROM endpoint_stats; DELETE FROM hourly_stats; DELETE FROM request_log;",
        )?;
        tx.commit()?;
        Ok(())
    }

    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = db::lock(&self.conn)?;
        let n = conn.execute(
            "DELETE FROM request_log WHERE created_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(n)
    }
}
