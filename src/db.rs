//! Shared SQLite connection handling.
//!
//! Both the cache table and the stats tables may be shared by several
//! daemon processes, so every connection runs in WAL mode with a busy
//! timeout instead of failing fast on a locked database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{HuginnError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) a database file, creating parent directories.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            HuginnError::Storage(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let conn = Connection::open(path)?;
    configure(&conn)?;
    Ok(conn)
}

/// Private in-memory database, used by tests and cache-less deployments.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // in-memory databases answer "memory" here; that is fine
    conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
    Ok(())
}

/// Lock a shared connection, mapping poisoning to a storage error.
pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| HuginnError::Storage(format!("connection lock poisoned: {e}")))
}
