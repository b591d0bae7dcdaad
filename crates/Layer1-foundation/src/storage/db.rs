//! SQLite Audit Store
//!
//! Durable adapter for [`AuditStore`]:
//! - One row per audit record, written once and never updated
//! - Timestamps stored as epoch microseconds so range predicates are numeric
//! - Every statement runs on the blocking pool, so callers can bound an
//!   append with a timeout without stalling the async runtime
//! - Appends go through the writer connection, finders through a separate
//!   read-only connection on the same WAL file
//!
//! ## Migration System
//!
//! Database schema is versioned. Migrations run automatically on open.
//! - Version 1: Initial schema (audit_records, actor and timestamp indexes)
//! - Version 2: Add operation index for operation lookups

use super::store::{check_appendable, AuditStore};
use crate::audit::{AuditId, AuditRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str =
    "id, actor, operation, timestamp, duration_ms, succeeded, detail";

/// Audit store backed by a SQLite database
pub struct SqliteAuditStore {
    writer: Arc<Mutex<Connection>>,
    /// Finder connection. Shares `writer` for in-memory databases.
    reader: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create data directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        // WAL lets the reader connection run while an append is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        let mut store = Self::from_connection(conn)?;
        store.reader = Arc::new(Mutex::new(Self::open_reader(path)?));

        info!(db_path = %path.display(), "Audit store opened");
        Ok(store)
    }

    fn open_reader(path: &Path) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| Error::Storage(format!("Failed to open read connection: {}", e)))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::Storage(format!("Failed to set busy timeout: {}", e)))?;
        Ok(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::Storage(format!("Failed to set busy timeout: {}", e)))?;

        let writer = Arc::new(Mutex::new(conn));
        let store = Self {
            reader: Arc::clone(&writer),
            writer,
        };

        store.initialize_schema()?;
        store.run_migrations()?;

        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| Error::Storage("Lock poisoned".to_string()))
    }

    /// Get current schema version from database
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("Failed to get schema version: {}", e)))
    }

    /// Initialize database schema (base tables)
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Audit records (append-only)
            CREATE TABLE IF NOT EXISTS audit_records (
                id TEXT PRIMARY KEY,
                actor TEXT NOT NULL CHECK(length(trim(actor)) > 0),
                operation TEXT NOT NULL CHECK(length(trim(operation)) > 0),
                timestamp INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL CHECK(duration_ms >= 0),
                succeeded INTEGER NOT NULL CHECK(succeeded IN (0, 1)),
                detail TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_records_timestamp
                ON audit_records(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_records_actor
                ON audit_records(actor, timestamp);

            -- Insert initial schema version if not exists
            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run all pending migrations
    fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version()?;

        if current_version >= CURRENT_SCHEMA_VERSION {
            debug!(
                "Audit schema is up to date (version {})",
                current_version
            );
            return Ok(());
        }

        info!(
            "Running audit schema migrations from version {} to {}",
            current_version, CURRENT_SCHEMA_VERSION
        );

        let conn = self.lock()?;

        for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
            match version {
                2 => Self::migrate_v2(&conn)?,
                _ => {
                    warn!("Unknown migration version: {}", version);
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| Error::Storage(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration to version {}", version);
        }

        Ok(())
    }

    /// Migration to version 2: index operation lookups
    fn migrate_v2(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_records_operation
                ON audit_records(operation, timestamp)",
            [],
        )
        .map_err(|e| Error::Storage(format!("Failed to create operation index: {}", e)))?;

        Ok(())
    }

    /// Run `f` against `conn` on the blocking pool.
    async fn with_conn<T, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Storage("Lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Storage(format!("Storage task failed: {}", e)))?
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        Self::with_conn(&self.reader, f).await
    }

    /// 행을 AuditRecord로 변환
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AuditRecord> {
        let id: String = row.get("id")?;
        let actor: String = row.get("actor")?;
        let operation: String = row.get("operation")?;
        let micros: i64 = row.get("timestamp")?;
        let duration_ms: u64 = row.get("duration_ms")?;
        let succeeded: bool = row.get("succeeded")?;
        let detail: Option<String> = row.get("detail")?;

        let timestamp = DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, micros))?;

        let record = AuditRecord::new(actor, operation)
            .with_id(AuditId::from(id))
            .with_timestamp(timestamp)
            .with_duration_ms(duration_ms)
            .with_succeeded(succeeded);

        let record = match detail {
            Some(detail) => record.with_detail(detail),
            None => record,
        };

        Ok(record)
    }

    fn select(conn: &Connection, clause: &str, args: &[&dyn ToSql]) -> Result<Vec<AuditRecord>> {
        let sql = format!("SELECT {} FROM audit_records {}", RECORD_COLUMNS, clause);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Storage(format!("Failed to prepare query: {}", e)))?;

        let records = stmt
            .query_map(args, Self::row_to_record)
            .map_err(|e| Error::Storage(format!("Failed to query audit records: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Storage(format!("Failed to read audit record: {}", e)))?;

        Ok(records)
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord> {
        check_appendable(&record)?;

        let id = AuditId::generate();
        let record = record.with_id(id.clone());
        let row = record.clone();

        // Set when the caller stops waiting, e.g. on timeout. A write still
        // queued behind the lock is then skipped instead of landing unseen.
        let abandoned = Arc::new(AtomicBool::new(false));
        let _on_drop = AbandonOnDrop(Arc::clone(&abandoned));

        Self::with_conn(&self.writer, move |conn| {
            if abandoned.load(Ordering::SeqCst) {
                return Err(Error::storage("append abandoned before it was written"));
            }
            conn.execute(
                r#"
                INSERT INTO audit_records (
                    id, actor, operation, timestamp, duration_ms, succeeded, detail
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    id.as_str(),
                    row.actor(),
                    row.operation(),
                    row.timestamp().timestamp_micros(),
                    row.duration_millis(),
                    row.succeeded(),
                    row.detail(),
                ],
            )
            .map_err(|e| Error::Storage(format!("Failed to append audit record: {}", e)))?;
            Ok(())
        })
        .await?;

        debug!(
            audit_id = %record.id().map(AuditId::as_str).unwrap_or_default(),
            actor = %record.actor(),
            operation = %record.operation(),
            "Audit record appended"
        );

        Ok(record)
    }

    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>> {
        let id = id.as_str().to_string();

        self.read(move |conn| {
            let sql = format!("SELECT {} FROM audit_records WHERE id = ?1", RECORD_COLUMNS);
            conn.query_row(&sql, params![id], Self::row_to_record)
                .optional()
                .map_err(|e| Error::Storage(format!("Failed to get audit record: {}", e)))
        })
        .await
    }

    async fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditRecord>> {
        let actor = actor.to_string();

        self.read(move |conn| {
            Self::select(
                conn,
                "WHERE actor = ?1 ORDER BY timestamp ASC, rowid ASC",
                params![actor],
            )
        })
        .await
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>> {
        // Stored values are whole microseconds: round start up, end down
        let start = ceil_micros(start);
        let end = end.timestamp_micros();

        self.read(move |conn| {
            Self::select(
                conn,
                "WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY timestamp ASC, rowid ASC",
                params![start, end],
            )
        })
        .await
    }

    async fn find_by_operation(&self, operation: &str) -> Result<Vec<AuditRecord>> {
        let operation = operation.to_string();

        self.read(move |conn| {
            Self::select(
                conn,
                "WHERE operation = ?1 ORDER BY timestamp ASC, rowid ASC",
                params![operation],
            )
        })
        .await
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.read(move |conn| {
            Self::select(
                conn,
                "ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
                params![limit],
            )
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.read(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM audit_records", [], |row| row.get(0))
                .map_err(|e| Error::Storage(format!("Failed to count audit records: {}", e)))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }
}

struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn ceil_micros(instant: DateTime<Utc>) -> i64 {
    let micros = instant.timestamp_micros();
    if instant.timestamp_subsec_nanos() % 1_000 == 0 {
        micros
    } else {
        micros + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteAuditStore::in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);

        let stored = store
            .append(AuditRecord::new("alice", "login").with_duration_ms(42))
            .await
            .unwrap();

        let id = stored.id().cloned().expect("id assigned on append");
        let fetched = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_detail_round_trip() {
        let store = SqliteAuditStore::in_memory().unwrap();

        let stored = store
            .append(AuditRecord::new("bob", "backup").failed("disk full"))
            .await
            .unwrap();

        let fetched = store.find_by_actor("bob").await.unwrap();
        assert_eq!(fetched, vec![stored]);
        assert!(!fetched[0].succeeded());
        assert_eq!(fetched[0].detail(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_rejects_persisted_record() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let stored = store.append(AuditRecord::new("alice", "login")).await.unwrap();

        let err = store.append(stored).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_time_range_ignores_arrival_order() {
        let store = SqliteAuditStore::in_memory().unwrap();

        for (hour, op) in [(12, "c"), (9, "a"), (15, "d"), (10, "b")] {
            store
                .append(AuditRecord::new("alice", op).with_timestamp(at(hour, 0)))
                .await
                .unwrap();
        }

        let found = store
            .find_by_time_range(at(9, 30), at(12, 0))
            .await
            .unwrap();
        let ops: Vec<_> = found.iter().map(|r| r.operation()).collect();
        assert_eq!(ops, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_time_range_bounds_are_inclusive() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store
            .append(AuditRecord::new("bob", "login").with_timestamp(at(10, 0)))
            .await
            .unwrap();

        assert_eq!(
            store.find_by_time_range(at(10, 0), at(10, 0)).await.unwrap().len(),
            1
        );

        let just_after = at(10, 0) + chrono::Duration::nanoseconds(1);
        assert!(store
            .find_by_time_range(just_after, at(11, 0))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let store = SqliteAuditStore::in_memory().unwrap();

        for (minute, op) in [(5, "second"), (1, "first"), (9, "third")] {
            store
                .append(AuditRecord::new("alice", op).with_timestamp(at(8, minute)))
                .await
                .unwrap();
        }

        let recent = store.find_recent(2).await.unwrap();
        let ops: Vec<_> = recent.iter().map(|r| r.operation()).collect();
        assert_eq!(ops, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn test_find_by_operation_and_empty_results() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.append(AuditRecord::new("alice", "login")).await.unwrap();
        store.append(AuditRecord::new("bob", "login")).await.unwrap();
        store.append(AuditRecord::new("bob", "purchase")).await.unwrap();

        assert_eq!(store.find_by_operation("login").await.unwrap().len(), 2);
        assert!(store.find_by_operation("logout").await.unwrap().is_empty());
        assert!(store.find_by_actor("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.db");

        {
            let store = SqliteAuditStore::open(&path).unwrap();
            store.append(AuditRecord::new("alice", "login")).await.unwrap();
        }

        let store = SqliteAuditStore::open(&path).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends() {
        let store = Arc::new(SqliteAuditStore::in_memory().unwrap());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(AuditRecord::new(format!("user-{}", i % 4), "sync"))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 32);
        assert_eq!(store.find_by_actor("user-0").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_busy_reader_does_not_block_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteAuditStore::open(dir.path().join("audit.db")).unwrap();

        // Reader connection held as if a long scan were running
        let scanning = store.reader.lock().unwrap();
        let appended = tokio::time::timeout(
            Duration::from_secs(2),
            store.append(AuditRecord::new("alice", "login")),
        )
        .await;
        drop(scanning);

        assert!(appended.expect("append waited on the reader").is_ok());
        assert_eq!(store.find_by_actor("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_append_is_not_written() {
        let store = SqliteAuditStore::in_memory().unwrap();

        let busy = store.writer.lock().unwrap();
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            store.append(AuditRecord::new("alice", "login")),
        )
        .await;
        assert!(outcome.is_err());
        drop(busy);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
