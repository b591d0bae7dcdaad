//! In-memory Audit Store
//!
//! Same contract as the SQLite adapter, kept in a `Vec` behind a lock.
//! Used by tests and by embedders that do not need durability. It can also
//! simulate an unavailable or slow medium.

use super::store::{check_appendable, AuditStore};
use crate::audit::{AuditId, AuditRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Audit store kept entirely in memory
#[derive(Default)]
pub struct MemoryAuditStore {
    /// Records in arrival order
    records: RwLock<Vec<AuditRecord>>,
    unavailable: AtomicBool,
    append_delay_ms: AtomicU64,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a storage error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay each append by `delay` before the record is committed.
    pub fn set_append_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.append_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Copy of everything stored, in arrival order.
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::storage("audit store is unavailable"));
        }
        Ok(())
    }

    /// Records matching `predicate`, oldest first. Ties keep arrival order.
    fn select(&self, predicate: impl Fn(&AuditRecord) -> bool) -> Result<Vec<AuditRecord>> {
        self.ensure_available()?;

        let mut found: Vec<AuditRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect();

        found.sort_by_key(|r| r.timestamp());
        Ok(found)
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord> {
        self.ensure_available()?;
        check_appendable(&record)?;

        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let record = record.with_id(AuditId::generate());
        self.records.write().push(record.clone());

        debug!(
            actor = %record.actor(),
            operation = %record.operation(),
            "Audit record appended (memory)"
        );

        Ok(record)
    }

    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>> {
        self.ensure_available()?;

        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned())
    }

    async fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditRecord>> {
        self.select(|r| r.actor() == actor)
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>> {
        self.select(|r| start <= r.timestamp() && r.timestamp() <= end)
    }

    async fn find_by_operation(&self, operation: &str) -> Result<Vec<AuditRecord>> {
        self.select(|r| r.operation() == operation)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let mut all = self.select(|_| true)?;
        // Newest first; among equal timestamps the later arrival wins
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }

    async fn count(&self) -> Result<u64> {
        self.ensure_available()?;
        Ok(self.records.read().len() as u64)
    }
}
