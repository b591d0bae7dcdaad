//! Audit Store - 감사 기록 저장소 인터페이스
//!
//! Append-only persistence boundary for audit records. Adapters decide the
//! durable medium; callers only see these logical predicates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::audit::{AuditId, AuditRecord};
use crate::{Error, Result};

/// 감사 기록 저장소
///
/// Contract shared by every adapter:
/// - `append` either returns the persisted record with its id or an explicit
///   error. Records are never dropped silently.
/// - Finders return a snapshot. A concurrent append is either fully visible or
///   not visible at all.
/// - "No results" is an empty `Vec`, never an error.
/// - `find_by_actor`, `find_by_operation` and `find_by_time_range` return
///   records oldest first; `find_recent` returns newest first.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a new record and assign its id.
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord>;

    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>>;

    async fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditRecord>>;

    /// Records with `start <= timestamp <= end`.
    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>>;

    async fn find_by_operation(&self, operation: &str) -> Result<Vec<AuditRecord>>;

    /// Up to `limit` records ordered by timestamp, newest first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditRecord>>;

    /// 저장된 기록 수
    async fn count(&self) -> Result<u64>;
}

/// Checks every adapter performs before accepting a record.
pub(crate) fn check_appendable(record: &AuditRecord) -> Result<()> {
    if let Some(id) = record.id() {
        return Err(Error::validation(format!(
            "audit record {} is already persisted",
            id
        )));
    }
    record.validate()
}
