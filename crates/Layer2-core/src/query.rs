//! Audit Query Service
//!
//! 입력을 검증한 뒤 저장소 조회로 위임합니다.
//! - 빈 액터/작업 이름 → `Error::Validation`
//! - start > end → `Error::Validation`
//! - limit == 0 → `Error::Validation`, 상한 초과 시 `max_recent_limit`로 제한

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use trail_foundation::{AuditConfig, AuditId, AuditRecord, AuditStore, Error, Result};

/// Validated read access to the audit trail
#[derive(Clone)]
pub struct AuditQueryService {
    store: Arc<dyn AuditStore>,
    max_recent_limit: usize,
}

impl AuditQueryService {
    pub fn new(store: Arc<dyn AuditStore>, max_recent_limit: usize) -> Self {
        Self {
            store,
            max_recent_limit: max_recent_limit.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn AuditStore>, config: &AuditConfig) -> Self {
        Self::new(store, config.max_recent_limit)
    }

    /// All records of `actor`, oldest first.
    pub async fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditRecord>> {
        let actor = require_non_blank("actor", actor)?;
        debug!("Querying audit records for actor {}", actor);
        self.store.find_by_actor(actor).await
    }

    /// Records with `start <= timestamp <= end`, oldest first.
    pub async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>> {
        if start > end {
            return Err(Error::validation(format!(
                "range start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        debug!("Querying audit records between {} and {}", start, end);
        self.store.find_by_time_range(start, end).await
    }

    /// All records of `operation`, oldest first.
    pub async fn find_by_operation(&self, operation: &str) -> Result<Vec<AuditRecord>> {
        let operation = require_non_blank("operation", operation)?;
        debug!("Querying audit records for operation '{}'", operation);
        self.store.find_by_operation(operation).await
    }

    /// Up to `limit` newest records, newest first. `limit` is capped at the configured maximum.
    pub async fn find_recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        if limit == 0 {
            return Err(Error::validation("limit must be positive"));
        }
        let limit = limit.min(self.max_recent_limit);
        self.store.find_recent(limit).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<AuditRecord>> {
        let id = require_non_blank("id", id)?;
        self.store.find_by_id(&AuditId::from(id)).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count().await
    }
}

fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use trail_foundation::MemoryAuditStore;

    fn service(max: usize) -> (Arc<MemoryAuditStore>, AuditQueryService) {
        let store = Arc::new(MemoryAuditStore::new());
        (store.clone(), AuditQueryService::new(store, max))
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected() {
        let (_, queries) = service(10);

        for result in [
            queries.find_by_actor("").await,
            queries.find_by_actor("   ").await,
            queries.find_by_operation("").await,
        ] {
            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert!(matches!(
            queries.find_by_id(" ").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let (_, queries) = service(10);
        let end = Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap();

        let err = queries
            .find_by_time_range(end + Duration::seconds(1), end)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Zero-width range is valid
        assert!(queries.find_by_time_range(end, end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_limit() {
        let (store, queries) = service(3);
        for i in 0..5 {
            store
                .append(AuditRecord::new("alice", format!("op{}", i)))
                .await
                .unwrap();
        }

        assert!(matches!(
            queries.find_recent(0).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(queries.find_recent(2).await.unwrap().len(), 2);
        assert_eq!(queries.find_recent(100).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (store, queries) = service(10);
        store.set_unavailable(true);

        let err = queries.find_by_actor("alice").await.unwrap_err();
        assert!(err.is_storage_failure());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let (store, queries) = service(10);
        let stored = store.append(AuditRecord::new("alice", "login")).await.unwrap();
        let id = stored.id().unwrap().as_str().to_string();

        assert_eq!(queries.find_by_id(&id).await.unwrap(), Some(stored));
        assert_eq!(queries.find_by_id("missing").await.unwrap(), None);
    }
}
