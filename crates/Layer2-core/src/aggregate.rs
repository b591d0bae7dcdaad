//! Activity Aggregator - 액터별 활동 통계

use crate::query::AuditQueryService;
use std::collections::BTreeMap;
use tracing::debug;
use trail_foundation::{ActivitySummary, AuditRecord, Result};

/// Builds per-actor activity summaries from the audit trail
#[derive(Clone)]
pub struct ActivityAggregator {
    queries: AuditQueryService,
}

impl ActivityAggregator {
    pub fn new(queries: AuditQueryService) -> Self {
        Self { queries }
    }

    /// Summarize everything `actor` did. An actor with no records gets an empty summary.
    pub async fn summarize(&self, actor: &str) -> Result<ActivitySummary> {
        let records = self.queries.find_by_actor(actor).await?;
        let summary = summarize_records(actor, &records);

        debug!(
            "Summarized {} audit records for {} ({} failed)",
            summary.total_operations, actor, summary.failed_operations
        );

        Ok(summary)
    }

    /// One summary per distinct actor, in the order given.
    pub async fn summarize_many(&self, actors: &[&str]) -> Result<Vec<ActivitySummary>> {
        let mut seen = Vec::with_capacity(actors.len());
        let mut summaries = Vec::with_capacity(actors.len());

        for actor in actors {
            if seen.contains(actor) {
                continue;
            }
            seen.push(*actor);
            summaries.push(self.summarize(actor).await?);
        }

        Ok(summaries)
    }
}

/// Fold a slice of records into a summary for `actor`.
pub fn summarize_records(actor: &str, records: &[AuditRecord]) -> ActivitySummary {
    if records.is_empty() {
        return ActivitySummary::empty(actor);
    }

    let mut operation_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut total_millis: u128 = 0;
    let mut failed = 0u64;

    for record in records {
        *operation_counts
            .entry(record.operation().to_string())
            .or_insert(0) += 1;
        total_millis += u128::from(record.duration_millis());
        if !record.succeeded() {
            failed += 1;
        }
    }

    let total = records.len() as u64;

    ActivitySummary {
        actor: actor.to_string(),
        total_operations: total,
        failed_operations: failed,
        operation_counts,
        average_execution_time: total_millis as f64 / total as f64,
        first_operation: records.iter().map(AuditRecord::timestamp).min(),
        last_operation: records.iter().map(AuditRecord::timestamp).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use trail_foundation::{AuditStore, MemoryAuditStore};

    #[test]
    fn test_fractional_average() {
        let records = vec![
            AuditRecord::new("alice", "a").with_duration_ms(10),
            AuditRecord::new("alice", "a").with_duration_ms(15),
        ];

        let summary = summarize_records("alice", &records);
        assert_eq!(summary.average_execution_time, 12.5);
        assert_eq!(summary.operation_counts.get("a"), Some(&2));
    }

    #[test]
    fn test_first_and_last_ignore_input_order() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        let records = vec![
            AuditRecord::new("bob", "x").with_timestamp(late),
            AuditRecord::new("bob", "y").with_timestamp(early).failed("denied"),
        ];

        let summary = summarize_records("bob", &records);
        assert_eq!(summary.first_operation, Some(early));
        assert_eq!(summary.last_operation, Some(late));
        assert_eq!(summary.failed_operations, 1);
    }

    #[tokio::test]
    async fn test_unknown_actor_is_empty() {
        let store = Arc::new(MemoryAuditStore::new());
        store
            .append(AuditRecord::new("alice", "login"))
            .await
            .unwrap();
        let aggregator = ActivityAggregator::new(AuditQueryService::new(store, 100));

        let summary = aggregator.summarize("nobody").await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.actor, "nobody");
        assert_eq!(summary.average_execution_time, 0.0);
        assert_eq!(summary.first_operation, None);
        assert!(summary.operation_counts.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_many_dedups() {
        let store = Arc::new(MemoryAuditStore::new());
        for actor in ["alice", "bob", "alice"] {
            store.append(AuditRecord::new(actor, "login")).await.unwrap();
        }
        let aggregator = ActivityAggregator::new(AuditQueryService::new(store, 100));

        let summaries = aggregator
            .summarize_many(&["bob", "alice", "bob"])
            .await
            .unwrap();

        let totals: Vec<_> = summaries
            .iter()
            .map(|s| (s.actor.as_str(), s.total_operations))
            .collect();
        assert_eq!(totals, vec![("bob", 1), ("alice", 2)]);
    }

    #[tokio::test]
    async fn test_blank_actor_rejected() {
        let store = Arc::new(MemoryAuditStore::new());
        let aggregator = ActivityAggregator::new(AuditQueryService::new(store, 100));

        assert!(aggregator.summarize("").await.is_err());
    }
}
