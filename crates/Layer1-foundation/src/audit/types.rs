//! Audit Types - 감사 기록 타입 정의
//!
//! 감사 대상 작업 한 번의 실행을 나타내는 `AuditRecord`와
//! 액터별 통계 `ActivitySummary`를 정의합니다.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Audit Record ID
// ============================================================================

/// 감사 기록 ID
///
/// Opaque to callers. Assigned by the store when a record is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(String);

impl AuditId {
    /// Fresh UUID v4 identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AuditId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AuditId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Audit Record
// ============================================================================

/// 감사 기록
///
/// One execution of an audited operation. Fields are only readable through
/// accessors; a record is built once with the consuming `with_*` methods and
/// never changes after it reaches a store.
///
/// Timestamps are kept at microsecond precision so that every store adapter
/// can persist them without loss and range queries stay exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<AuditId>,
    actor: String,
    operation: String,
    timestamp: DateTime<Utc>,
    duration_millis: u64,
    succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AuditRecord {
    /// New successful record stamped with the current instant.
    pub fn new(actor: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: None,
            actor: actor.into(),
            operation: operation.into(),
            timestamp: Utc::now().trunc_subsecs(6),
            duration_millis: 0,
            succeeded: true,
            detail: None,
        }
    }

    /// 시작 시각 설정
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }

    /// 실행 시간 설정 (밀리초)
    pub fn with_duration_ms(mut self, duration_millis: u64) -> Self {
        self.duration_millis = duration_millis;
        self
    }

    pub fn with_duration(self, elapsed: Duration) -> Self {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.with_duration_ms(millis)
    }

    /// 결과 설정
    pub fn with_succeeded(mut self, succeeded: bool) -> Self {
        self.succeeded = succeeded;
        self
    }

    /// Mark the record as failed with a description of the failure.
    pub fn failed(mut self, detail: impl Into<String>) -> Self {
        self.succeeded = false;
        self.detail = Some(detail.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the store-assigned identifier.
    pub(crate) fn with_id(mut self, id: AuditId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<&AuditId> {
        self.id.as_ref()
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn duration_millis(&self) -> u64 {
        self.duration_millis
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Actor and operation must both be non-blank.
    pub fn validate(&self) -> Result<()> {
        if self.actor.trim().is_empty() {
            return Err(Error::validation("audit record actor must not be empty"));
        }
        if self.operation.trim().is_empty() {
            return Err(Error::validation(
                "audit record operation must not be empty",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Activity Summary
// ============================================================================

/// 액터별 활동 통계
///
/// Derived on demand from an actor's records; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    /// 액터
    pub actor: String,

    /// 총 작업 수
    pub total_operations: u64,

    /// 실패한 작업 수
    pub failed_operations: u64,

    /// 작업별 카운트
    pub operation_counts: BTreeMap<String, u64>,

    /// 평균 실행 시간 (밀리초)
    pub average_execution_time: f64,

    /// 첫 작업 시각
    pub first_operation: Option<DateTime<Utc>>,

    /// 마지막 작업 시각
    pub last_operation: Option<DateTime<Utc>>,
}

impl ActivitySummary {
    /// Summary of an actor with no recorded activity.
    pub fn empty(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            total_operations: 0,
            failed_operations: 0,
            operation_counts: BTreeMap::new(),
            average_execution_time: 0.0,
            first_operation: None,
            last_operation: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_operations == 0
    }
}

// ============================================================================
// 테스트
// ============================================================================
