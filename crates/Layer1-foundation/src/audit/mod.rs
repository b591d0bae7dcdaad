//! Audit System - 감사 기록 모델
//!
//! 감사 대상 작업의 실행 기록과 파생 통계 타입을 정의합니다.
//!
//! ## 흐름
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ Auditor      │ ──► │ AuditRecord │ ──► │ AuditStore       │
//! │ (Layer2)     │     │ (write-once)│     │ append / find_*  │
//! └──────────────┘     └─────────────┘     └────────┬─────────┘
//!                                                    │
//!                                      ActivitySummary (파생, 저장 안 함)
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use trail_foundation::audit::AuditRecord;
//!
//! let record = AuditRecord::new("alice", "habit.create")
//!     .with_duration_ms(12)
//!     .failed("disk full");
//!
//! let stored = store.append(record).await?;
//! assert!(stored.id().is_some());
//! ```

pub mod types;

// Re-exports
pub use types::{ActivitySummary, AuditId, AuditRecord};
