//! # trail-foundation
//!
//! Foundation layer for Trail:
//! - Audit: 감사 기록 타입 (AuditRecord, ActivitySummary)
//! - Storage: AuditStore 계약 + SQLite / 인메모리 어댑터, JsonStore
//! - Config: 감사 설정 (AuditConfig)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer2-core                                            │
//! │  Auditor (interception) · QueryService · Aggregator     │
//! │                     │                                   │
//! │                     ▼                                   │
//! │              AuditStore (trait)                         │
//! │          ┌─────────┴─────────┐                         │
//! │          ▼                   ▼                         │
//! │   SqliteAuditStore     MemoryAuditStore                │
//! │   (durable, WAL)       (tests, embedded)               │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Audit (감사 기록)
// ============================================================================
pub use audit::{ActivitySummary, AuditId, AuditRecord};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    // Contract
    AuditStore,
    // JSON (설정)
    JsonStore,
    // Adapters
    MemoryAuditStore,
    SqliteAuditStore,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{AuditConfig, AuditConfigLayer, SubmitMode, AUDIT_CONFIG_FILE, DEFAULT_ACTOR};
