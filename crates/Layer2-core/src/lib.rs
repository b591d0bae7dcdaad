//! trail-core: Core Runtime for Trail
//!
//! Layer2 - 감사 인터셉션 및 조회 레이어
//!
//! # 주요 모듈
//!
//! - `actor`: 액터 확인 (AuditContext, EnvActor, 클로저)
//! - `interceptor`: 작업을 감싸 감사 기록을 남기는 `Auditor`
//! - `query`: 입력 검증을 거친 감사 기록 조회
//! - `aggregate`: 액터별 활동 통계
//!
//! # 사용 예시
//!
//! ```ignore
//! use std::sync::Arc;
//! use trail_core::{ActivityAggregator, AuditContext, AuditQueryService, Auditor};
//! use trail_foundation::{AuditConfig, SqliteAuditStore};
//!
//! let config = AuditConfig::load()?;
//! let store = Arc::new(SqliteAuditStore::open(config.resolved_database_path())?);
//!
//! // 작업 감사
//! let auditor = Auditor::new(store.clone(), config.clone());
//! let ctx = AuditContext::for_actor("alice");
//! let habit = auditor
//!     .audit("habit.create", &ctx, || habits.create("read"))
//!     .await?;
//!
//! // 조회 및 통계
//! let queries = AuditQueryService::from_config(store, &config);
//! let recent = queries.find_recent(20).await?;
//! let summary = ActivityAggregator::new(queries).summarize("alice").await?;
//! ```

pub mod actor;
pub mod aggregate;
pub mod interceptor;
pub mod query;

// Re-exports: Actor
pub use actor::{resolve_or_default, ActorResolver, AuditContext, EnvActor};

// Re-exports: Interception
pub use interceptor::{AuditedOperation, Auditor};

// Re-exports: Query / Aggregation
pub use aggregate::{summarize_records, ActivityAggregator};
pub use query::AuditQueryService;
