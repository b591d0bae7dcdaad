//! Config - 감사 설정 관리
//!
//! - `audit.rs` - AuditConfig (활성화, 기본 액터, 타임아웃)

mod audit;

pub use audit::{AuditConfig, AuditConfigLayer, SubmitMode, AUDIT_CONFIG_FILE, DEFAULT_ACTOR};
