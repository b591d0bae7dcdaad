//! Storage module for Trail
//!
//! - `store`: `AuditStore` - 감사 기록 저장소 계약
//! - `db`: SQLite - 영구 감사 기록
//! - `memory`: 인메모리 - 테스트 및 임베디드용
//! - `json`: JSON - 설정 파일 저장/로드

mod db;
mod json;
mod memory;
mod store;

// Audit Store (계약 + 어댑터)
pub use db::SqliteAuditStore;
pub use memory::MemoryAuditStore;
pub use store::AuditStore;

// JSON Storage (설정)
pub use json::JsonStore;
