//! Interception engine
//!
//! - `engine`: `Auditor` - 작업을 감싸 시간/결과를 측정하고 감사 기록을 제출
//! - `operation`: `AuditedOperation` - 선언적 감사 대상 표시

mod engine;
mod operation;

pub use engine::Auditor;
pub use operation::AuditedOperation;
