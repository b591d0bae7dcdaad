//! Declarative marking of audited operations
//!
//! 서비스 타입이 `AuditedOperation`을 구현하면 `Auditor::run`이
//! 작업 이름을 읽어 자동으로 감사합니다. 작업 본문은 감사 코드를 알 필요가 없습니다.

use async_trait::async_trait;
use std::fmt::Display;

/// A unit of business work that carries its own audit name.
///
/// ```ignore
/// struct CreateHabit { repo: HabitRepo, name: String }
///
/// #[async_trait]
/// impl AuditedOperation for CreateHabit {
///     type Output = Habit;
///     type Error = AppError;
///
///     fn operation(&self) -> &str {
///         "habit.create"
///     }
///
///     async fn execute(&self) -> Result<Habit, AppError> {
///         self.repo.insert(&self.name).await
///     }
/// }
///
/// let habit = auditor.run(&CreateHabit { .. }, &ctx).await?;
/// ```
#[async_trait]
pub trait AuditedOperation: Send + Sync {
    type Output: Send;
    type Error: Display + Send;

    /// Name recorded as the record's operation
    fn operation(&self) -> &str;

    async fn execute(&self) -> Result<Self::Output, Self::Error>;
}
