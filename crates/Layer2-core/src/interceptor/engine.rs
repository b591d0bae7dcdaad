//! Auditor - 감사 인터셉터
//!
//! 작업을 감싸서 실행하고, 결과와 소요 시간을 감사 기록으로 남깁니다.
//! 작업의 반환값과 에러는 그대로 호출자에게 전달되며, 감사 저장 실패는
//! 로그로만 남고 호출자에게 전파되지 않습니다.

use super::operation::AuditedOperation;
use crate::actor::{resolve_or_default, ActorResolver};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};
use trail_foundation::{AuditConfig, AuditRecord, AuditStore, Error, Result, SubmitMode};

/// Wraps business work and records who ran it, when, for how long, and whether it succeeded.
#[derive(Clone)]
pub struct Auditor {
    store: Arc<dyn AuditStore>,
    config: Arc<AuditConfig>,
    /// Background appends not yet finished
    pending: TaskTracker,
}

impl Auditor {
    pub fn new(store: Arc<dyn AuditStore>, config: AuditConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            pending: TaskTracker::new(),
        }
    }

    // ========================================================================
    // Interception
    // ========================================================================

    /// Run `work` as the audited operation `operation`.
    ///
    /// The work's value or error is returned unchanged. A panic inside the
    /// work is recorded as a failure and then resumed.
    pub async fn audit<R, F, Fut, T, E>(
        &self,
        operation: &str,
        resolver: &R,
        work: F,
    ) -> std::result::Result<T, E>
    where
        R: ActorResolver + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        if !self.config.enabled {
            return work().await;
        }

        if operation.trim().is_empty() {
            warn!("Audited operation has a blank name; running without audit");
            return work().await;
        }

        let actor = resolve_or_default(resolver, &self.config.default_actor);
        let started_at = Utc::now();
        let start = Instant::now();

        debug!("Executing audited operation '{}' as {}", operation, actor);

        let outcome = AssertUnwindSafe(async move { work().await })
            .catch_unwind()
            .await;

        let record = AuditRecord::new(actor, operation)
            .with_timestamp(started_at)
            .with_duration(start.elapsed());

        match outcome {
            Ok(result) => {
                let record = match &result {
                    Ok(_) => record,
                    Err(e) => record.failed(e.to_string()),
                };
                self.submit(record).await;
                result
            }
            Err(payload) => {
                let record = record.failed(format!("panicked: {}", panic_message(&*payload)));
                self.submit(record).await;
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Run a self-describing operation.
    pub async fn run<O, R>(
        &self,
        operation: &O,
        resolver: &R,
    ) -> std::result::Result<O::Output, O::Error>
    where
        O: AuditedOperation + ?Sized,
        R: ActorResolver + ?Sized,
    {
        self.audit(operation.operation(), resolver, || operation.execute())
            .await
    }

    /// Append a manually built record. Unlike interception, failures are returned.
    ///
    /// A timeout is reported as `Error::Storage`. Stores that write on a
    /// separate thread skip a write that has not started by then, but one
    /// already executing may still commit, so a retry after a timeout can
    /// produce a second record.
    pub async fn record(&self, record: AuditRecord) -> Result<AuditRecord> {
        append_bounded(self.store.as_ref(), record, self.config.append_timeout()).await
    }

    /// Wait until every background append has finished.
    pub async fn flush(&self) {
        self.pending.close();
        self.pending.wait().await;
        self.pending.reopen();
    }

    // ========================================================================
    // Submission
    // ========================================================================

    async fn submit(&self, record: AuditRecord) {
        let timeout = self.config.append_timeout();

        match self.config.submit_mode {
            SubmitMode::Inline => {
                if let Err(e) = append_bounded(self.store.as_ref(), record, timeout).await {
                    warn!("Audit record dropped: {}", e);
                }
            }
            SubmitMode::Background => {
                let store = Arc::clone(&self.store);
                self.pending.spawn(async move {
                    if let Err(e) = append_bounded(store.as_ref(), record, timeout).await {
                        error!("Background audit append failed: {}", e);
                    }
                });
            }
        }
    }
}

async fn append_bounded(
    store: &dyn AuditStore,
    record: AuditRecord,
    timeout: Duration,
) -> Result<AuditRecord> {
    let operation = record.operation().to_string();
    let actor = record.actor().to_string();

    match tokio::time::timeout(timeout, store.append(record)).await {
        Ok(Ok(stored)) => {
            debug!(
                "Audit record stored: '{}' by {} ({} ms, succeeded={})",
                operation,
                actor,
                stored.duration_millis(),
                stored.succeeded()
            );
            Ok(stored)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::storage(format!(
            "append of '{}' by {} timed out after {} ms",
            operation,
            actor,
            timeout.as_millis()
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// 테스트
// ============================================================================
