//! Subcommand handlers

use crate::output;
use chrono::{DateTime, Utc};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};
use trail_core::{ActivityAggregator, ActorResolver, AuditContext, AuditQueryService, Auditor, EnvActor};
use trail_foundation::{AuditConfig, JsonStore, SqliteAuditStore, AUDIT_CONFIG_FILE};

/// Outcome of an audited child process, as recorded in the trail
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exit status: {0}")]
    Exit(i32),

    #[error("terminated by signal")]
    Signaled,
}

impl RunError {
    /// Exit code `trail run` should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Exit(code) => *code,
            RunError::Spawn { .. } => 127,
            RunError::Signaled => 1,
        }
    }
}

/// Auditor over the configured database, or `None` when it cannot be opened.
///
/// `trail run` must start the program either way, so an unusable store is
/// only logged.
pub fn open_auditor(config: AuditConfig) -> Option<Auditor> {
    let path = config.resolved_database_path();
    match SqliteAuditStore::open(&path) {
        Ok(store) => Some(Auditor::new(Arc::new(store), config)),
        Err(e) => {
            warn!(
                "Audit store {} unavailable, running without audit: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// `trail run`: execute `program` as the audited operation `operation`.
pub async fn run(
    auditor: Option<&Auditor>,
    operation: &str,
    actor: Option<String>,
    program: &[String],
) -> anyhow::Result<i32> {
    let Some((name, args)) = program.split_first() else {
        anyhow::bail!("no program given to run");
    };

    let outcome = match auditor {
        Some(auditor) => {
            let resolver: Box<dyn ActorResolver> = match actor {
                Some(actor) => Box::new(AuditContext::for_actor(actor)),
                None => Box::new(EnvActor::new()),
            };

            debug!("Running '{}' as audited operation '{}'", name, operation);
            let outcome = auditor
                .audit(operation, resolver.as_ref(), || spawn_and_wait(name, args))
                .await;
            auditor.flush().await;
            outcome
        }
        None => spawn_and_wait(name, args).await,
    };

    match outcome {
        Ok(_) => Ok(0),
        Err(e @ RunError::Spawn { .. }) => Err(e.into()),
        Err(e) => Ok(e.exit_code()),
    }
}

async fn spawn_and_wait(program: &str, args: &[String]) -> Result<ExitStatus, RunError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| RunError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        return Ok(status);
    }
    match status.code() {
        Some(code) => Err(RunError::Exit(code)),
        None => Err(RunError::Signaled),
    }
}

/// Filter for `trail log`
#[derive(Debug, Clone, PartialEq)]
pub enum LogFilter {
    Actor(String),
    Operation(String),
    Range {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

/// `trail log`
pub async fn log(queries: &AuditQueryService, filter: LogFilter, json: bool) -> anyhow::Result<()> {
    let records = match filter {
        LogFilter::Actor(actor) => queries.find_by_actor(&actor).await?,
        LogFilter::Operation(operation) => queries.find_by_operation(&operation).await?,
        LogFilter::Range { since, until } => queries.find_by_time_range(since, until).await?,
    };
    output::print_records(&records, json)
}

/// `trail recent`
pub async fn recent(queries: &AuditQueryService, limit: usize, json: bool) -> anyhow::Result<()> {
    let records = queries.find_recent(limit).await?;
    output::print_records(&records, json)
}

/// `trail summary`
pub async fn summary(queries: &AuditQueryService, actor: &str, json: bool) -> anyhow::Result<()> {
    let summary = ActivityAggregator::new(queries.clone())
        .summarize(actor)
        .await?;
    output::print_summary(&summary, json)
}

/// `trail init`: write the default project config.
pub fn init(store: &JsonStore, force: bool) -> anyhow::Result<()> {
    if store.exists(AUDIT_CONFIG_FILE) && !force {
        println!("✓ Trail already initialized in this directory.");
        println!("  Use --force to overwrite {}.", store.file_path(AUDIT_CONFIG_FILE).display());
        return Ok(());
    }

    AuditConfig::default().save_to(store)?;
    info!("Wrote {}", store.file_path(AUDIT_CONFIG_FILE).display());
    println!("  Created {}", store.file_path(AUDIT_CONFIG_FILE).display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_foundation::MemoryAuditStore;

    fn auditor() -> (Arc<MemoryAuditStore>, Auditor) {
        let store = Arc::new(MemoryAuditStore::new());
        (store.clone(), Auditor::new(store, AuditConfig::default()))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_records_success_and_exit_status() {
        let (store, auditor) = auditor();

        let ok = run(Some(&auditor), "noop", Some("ci".into()), &["true".to_string()])
            .await
            .unwrap();
        let failed = run(
            Some(&auditor),
            "fail",
            Some("ci".into()),
            &["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(ok, 0);
        assert_eq!(failed, 3);

        let records = store.snapshot();
        assert_eq!(records.len(), 2);
        assert!(records[0].succeeded());
        assert_eq!(records[0].actor(), "ci");
        assert_eq!(records[1].detail(), Some("exit status: 3"));
    }

    #[tokio::test]
    async fn test_run_missing_program_is_recorded_and_reported() {
        let (store, auditor) = auditor();

        let err = run(
            Some(&auditor),
            "ghost",
            Some("ci".into()),
            &["trail-test-no-such-program".to_string()],
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to start"));
        let records = store.snapshot();
        assert_eq!(records.len(), 1);
        assert!(!records[0].succeeded());
    }

    #[tokio::test]
    async fn test_run_requires_program() {
        let (_, auditor) = auditor();
        assert!(run(Some(&auditor), "noop", None, &[]).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_without_store_still_runs_program() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let marker = dir.path().join("ran");

        let auditor = open_auditor(AuditConfig::new().database_path(blocker.join("audit.db")));
        assert!(auditor.is_none());

        let code = run(
            auditor.as_ref(),
            "touch",
            Some("ci".into()),
            &["touch".to_string(), marker.display().to_string()],
        )
        .await
        .unwrap();

        assert_eq!(code, 0);
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_without_store_keeps_exit_code() {
        let code = run(
            None,
            "fail",
            None,
            &["sh".to_string(), "-c".to_string(), "exit 4".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(code, 4);
    }

    #[test]
    fn test_init_writes_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());

        init(&store, false).unwrap();
        assert!(store.exists(AUDIT_CONFIG_FILE));

        let custom = AuditConfig::new().default_actor("ops");
        custom.save_to(&store).unwrap();
        init(&store, false).unwrap();
        assert_eq!(AuditConfig::load_from(&store).unwrap(), custom);

        init(&store, true).unwrap();
        assert_eq!(AuditConfig::load_from(&store).unwrap(), AuditConfig::default());
    }
}
