//! Trail CLI - Main entry point

mod commands;
mod output;

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use commands::LogFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trail_core::AuditQueryService;
use trail_foundation::{AuditConfig, JsonStore, SqliteAuditStore};

/// Trail - audit trail for the commands you run
#[derive(Parser, Debug)]
#[command(name = "trail")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Audit database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program as an audited operation
    Run {
        /// Operation name to record
        #[arg(short, long)]
        operation: String,

        /// Actor to record (defaults to $TRAIL_ACTOR, then the login user)
        #[arg(short, long)]
        actor: Option<String>,

        /// Program and its arguments, after `--`
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
    /// Show audit records by actor, operation, or time range
    #[command(group(ArgGroup::new("filter").required(true).args(["actor", "operation", "since"])))]
    Log {
        #[arg(long)]
        actor: Option<String>,

        #[arg(long)]
        operation: Option<String>,

        /// Range start (RFC 3339), inclusive
        #[arg(long, requires = "until")]
        since: Option<DateTime<Utc>>,

        /// Range end (RFC 3339), inclusive
        #[arg(long, requires = "since")]
        until: Option<DateTime<Utc>>,
    },
    /// Show the most recent audit records
    Recent {
        /// Number of records to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Summarize an actor's activity
    Summary {
        actor: String,
    },
    /// Write a default .trail/audit.json in the current directory
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Command {
    fn log_filter(
        actor: Option<String>,
        operation: Option<String>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> anyhow::Result<LogFilter> {
        match (actor, operation, since, until) {
            (Some(actor), None, None, None) => Ok(LogFilter::Actor(actor)),
            (None, Some(operation), None, None) => Ok(LogFilter::Operation(operation)),
            (None, None, Some(since), Some(until)) => Ok(LogFilter::Range { since, until }),
            _ => anyhow::bail!("use exactly one of --actor, --operation, or --since/--until"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Command::Init { force } = args.command {
        return commands::init(&JsonStore::current_project()?, force);
    }

    // Load configuration
    let mut config = AuditConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        AuditConfig::default()
    });
    if let Some(db) = args.db {
        config.database_path = Some(db);
    }

    if let Command::Run {
        operation,
        actor,
        program,
    } = args.command
    {
        let auditor = commands::open_auditor(config);
        let code = commands::run(auditor.as_ref(), &operation, actor, &program).await?;
        if code != 0 {
            std::process::exit(code);
        }
        return Ok(());
    }

    let store = Arc::new(SqliteAuditStore::open(config.resolved_database_path())?);
    let queries = AuditQueryService::from_config(store, &config);

    match args.command {
        Command::Log {
            actor,
            operation,
            since,
            until,
        } => {
            let filter = Command::log_filter(actor, operation, since, until)?;
            commands::log(&queries, filter, args.json).await?;
        }
        Command::Recent { limit } => commands::recent(&queries, limit, args.json).await?,
        Command::Summary { actor } => commands::summary(&queries, &actor, args.json).await?,
        Command::Run { .. } | Command::Init { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "trail", "--json", "run", "-o", "deploy", "--actor", "ci", "--", "make", "deploy",
        ])
        .unwrap();

        assert!(args.json);
        match args.command {
            Command::Run {
                operation,
                actor,
                program,
            } => {
                assert_eq!(operation, "deploy");
                assert_eq!(actor.as_deref(), Some("ci"));
                assert_eq!(program, vec!["make", "deploy"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_requires_a_filter() {
        assert!(Args::try_parse_from(["trail", "log"]).is_err());
        assert!(Args::try_parse_from(["trail", "log", "--since", "2026-01-01T00:00:00Z"]).is_err());
        assert!(Args::try_parse_from(["trail", "log", "--actor", "a", "--operation", "b"]).is_err());
    }

    #[test]
    fn test_log_range_filter() {
        let args = Args::try_parse_from([
            "trail",
            "log",
            "--since",
            "2026-01-01T00:00:00Z",
            "--until",
            "2026-01-02T00:00:00Z",
        ])
        .unwrap();

        let Command::Log {
            actor,
            operation,
            since,
            until,
        } = args.command
        else {
            panic!("expected log command");
        };
        let filter = Command::log_filter(actor, operation, since, until).unwrap();
        assert!(matches!(filter, LogFilter::Range { since, until } if since < until));
    }
}
