use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fieldsync::application::ports::SyncQueue;
use fieldsync::domain::value_objects::TableName;
use fieldsync::{AppConfig, AppState, PullOutcome, TriggerOutcome};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Inspect and drive the offline sync core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL (defaults to the platform data directory)
    #[arg(long, env = "FIELDSYNC_DATABASE_URL")]
    database_url: Option<String>,

    /// Treat the remote as unreachable
    #[arg(long)]
    offline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connectivity, queue depth and drain metrics
    Status,
    /// Inspect or discard pending mutations
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Replay pending mutations against the remote
    Drain,
    /// Refresh local tables from the remote
    Pull {
        /// Pull a single table instead of all of them
        #[arg(long)]
        table: Option<String>,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List pending mutations, oldest first
    List,
    /// Drop every pending mutation without replaying it
    Clear {
        /// Confirm that unsynced changes will be lost
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url.clone() {
        config.database.url = url;
    }
    config.connectivity.assume_online = !cli.offline && config.remote.base_url.is_some();
    config.connectivity.poll_interval_ms = 0;
    config.sync.auto_sync = false;

    let state = AppState::new(config).await?;
    state.initialize();

    let result = run(&state, cli.command).await;
    state.shutdown().await;
    result
}

async fn run(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            let status = state.sync_service.status().await?;
            let report = json!({
                "online": state.connectivity.get_online_status(),
                "status": status,
                "metrics": state.sync_service.metrics(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Queue {
            command: QueueCommands::List,
        } => {
            for record in state.sync_queue.peek_all().await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id,
                    record.enqueued_at.to_rfc3339(),
                    record.table,
                    record.action,
                    record.record_key
                );
            }
        }
        Commands::Queue {
            command: QueueCommands::Clear { yes },
        } => {
            if !yes {
                bail!("Refusing to discard unsynced changes without --yes");
            }
            let removed = state.sync_queue.clear().await?;
            warn!(removed, "Discarded pending mutations");
        }
        Commands::Drain => match state.connectivity.trigger_sync().await? {
            TriggerOutcome::Drained(report) if !report.is_complete() => {
                bail!(
                    "Drain stopped after {} of {} mutations: {:?}",
                    report.applied,
                    report.applied as u64 + report.remaining,
                    report.halted
                );
            }
            TriggerOutcome::Drained(report) => {
                info!(applied = report.applied, "Queue drained");
            }
            TriggerOutcome::QueueEmpty => info!("Nothing to sync"),
            TriggerOutcome::Offline => bail!("Remote not configured or --offline given"),
            TriggerOutcome::AlreadyRunning => info!("Sync already in progress"),
        },
        Commands::Pull { table } => {
            let outcomes = match table {
                Some(name) => {
                    let table = TableName::new(name).map_err(anyhow::Error::msg)?;
                    let outcome = state.data_service.pull_named(&table).await?;
                    vec![(table, outcome)]
                }
                None => state.data_service.pull_all().await?,
            };
            for (table, outcome) in outcomes {
                match outcome {
                    PullOutcome::Pulled { count } => info!(table = %table, count, "Pulled"),
                    PullOutcome::Offline => warn!(table = %table, "Skipped, offline"),
                    PullOutcome::RemoteFailed(err) => {
                        warn!(table = %table, error = %err, "Pull failed")
                    }
                }
            }
        }
    }
    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = if json {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
