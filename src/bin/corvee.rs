//! Command-line front end for the corvee task queue.
//!
//! Usage:
//!
//! ```text
//! corvee [--config <path>] [--database-url <url>] <command>
//! ```
//!
//! Commands:
//!
//! - `init` creates the task table and indices.
//! - `enqueue <name> <json>` appends a pending task.
//! - `work [--once]` runs a consumer with the built-in `add` and `multiply`
//!   handlers until interrupted.
//! - `sweep [--watch]` deletes expired terminal tasks, once or periodically.
//! - `stats` prints task counts per lifecycle bucket.
//! - `show <id>` prints one task.
//!
//! Logging is controlled through `RUST_LOG` and defaults to `info`.

#[path = "corvee/handlers.rs"]
mod handlers;

use clap::{Parser, Subcommand};
use corvee::config::QueueConfig;
use corvee::queue::{
    adapters::postgres::{PostgresTaskStore, build_pool},
    domain::{Task, TaskId},
    services::{Consumer, PollOutcome, Sweeper, TaskQueueService},
};
use mockable::DefaultClock;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

type PgQueue = TaskQueueService<PostgresTaskStore, DefaultClock>;

#[derive(Debug, Parser)]
#[command(name = "corvee")]
#[command(about = "PostgreSQL-backed task queue")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true, env = "CORVEE_CONFIG")]
    config: Option<PathBuf>,

    /// Connection URL overriding the configured database parameters.
    #[arg(long, global = true, env = "CORVEE_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the task table and indices if they are absent.
    Init,
    /// Append a pending task.
    Enqueue {
        /// Handler name.
        name: String,
        /// JSON payload passed to the handler.
        payload: String,
    },
    /// Claim and execute tasks.
    Work {
        /// Process at most one task and exit.
        #[arg(long)]
        once: bool,
    },
    /// Delete completed and dead tasks past their retention windows.
    Sweep {
        /// Keep sweeping on the configured interval until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Print task counts per lifecycle bucket.
    Stats,
    /// Print a single task.
    Show {
        /// Task identifier.
        id: i64,
    },
}

impl Command {
    /// Whether the command may create the task table before running.
    ///
    /// `stats` and `show` only read and never issue DDL.
    const fn ensures_schema(&self) -> bool {
        matches!(
            self,
            Self::Init | Self::Enqueue { .. } | Self::Work { .. } | Self::Sweep { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!(error = %err, "corvee failed");
        return Err(err);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = load_config(&cli)?;
    let pool = build_pool(&config.database)?;
    let store = PostgresTaskStore::new(pool, config.table()?);
    let queue = TaskQueueService::new(Arc::new(store), Arc::new(DefaultClock), config.policy()?);
    if cli.command.ensures_schema() {
        queue.initialize().await?;
    }

    match cli.command {
        Command::Init => info!(table = %queue.store().table(), "queue initialised"),
        Command::Enqueue { name, payload } => {
            let document: serde_json::Value = serde_json::from_str(&payload)?;
            let id = queue.enqueue(name, &document).await?;
            writeln!(std::io::stdout().lock(), "{id}")?;
        }
        Command::Work { once } => work(queue, &config, once).await?,
        Command::Sweep { watch } => sweep(queue, &config, watch).await?,
        Command::Stats => {
            let stats = queue.stats().await?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "pending     {}", stats.pending)?;
            writeln!(out, "processing  {}", stats.processing)?;
            writeln!(out, "retryable   {}", stats.retryable)?;
            writeln!(out, "dead        {}", stats.dead)?;
            writeln!(out, "completed   {}", stats.completed)?;
        }
        Command::Show { id } => match queue.find(TaskId::new(id)).await? {
            Some(task) => print_task(&task)?,
            None => return Err(format!("task {id} not found").into()),
        },
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<QueueConfig, BoxError> {
    let mut config = match &cli.config {
        Some(path) => QueueConfig::load(path)?,
        None => QueueConfig::default(),
    };
    if let Some(url) = &cli.database_url {
        config.database.url = Some(url.clone());
    }
    Ok(config)
}

async fn work(queue: PgQueue, config: &QueueConfig, once: bool) -> Result<(), BoxError> {
    let consumer = Consumer::new(queue, handlers::builtin_registry()?)
        .with_poll_interval(config.poll_interval());
    if once {
        match consumer.poll_once().await? {
            PollOutcome::Idle => info!("no eligible task"),
            PollOutcome::Processed { task_id, outcome } => {
                info!(%task_id, %outcome, "task processed");
            }
        }
        return Ok(());
    }
    consumer.run(shutdown_signal()).await?;
    Ok(())
}

async fn sweep(queue: PgQueue, config: &QueueConfig, watch: bool) -> Result<(), BoxError> {
    let sweeper = Sweeper::new(queue, config.sweep_interval());
    if watch {
        sweeper.run(shutdown_signal()).await?;
    } else {
        let pass = sweeper.sweep_once().await?;
        info!(
            reclaimed = pass.reclaimed,
            deleted = pass.report.total(),
            "sweep finished"
        );
    }
    Ok(())
}

fn print_task(task: &Task) -> Result<(), BoxError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "id          {}", task.id())?;
    writeln!(out, "name        {}", task.name())?;
    writeln!(out, "status      {}", task.status())?;
    writeln!(out, "attempts    {}", task.attempt_count())?;
    writeln!(out, "created_at  {}", task.created_at().to_rfc3339())?;
    writeln!(out, "updated_at  {}", task.updated_at().to_rfc3339())?;
    writeln!(out, "payload     {}", task.payload().as_value())?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
