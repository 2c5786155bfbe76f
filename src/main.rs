use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod aggregate;
mod burndown;
mod config;
mod db;
mod error;
mod history;
mod models;
mod refresh;
mod report;
mod source;
mod store;
mod table;
mod weeks;

use config::ReportConfig;
use db::PgSnapshotStore;
use source::SnapshotDir;
use store::{SnapshotStore, TokioSleeper, WaitPolicy};

#[derive(Parser)]
#[command(name = "milestone-burndown")]
#[command(about = "Milestone burndown and breakdown reports from tracker snapshots", long_about = None)]
struct Cli {
    /// TOML configuration; built-in defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Rebuild the report from a snapshot directory and publish it
    Refresh {
        #[arg(long)]
        snapshot_dir: PathBuf,
        /// Treat this date as today (defaults to the current UTC date)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Refresh on the configured interval until interrupted
    Schedule {
        #[arg(long)]
        snapshot_dir: PathBuf,
    },
    /// Print the latest published report, waiting for the first one
    Show {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build a report from a snapshot directory without publishing it
    Report {
        #[arg(long)]
        snapshot_dir: PathBuf,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Remove the published report
    ClearCache,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the Postgres instance holding reports")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn render(document: &models::ReportDocument, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(document)?),
        Format::Markdown => Ok(report::render_markdown(document)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Refresh {
            snapshot_dir,
            today,
        } => {
            let store = PgSnapshotStore::new(connect().await?);
            let source = SnapshotDir::new(&snapshot_dir, &config.tracker.milestone_sentinel);
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let outcome = refresh::run_cycle(&config, &source, &store, today)
                .await
                .with_context(|| format!("refresh from {} failed", snapshot_dir.display()))?;
            println!(
                "Published snapshot {} covering {} records in {} views.",
                outcome.snapshot_id,
                outcome.record_count,
                outcome.document.stats.len()
            );
        }
        Commands::Schedule { snapshot_dir } => {
            let store = PgSnapshotStore::new(connect().await?);
            let source = SnapshotDir::new(&snapshot_dir, &config.tracker.milestone_sentinel);
            tracing::info!(
                interval_secs = config.refresh.interval_secs,
                snapshot_dir = %snapshot_dir.display(),
                "starting refresh schedule"
            );
            refresh::schedule(&config, &source, &store).await;
        }
        Commands::Show { format, out } => {
            let store = PgSnapshotStore::new(connect().await?);
            let policy = WaitPolicy {
                poll_interval: config.refresh.poll_interval(),
                max_wait: config.refresh.max_wait(),
            };
            let document = store::wait_for_document(&store, policy, &TokioSleeper).await?;
            if let Some((snapshot_id, generated_at)) = store.published_at().await? {
                tracing::info!(%snapshot_id, %generated_at, "serving published report");
            }
            let body = render(&document, format)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, body)?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{body}"),
            }
        }
        Commands::Report {
            snapshot_dir,
            today,
            format,
            out,
        } => {
            let source = SnapshotDir::new(&snapshot_dir, &config.tracker.milestone_sentinel);
            let snapshot = source::load_snapshot(&source)
                .await
                .with_context(|| format!("failed to load {}", snapshot_dir.display()))?;
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let document = report::build_report(&config, &snapshot, today, Utc::now());
            std::fs::write(&out, render(&document, format)?)?;
            println!(
                "Report over {} records written to {}.",
                snapshot.records.len(),
                out.display()
            );
        }
        Commands::ClearCache => {
            let store = PgSnapshotStore::new(connect().await?);
            store.clear().await?;
            println!("Published report removed.");
        }
    }

    Ok(())
}
