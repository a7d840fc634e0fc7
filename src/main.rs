use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use courtside::config::load_config;
use courtside::harness::{HarnessOptions, run_harness};
use courtside::server::serve_stdio;
use courtside::service::AvailabilityService;
use courtside::store::MemorySnapshotStore;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "courtside", about = "Court availability and pricing from booking pages")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    snapshot_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Serve,
    Query {
        #[arg(long)]
        date: String,
        #[arg(long)]
        after: Option<String>,
        #[arg(long)]
        before: Option<String>,
    },
    Parse {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Harness {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        date: NaiveDate,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(path) = cli.snapshot_path {
        config.storage.snapshot_path = Some(path);
    }

    match cli.command {
        Commands::Serve => {
            let service = AvailabilityService::from_config(config)?;
            serve_stdio(&service)?;
        }
        Commands::Query {
            date,
            after,
            before,
        } => {
            let service = AvailabilityService::from_config(config)?;
            let output =
                service.get_court_availability(&date, after.as_deref(), before.as_deref());
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Parse { file, date } => {
            let markup = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let service = AvailabilityService::new(
                config,
                None,
                Box::new(MemorySnapshotStore::new()),
            )?;
            let document = service.parse_page(date, &markup);
            info!(
                strategy = ?document.strategy,
                courts = document.total_courts,
                slots = document.total_slots,
                "parse complete"
            );
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Harness { file, date } => {
            let report = run_harness(&HarnessOptions {
                markup_path: file,
                date,
                config,
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
