use bnpl_engine::application::engine::BnplEngine;
use bnpl_engine::config::EngineConfig;
use bnpl_engine::domain::ports::{InstallmentStoreBox, PlanStoreBox};
use bnpl_engine::domain::terms::PlanTerms;
use bnpl_engine::infrastructure::in_memory::{InMemoryInstallmentStore, InMemoryPlanStore};
#[cfg(feature = "storage-rocksdb")]
use bnpl_engine::infrastructure::rocksdb::RocksDBStore;
use bnpl_engine::interfaces::csv::event_reader::EventReader;
use bnpl_engine::interfaces::csv::installment_writer::InstallmentWriter;
use bnpl_engine::interfaces::csv::plan_reader::PlanReader;
use bnpl_engine::interfaces::csv::report_writer::ReportWriter;
use bnpl_engine::interfaces::event_log::EventLog;
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the amortization schedule for a set of terms
    Schedule {
        #[arg(long)]
        principal: String,

        /// Annual interest rate in percent
        #[arg(long)]
        rate: String,

        /// Number of installments
        #[arg(long)]
        tenor: String,

        #[arg(long, default_value = "monthly")]
        cadence: String,

        /// Schedule start date (YYYY-MM-DD); the first installment falls one period later
        #[arg(long)]
        start: String,

        #[command(flatten)]
        config: EngineConfig,
    },
    /// Open plans and replay lifecycle events against them
    Simulate {
        /// Input plans CSV file
        plans: PathBuf,

        /// Input lifecycle events CSV file
        events: PathBuf,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Print one summary row per plan instead of installments
        #[arg(long)]
        summary: bool,

        /// Write every emitted domain event to this file as JSON lines
        #[arg(long)]
        events_out: Option<PathBuf>,

        #[command(flatten)]
        config: EngineConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();

    match Cli::parse().command {
        Command::Schedule {
            principal,
            rate,
            tenor,
            cadence,
            start,
            config,
        } => {
            let terms = PlanTerms::parse(&principal, &rate, &tenor, &cadence, &start)?;
            let schedule = config.amortization().compute_schedule(&terms)?;
            info!(
                payment = %schedule.payment,
                total_interest = %schedule.total_interest(),
                "schedule computed"
            );

            let stdout = io::stdout();
            ReportWriter::new(stdout.lock())
                .write_schedule(&schedule)
                .into_diagnostic()?;
        }
        Command::Simulate {
            plans,
            events,
            db_path,
            summary,
            events_out,
            config,
        } => simulate(plans, events, db_path, summary, events_out, config).await?,
    }

    Ok(())
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(PlanStoreBox, InstallmentStoreBox)> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path)?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }

    Ok((
        Box::new(InMemoryPlanStore::new()),
        Box::new(InMemoryInstallmentStore::new()),
    ))
}

async fn simulate(
    plans: PathBuf,
    events: PathBuf,
    db_path: Option<PathBuf>,
    summary: bool,
    events_out: Option<PathBuf>,
    config: EngineConfig,
) -> Result<()> {
    let (plan_store, installment_store) = open_stores(db_path)?;
    let engine = BnplEngine::new(plan_store, installment_store, config);

    let mut event_log = match events_out {
        Some(path) => Some(EventLog::new(BufWriter::new(File::create(path).into_diagnostic()?))),
        None => None,
    };

    let file = File::open(plans).into_diagnostic()?;
    for plan_result in PlanReader::new(file).plans() {
        match plan_result {
            Ok(request) => {
                let created_at = request.terms.start_date.and_time(NaiveTime::MIN);
                if let Err(e) = engine.create_plan(request, created_at).await {
                    warn!(code = e.error_code(), "error creating plan: {}", e);
                }
            }
            Err(e) => {
                error!(code = e.error_code(), "error reading plan: {}", e);
            }
        }
    }

    let file = File::open(events).into_diagnostic()?;
    for command_result in EventReader::new(file).commands() {
        match command_result {
            Ok(command) => match engine.apply(command).await {
                Ok(emitted) => {
                    if let Some(log) = event_log.as_mut() {
                        log.append(&emitted)?;
                    }
                }
                Err(e) => {
                    warn!(code = e.error_code(), retryable = e.is_retryable(), "error applying event: {}", e);
                }
            },
            Err(e) => {
                error!(code = e.error_code(), "error reading event: {}", e);
            }
        }
    }

    if let Some(mut log) = event_log {
        log.flush()?;
        info!(events = log.written(), "domain events written");
    }

    let stdout = io::stdout();
    if summary {
        let summaries = engine.summaries().await?;
        ReportWriter::new(stdout.lock())
            .write_summaries(&summaries)
            .into_diagnostic()?;
    } else {
        let installments = engine.into_results().await?;
        InstallmentWriter::new(stdout.lock())
            .write_installments(&installments)
            .into_diagnostic()?;
    }

    Ok(())
}
