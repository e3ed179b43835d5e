//! Scheduling Simulator
//!
//! Entry point for the distributed CPU scheduling simulator. `run` hosts the Clock, the Task
//! Feeder and the Scheduler Engine in one process; `clock`, `feeder` and `scheduler` start a
//! single component so the three can run as separate processes.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

use scheduler_engine::ReportFormat;
use scheduler_sim_service::{
    initialize_logging, load_configuration, run_clock, run_feeder, run_scheduler, run_simulation,
    setup_signal_handlers, ServiceConfig,
};
use sim_protocol::{TaskSpec, TickOrdering};

#[derive(Parser)]
#[command(name = "scheduler-sim")]
#[command(about = "Distributed CPU scheduling simulator driven by a logical clock over TCP")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (compact, pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Host shared by the three listeners
    #[arg(long, global = true)]
    host: Option<String>,

    /// Tick ordering between the Feeder and the Scheduler (barrier, delay)
    #[arg(long, global = true)]
    ordering: Option<TickOrdering>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Clock, Task Feeder and Scheduler Engine together and write the report
    Run {
        /// Task file, one `id;arrival;burst;priority` per line
        tasks: Option<PathBuf>,

        #[command(flatten)]
        clock: ClockArgs,

        #[command(flatten)]
        scheduling: SchedulingArgs,
    },

    /// Run only the Clock
    Clock {
        #[command(flatten)]
        clock: ClockArgs,
    },

    /// Run only the Task Feeder
    Feeder {
        /// Task file, one `id;arrival;burst;priority` per line
        tasks: Option<PathBuf>,
    },

    /// Run only the Scheduler Engine
    Scheduler {
        #[command(flatten)]
        scheduling: SchedulingArgs,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Args)]
struct ClockArgs {
    /// Tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Delay between the Feeder send and the Scheduler send, in milliseconds
    #[arg(long)]
    feeder_delay_ms: Option<u64>,
}

#[derive(Args)]
struct SchedulingArgs {
    /// Scheduling algorithm: fcfs, rr, sjf, srtf, prioc, priop, priod
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Round-Robin quantum in ticks
    #[arg(long)]
    quantum: Option<u64>,

    /// Ticks between aging steps for priod
    #[arg(long)]
    aging_period: Option<u64>,

    /// Directory the report is written to
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(long)]
    report_format: Option<ReportFormat>,
}

impl ClockArgs {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(tick_ms) = self.tick_ms {
            config.clock.tick_period_ms = tick_ms;
        }
        if let Some(delay) = self.feeder_delay_ms {
            config.clock.feeder_delay_ms = delay;
        }
    }
}

impl SchedulingArgs {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(algorithm) = &self.algorithm {
            config.scheduler.algorithm = algorithm.clone();
        }
        if let Some(quantum) = self.quantum {
            config.scheduler.quantum = quantum;
        }
        if let Some(aging_period) = self.aging_period {
            config.scheduler.aging_period = aging_period;
        }
        if let Some(dir) = &self.report_dir {
            config.scheduler.report.directory = dir.clone();
        }
        if let Some(format) = self.report_format {
            config.scheduler.report.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(host) = &cli.host {
        config.network.host = host.clone();
    }
    if let Some(ordering) = cli.ordering {
        config.ordering = ordering;
    }
    match &cli.command {
        Commands::Run { clock, scheduling, .. } => {
            clock.apply(&mut config);
            scheduling.apply(&mut config);
        }
        Commands::Clock { clock } => clock.apply(&mut config),
        Commands::Scheduler { scheduling } => scheduling.apply(&mut config),
        Commands::Feeder { .. } | Commands::PrintConfig => {}
    }
    config.validate().context("Invalid configuration")?;

    if let Commands::PrintConfig = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    initialize_logging(&config.logging)?;
    info!("Starting Scheduling Simulator v{}", env!("CARGO_PKG_VERSION"));

    let interrupt = shutdown_requested()?;

    match cli.command {
        Commands::Run { tasks, .. } => {
            let tasks = load_task_set(tasks, &config)?;
            let outcome = run_simulation(config, tasks, interrupt).await?;

            match (&outcome.report, &outcome.report_path) {
                (Some(report), Some(path)) => info!(
                    algorithm = %report.algorithm,
                    tasks = report.task_count,
                    total_ticks = report.total_ticks,
                    avg_wait = report.averages.wait_time,
                    avg_turnaround = report.averages.turnaround_time,
                    avg_response = report.averages.response_time,
                    path = %path.display(),
                    "Simulation finished"
                ),
                _ => bail!("Simulation stopped before completion; no report written"),
            }
        }
        Commands::Clock { .. } => {
            config.require_fixed_ports()?;
            let summary = run_clock(config, interrupt).await?;
            info!(ticks = summary.ticks_sent, last_tick = ?summary.last_tick, "Clock finished");
        }
        Commands::Feeder { tasks } => {
            config.require_fixed_ports()?;
            let tasks = load_task_set(tasks, &config)?;
            let summary = run_feeder(config, tasks, interrupt).await?;
            info!(
                ticks = summary.ticks_handled,
                tasks_sent = summary.tasks_sent,
                failures = summary.send_failures,
                "Task Feeder finished"
            );
        }
        Commands::Scheduler { .. } => {
            config.require_fixed_ports()?;
            let (report, path) = run_scheduler(config, interrupt).await?;
            info!(
                algorithm = %report.algorithm,
                total_ticks = report.total_ticks,
                path = %path.display(),
                "Scheduler Engine finished"
            );
        }
        Commands::PrintConfig => {}
    }

    Ok(())
}

/// Task file from the command line, falling back to `feeder.tasks_file`
fn load_task_set(cli_path: Option<PathBuf>, config: &ServiceConfig) -> Result<Vec<TaskSpec>> {
    let Some(path) = cli_path.or_else(|| config.feeder.tasks_file.clone()) else {
        bail!("No task file given (pass one on the command line or set feeder.tasks_file)");
    };
    task_feeder::load_tasks(&path).with_context(|| format!("Failed to load tasks from {}", path.display()))
}

/// Resolves on the first Ctrl+C or SIGTERM
fn shutdown_requested() -> Result<impl Future<Output = ()>> {
    let mut signals = setup_signal_handlers()?;
    Ok(async move {
        match signals.recv().await {
            Some(name) => info!(signal = name, "Shutdown signal received"),
            None => std::future::pending::<()>().await,
        }
    })
}
