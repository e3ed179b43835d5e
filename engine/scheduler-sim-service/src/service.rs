//! Component wiring and supervision
//!
//! `run_simulation` hosts all three components in one process. Listeners are bound before
//! anything is spawned, so a port conflict aborts startup and, with port 0, peers learn the
//! real addresses. The `run_*` functions for single components serve the
//! one-process-per-component deployment.

use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use scheduler_engine::{SchedulerService, SimulationReport};
use sim_protocol::{bind_listener, shutdown_channel, ShutdownSignal, TaskSpec};
use simulation_clock::{ClockPeers, ClockRunSummary, SimulationClock};
use task_feeder::{FeederService, FeederSummary, TaskFeeder};

use crate::config::ServiceConfig;
use crate::signals::join_with_timeout;

/// What a complete in-process run produced
#[derive(Debug)]
pub struct SimulationOutcome {
    /// Present when the Scheduler reached termination
    pub report: Option<SimulationReport>,

    /// Where the report was written
    pub report_path: Option<PathBuf>,

    pub clock: Option<ClockRunSummary>,
    pub feeder: Option<FeederSummary>,
}

/// The three listeners, bound up front
pub struct BoundListeners {
    pub clock: TcpListener,
    pub feeder: TcpListener,
    pub scheduler: TcpListener,
}

/// Actual listener addresses after binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddrs {
    pub clock: String,
    pub feeder: String,
    pub scheduler: String,
}

impl BoundListeners {
    /// Bind all three listeners; any failure is fatal
    pub async fn bind(config: &ServiceConfig) -> Result<Self> {
        let network = &config.network;
        let clock = bind_listener(&network.clock_addr()).await.context("Failed to bind Clock listener")?;
        let feeder = bind_listener(&network.feeder_addr()).await.context("Failed to bind Feeder listener")?;
        let scheduler =
            bind_listener(&network.scheduler_addr()).await.context("Failed to bind Scheduler listener")?;
        Ok(Self { clock, feeder, scheduler })
    }

    pub fn addrs(&self) -> Result<ResolvedAddrs> {
        Ok(ResolvedAddrs {
            clock: self.clock.local_addr()?.to_string(),
            feeder: self.feeder.local_addr()?.to_string(),
            scheduler: self.scheduler.local_addr()?.to_string(),
        })
    }
}

/// Run Clock, Feeder and Scheduler in this process until the report is ready or `interrupt`
/// resolves, then stop everything and write the report
pub async fn run_simulation(
    config: ServiceConfig,
    tasks: Vec<TaskSpec>,
    interrupt: impl Future<Output = ()>,
) -> Result<SimulationOutcome> {
    let algorithm = config.scheduler.algorithm()?;
    config.validate_tasks(&tasks)?;
    let listeners = BoundListeners::bind(&config).await?;
    let addrs = listeners.addrs()?;
    info!(
        clock = %addrs.clock,
        feeder = %addrs.feeder,
        scheduler = %addrs.scheduler,
        algorithm = %algorithm,
        ordering = %config.ordering,
        "Listeners bound"
    );

    let (signal, _) = shutdown_channel();
    let limit = config.shutdown_timeout();

    let scheduler = SchedulerService::new(algorithm, addrs.clock.clone(), config.transport.clone(), config.ordering);
    let mut scheduler_handle = tokio::spawn(scheduler.run(listeners.scheduler, signal.subscribe()));

    let feeder = FeederService::new(
        TaskFeeder::new(tasks),
        addrs.scheduler.clone(),
        config.transport.clone(),
        config.ordering,
    );
    let feeder_handle = tokio::spawn(feeder.run(listeners.feeder, signal.subscribe()));

    let clock = Arc::new(
        SimulationClock::new(
            config.clock.clone(),
            ClockPeers { feeder_addr: addrs.feeder.clone(), scheduler_addr: addrs.scheduler.clone() },
            config.transport.clone(),
        )
        .context("Failed to create SimulationClock")?,
    );
    let control_handle = tokio::spawn(clock.clone().run_control_plane(listeners.clock, signal.subscribe()));
    let clock_handle = {
        let clock = clock.clone();
        let shutdown = signal.subscribe();
        tokio::spawn(async move { clock.run_clock_loop(shutdown).await })
    };

    info!("Simulation running. Press Ctrl+C to stop early.");

    let report = tokio::select! {
        joined = &mut scheduler_handle => joined.context("Scheduler task failed")?,
        _ = interrupt => {
            warn!(tick = clock.get_current_tick(), "Interrupted before the simulation completed");
            signal.trigger();
            join_with_timeout("Scheduler Engine", scheduler_handle, limit).await.flatten()
        }
    };

    // after a completed run the Clock stops on its own once the termination token lands
    let clock_summary = match join_with_timeout("SimulationClock", clock_handle, limit).await {
        Some(Ok(summary)) => Some(summary),
        Some(Err(e)) => {
            warn!("SimulationClock stopped with an error: {}", e);
            None
        }
        None => None,
    };

    shutdown_components(&signal);
    let feeder_summary = join_with_timeout("Task Feeder", feeder_handle, limit).await;
    join_with_timeout("Clock control plane", control_handle, limit).await;

    let report_path = match &report {
        Some(report) => Some(
            report
                .write_to(&config.scheduler.report.directory, config.scheduler.report.format)
                .context("Failed to write simulation report")?,
        ),
        None => None,
    };

    Ok(SimulationOutcome { report, report_path, clock: clock_summary, feeder: feeder_summary })
}

fn shutdown_components(signal: &ShutdownSignal) {
    if !signal.is_triggered() {
        info!("Stopping remaining components");
        signal.trigger();
    }
}

/// Run only the Clock until it receives the termination token or `interrupt` resolves
pub async fn run_clock(config: ServiceConfig, interrupt: impl Future<Output = ()>) -> Result<ClockRunSummary> {
    let network = &config.network;
    let listener = bind_listener(&network.clock_addr()).await.context("Failed to bind Clock listener")?;
    let clock = Arc::new(
        SimulationClock::new(config.clock.clone(), ClockPeers::from_network(network), config.transport.clone())
            .context("Failed to create SimulationClock")?,
    );

    let (signal, _) = shutdown_channel();
    let limit = config.shutdown_timeout();
    let control_handle = tokio::spawn(clock.clone().run_control_plane(listener, signal.subscribe()));
    let mut clock_handle = {
        let clock = clock.clone();
        let shutdown = signal.subscribe();
        tokio::spawn(async move { clock.run_clock_loop(shutdown).await })
    };

    let summary = tokio::select! {
        joined = &mut clock_handle => joined.context("Clock task failed")??,
        _ = interrupt => {
            warn!(tick = clock.get_current_tick(), "Clock interrupted");
            clock.request_stop();
            join_with_timeout("SimulationClock", clock_handle, limit)
                .await
                .ok_or_else(|| anyhow!("SimulationClock did not stop cleanly"))??
        }
    };

    shutdown_components(&signal);
    join_with_timeout("Clock control plane", control_handle, limit).await;
    Ok(summary)
}

/// Run only the Task Feeder until `interrupt` resolves
pub async fn run_feeder(
    config: ServiceConfig,
    tasks: Vec<TaskSpec>,
    interrupt: impl Future<Output = ()>,
) -> Result<FeederSummary> {
    config.validate_tasks(&tasks)?;
    let network = &config.network;
    let listener = bind_listener(&network.feeder_addr()).await.context("Failed to bind Feeder listener")?;

    let (signal, _) = shutdown_channel();
    let feeder = FeederService::new(
        TaskFeeder::new(tasks),
        network.scheduler_addr(),
        config.transport.clone(),
        config.ordering,
    );
    let handle = tokio::spawn(feeder.run(listener, signal.subscribe()));

    interrupt.await;
    signal.trigger();
    join_with_timeout("Task Feeder", handle, config.shutdown_timeout())
        .await
        .ok_or_else(|| anyhow!("Task Feeder did not stop cleanly"))
}

/// Run only the Scheduler Engine; writes the report on completion
pub async fn run_scheduler(
    config: ServiceConfig,
    interrupt: impl Future<Output = ()>,
) -> Result<(SimulationReport, PathBuf)> {
    let algorithm = config.scheduler.algorithm()?;
    let network = &config.network;
    let listener =
        bind_listener(&network.scheduler_addr()).await.context("Failed to bind Scheduler listener")?;

    let (signal, _) = shutdown_channel();
    let scheduler = SchedulerService::new(algorithm, network.clock_addr(), config.transport.clone(), config.ordering);
    let mut handle = tokio::spawn(scheduler.run(listener, signal.subscribe()));

    let report = tokio::select! {
        joined = &mut handle => joined.context("Scheduler task failed")?,
        _ = interrupt => {
            signal.trigger();
            join_with_timeout("Scheduler Engine", handle, config.shutdown_timeout()).await.flatten()
        }
    };
    shutdown_components(&signal);

    let report = report.ok_or_else(|| anyhow!("Scheduler stopped before the simulation completed"))?;
    let path = report
        .write_to(&config.scheduler.report.directory, config.scheduler.report.format)
        .context("Failed to write simulation report")?;
    Ok((report, path))
}
