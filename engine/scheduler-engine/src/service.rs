//! Scheduler Engine service loop
//!
//! The listener decodes each inbound connection and forwards it over a channel; this loop is
//! the only writer of `SchedulerState`. In barrier mode a tick waits in `pending_ticks` until
//! the Feeder has declared arrivals settled for that tick or a later one.

use std::collections::BTreeSet;

use sim_protocol::{
    deliver, run_listener, Message, ShutdownListener, TaskEnvelope, Tick, TickOrdering,
    TransportConfig,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::algorithm::Algorithm;
use crate::report::SimulationReport;
use crate::state::{SchedulerState, TickOutcome};

/// The Scheduler Engine component
pub struct SchedulerService {
    state: SchedulerState,
    clock_addr: String,
    transport: TransportConfig,
    ordering: TickOrdering,
    pending_ticks: BTreeSet<Tick>,
    settled_through: Option<Tick>,
    termination_sent: bool,
}

impl SchedulerService {
    pub fn new(
        algorithm: Algorithm,
        clock_addr: impl Into<String>,
        transport: TransportConfig,
        ordering: TickOrdering,
    ) -> Self {
        Self {
            state: SchedulerState::new(algorithm),
            clock_addr: clock_addr.into(),
            transport,
            ordering,
            pending_ticks: BTreeSet::new(),
            settled_through: None,
            termination_sent: false,
        }
    }

    /// Serve until the simulation completes or shutdown is signalled.
    ///
    /// Returns the report on completion, `None` if stopped early.
    pub async fn run(mut self, listener: TcpListener, shutdown: ShutdownListener) -> Option<SimulationReport> {
        info!(
            algorithm = %self.state.algorithm(),
            clock = %self.clock_addr,
            ordering = %self.ordering,
            "Starting Scheduler Engine"
        );

        let (tx, mut rx) = mpsc::channel(self.transport.channel_capacity);
        let listener_task =
            tokio::spawn(run_listener("scheduler", listener, tx, self.transport.clone(), shutdown));

        let mut report = None;
        while let Some(message) = rx.recv().await {
            if let Some(done) = self.handle_message(message).await {
                report = Some(done);
                break;
            }
        }

        listener_task.abort();
        let _ = listener_task.await;

        if report.is_none() {
            warn!(
                last_tick = ?self.state.last_tick(),
                finished = self.state.finished_tasks().len(),
                "Scheduler Engine stopped before the simulation completed"
            );
        }
        report
    }

    /// Apply one inbound message; returns the report when it completes the simulation
    pub async fn handle_message(&mut self, message: Message) -> Option<SimulationReport> {
        match message {
            Message::Tick(tick) => {
                debug!(tick, "Scheduler received tick");
                match self.ordering {
                    TickOrdering::Delay => self.execute_tick(tick).await,
                    TickOrdering::Barrier => {
                        self.pending_ticks.insert(tick);
                        self.drain_settled_ticks().await
                    }
                }
            }
            Message::Envelope(TaskEnvelope::Task(spec)) => {
                self.state.enqueue_task(spec);
                None
            }
            Message::Envelope(TaskEnvelope::AllTasksEmitted { task_count }) => {
                self.state.mark_all_emitted(task_count);
                None
            }
            Message::Envelope(TaskEnvelope::ArrivalsSettled { tick }) => {
                self.settled_through = self.settled_through.max(Some(tick));
                self.drain_settled_ticks().await
            }
            Message::Terminate => {
                warn!("Termination token is meant for the Clock, discarding");
                None
            }
        }
    }

    /// Run buffered ticks, oldest first, that arrivals have been settled for
    async fn drain_settled_ticks(&mut self) -> Option<SimulationReport> {
        while let Some(&tick) = self.pending_ticks.first() {
            if !self.settled_through.is_some_and(|settled| settled >= tick) {
                debug!(tick, settled = ?self.settled_through, "Tick waiting for arrivals to settle");
                return None;
            }
            self.pending_ticks.remove(&tick);

            if let Some(report) = self.execute_tick(tick).await {
                self.pending_ticks.clear();
                return Some(report);
            }
        }
        None
    }

    async fn execute_tick(&mut self, tick: Tick) -> Option<SimulationReport> {
        match self.state.apply_tick(tick) {
            TickOutcome::Completed => self.complete().await,
            _ => None,
        }
    }

    async fn complete(&mut self) -> Option<SimulationReport> {
        if !self.termination_sent {
            self.termination_sent = true;
            info!(clock = %self.clock_addr, "Sending termination to the Clock");
            deliver(&self.clock_addr, &Message::Terminate, &self.transport).await;
        }
        self.state.report()
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Ticks received but not yet executed
    pub fn pending_ticks(&self) -> usize {
        self.pending_ticks.len()
    }
}
