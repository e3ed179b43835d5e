//! Core SimulationClock implementation

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sim_protocol::{
    deliver, run_listener, Message, NetworkConfig, ShutdownListener, Tick, TransportConfig,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::config::ClockConfig;
use crate::error::ClockError;
use crate::metrics::{ClockMetrics, MetricsCollector};

/// Run state of the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl ClockState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClockState::Running,
            1 => ClockState::Stopping,
            _ => ClockState::Stopped,
        }
    }
}

/// Addresses the clock sends ticks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockPeers {
    pub feeder_addr: String,
    pub scheduler_addr: String,
}

impl ClockPeers {
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self { feeder_addr: network.feeder_addr(), scheduler_addr: network.scheduler_addr() }
    }
}

/// What the main loop did before it stopped
#[derive(Debug, Clone)]
pub struct ClockRunSummary {
    /// Last tick sent to the Scheduler, if any cycle ran
    pub last_tick: Option<Tick>,

    /// Completed cycles
    pub ticks_sent: u64,

    /// Metrics snapshot taken at stop
    pub metrics: ClockMetrics,
}

/// The SimulationClock - drives logical time for the Feeder and the Scheduler
pub struct SimulationClock {
    // Core state
    current_tick: AtomicU64,
    state: AtomicU8,
    started: AtomicBool,
    wake: Notify,

    // Wiring
    peers: ClockPeers,
    transport: TransportConfig,

    // Configuration
    config: ClockConfig,

    // Metrics
    metrics_collector: Arc<MetricsCollector>,
}

impl SimulationClock {
    /// Create a new SimulationClock
    pub fn new(
        config: ClockConfig,
        peers: ClockPeers,
        transport: TransportConfig,
    ) -> Result<Self, ClockError> {
        config.validate()?;

        let metrics_collector = Arc::new(MetricsCollector::new(config.monitoring.history_size));

        info!(
            initial_tick = config.initial_tick,
            feeder = %peers.feeder_addr,
            scheduler = %peers.scheduler_addr,
            "Creating SimulationClock"
        );

        Ok(Self {
            current_tick: AtomicU64::new(config.initial_tick),
            state: AtomicU8::new(ClockState::Running as u8),
            started: AtomicBool::new(false),
            wake: Notify::new(),
            peers,
            transport,
            config,
            metrics_collector,
        })
    }

    /// Run the send cycle until a termination command or shutdown arrives
    pub async fn run_clock_loop(
        &self,
        mut shutdown: ShutdownListener,
    ) -> Result<ClockRunSummary, ClockError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ClockError::ClockAlreadyRunning);
        }

        info!(
            tick_period_ms = self.config.tick_period_ms,
            feeder_delay_ms = self.config.feeder_delay_ms,
            "Starting SimulationClock main loop"
        );

        let mut last_tick = None;

        while self.state() == ClockState::Running {
            if shutdown.is_shutdown() {
                self.request_stop();
                break;
            }

            let cycle_start = Instant::now();
            let tick = self.current_tick.load(Ordering::SeqCst);

            let (feeder_ok, scheduler_ok) = self.run_cycle(tick).await;
            self.current_tick.fetch_add(1, Ordering::SeqCst);
            last_tick = Some(tick);

            self.metrics_collector.record_cycle(tick, cycle_start.elapsed(), feeder_ok, scheduler_ok);
            self.maybe_emit_metrics(tick);

            if self.state() != ClockState::Running {
                break;
            }

            self.wait_for_next_tick(cycle_start, &mut shutdown).await;
        }

        self.state.store(ClockState::Stopped as u8, Ordering::SeqCst);

        let metrics = self.metrics_collector.get_metrics();
        info!(
            last_tick = ?last_tick,
            ticks_sent = metrics.total_ticks_sent,
            feeder_failures = metrics.feeder_send_failures,
            scheduler_failures = metrics.scheduler_send_failures,
            "SimulationClock main loop stopped"
        );

        Ok(ClockRunSummary { last_tick, ticks_sent: metrics.total_ticks_sent, metrics })
    }

    /// One cycle: Feeder first, then after the configured delay the Scheduler.
    ///
    /// Once started a cycle always completes; a stop request only prevents the next one.
    async fn run_cycle(&self, tick: Tick) -> (bool, bool) {
        let message = Message::Tick(tick);

        let feeder_ok = deliver(&self.peers.feeder_addr, &message, &self.transport).await;
        tokio::time::sleep(self.config.feeder_delay()).await;
        let scheduler_ok = deliver(&self.peers.scheduler_addr, &message, &self.transport).await;

        debug!(tick, feeder_ok, scheduler_ok, "Tick sent");
        (feeder_ok, scheduler_ok)
    }

    /// Wait out the remainder of the tick period, waking early on stop
    async fn wait_for_next_tick(&self, cycle_start: Instant, shutdown: &mut ShutdownListener) {
        let remaining = self.config.tick_period().saturating_sub(cycle_start.elapsed());
        if remaining == Duration::ZERO {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(remaining) => {}
            _ = self.wake.notified() => {}
            _ = shutdown.wait() => {
                self.request_stop();
            }
        }
    }

    fn maybe_emit_metrics(&self, tick: Tick) {
        let monitoring = &self.config.monitoring;
        if !monitoring.emit_metrics || monitoring.metrics_interval_ticks == 0 {
            return;
        }
        if tick % monitoring.metrics_interval_ticks != 0 {
            return;
        }

        let metrics = self.metrics_collector.get_metrics();
        info!(
            tick,
            avg_cycle_ns = metrics.avg_cycle_duration_ns,
            max_cycle_ns = metrics.max_cycle_duration_ns,
            tick_rate_hz = metrics.tick_rate_hz,
            feeder_failures = metrics.feeder_send_failures,
            scheduler_failures = metrics.scheduler_send_failures,
            "Clock metrics"
        );
    }

    /// Move from RUNNING to STOPPING; returns false if a stop was already requested
    pub fn request_stop(&self) -> bool {
        let flipped = self
            .state
            .compare_exchange(
                ClockState::Running as u8,
                ClockState::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if flipped {
            self.wake.notify_one();
        }
        flipped
    }

    /// Serve the control plane until shutdown.
    ///
    /// Only the termination token means anything here; the first one stops the clock and
    /// any later message is ignored.
    pub async fn run_control_plane(self: Arc<Self>, listener: TcpListener, shutdown: ShutdownListener) {
        let (tx, mut rx) = mpsc::channel(self.transport.channel_capacity);
        let listener_task = tokio::spawn(run_listener(
            "clock-control",
            listener,
            tx,
            self.transport.clone(),
            shutdown,
        ));

        while let Some(message) = rx.recv().await {
            match message {
                Message::Terminate => {
                    if self.request_stop() {
                        info!(tick = self.get_current_tick(), "Termination command received");
                    } else {
                        debug!("Ignoring repeated termination command");
                    }
                }
                other => {
                    warn!(kind = other.kind(), "Control listener only accepts the termination token");
                }
            }
        }

        let _ = listener_task.await;
    }

    /// Get the next tick to be sent
    pub fn get_current_tick(&self) -> Tick {
        self.current_tick.load(Ordering::Relaxed)
    }

    /// Current run state
    pub fn state(&self) -> ClockState {
        ClockState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if clock is running
    pub fn is_running(&self) -> bool {
        self.state() == ClockState::Running
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> ClockMetrics {
        self.metrics_collector.get_metrics()
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }
}
