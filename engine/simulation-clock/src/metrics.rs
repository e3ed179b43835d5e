//! Metrics collection for SimulationClock

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics collected by the SimulationClock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockMetrics {
    /// Last tick sent
    pub current_tick: u64,

    /// Duration of the last cycle in nanoseconds
    pub cycle_duration_ns: u64,

    /// Average cycle duration over the kept history, in nanoseconds
    pub avg_cycle_duration_ns: u64,

    /// Maximum cycle duration in nanoseconds
    pub max_cycle_duration_ns: u64,

    /// Observed tick rate in Hz
    pub tick_rate_hz: f64,

    /// Total completed cycles
    pub total_ticks_sent: u64,

    /// Ticks the Feeder never received
    pub feeder_send_failures: u64,

    /// Ticks the Scheduler never received
    pub scheduler_send_failures: u64,

    /// Clock uptime in seconds
    pub uptime_seconds: u64,
}

/// Metrics collector for the SimulationClock
pub struct MetricsCollector {
    current_tick: AtomicU64,
    cycle_durations: Vec<AtomicU64>,
    max_cycle_duration: AtomicU64,
    total_ticks: AtomicU64,
    feeder_failures: AtomicU64,
    scheduler_failures: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    /// Create a new metrics collector keeping `history_size` cycle durations
    pub fn new(history_size: usize) -> Self {
        let cycle_durations = (0..history_size.max(1)).map(|_| AtomicU64::new(0)).collect();

        Self {
            current_tick: AtomicU64::new(0),
            cycle_durations,
            max_cycle_duration: AtomicU64::new(0),
            total_ticks: AtomicU64::new(0),
            feeder_failures: AtomicU64::new(0),
            scheduler_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed cycle
    pub fn record_cycle(&self, tick: u64, duration: Duration, feeder_ok: bool, scheduler_ok: bool) {
        let duration_ns = duration.as_nanos() as u64;
        let index = (tick as usize) % self.cycle_durations.len();

        self.current_tick.store(tick, Ordering::Relaxed);
        self.cycle_durations[index].store(duration_ns, Ordering::Relaxed);
        self.total_ticks.fetch_add(1, Ordering::Relaxed);
        self.max_cycle_duration.fetch_max(duration_ns, Ordering::Relaxed);

        if !feeder_ok {
            self.feeder_failures.fetch_add(1, Ordering::Relaxed);
        }
        if !scheduler_ok {
            self.scheduler_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> ClockMetrics {
        let current_tick = self.current_tick.load(Ordering::Relaxed);
        let total_ticks = self.total_ticks.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();

        let tick_rate_hz =
            if elapsed.as_secs_f64() > 0.0 { total_ticks as f64 / elapsed.as_secs_f64() } else { 0.0 };

        let durations: Vec<u64> = self
            .cycle_durations
            .iter()
            .map(|d| d.load(Ordering::Relaxed))
            .filter(|&d| d > 0)
            .collect();

        let avg_cycle_duration_ns = if durations.is_empty() {
            0
        } else {
            durations.iter().sum::<u64>() / durations.len() as u64
        };

        let last_index = (current_tick as usize) % self.cycle_durations.len();

        ClockMetrics {
            current_tick,
            cycle_duration_ns: self.cycle_durations[last_index].load(Ordering::Relaxed),
            avg_cycle_duration_ns,
            max_cycle_duration_ns: self.max_cycle_duration.load(Ordering::Relaxed),
            tick_rate_hz,
            total_ticks_sent: total_ticks,
            feeder_send_failures: self.feeder_failures.load(Ordering::Relaxed),
            scheduler_send_failures: self.scheduler_failures.load(Ordering::Relaxed),
            uptime_seconds: elapsed.as_secs(),
        }
    }
}
