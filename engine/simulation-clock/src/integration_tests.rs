//! Integration tests for SimulationClock over loopback TCP
//! A fake Feeder and a fake Scheduler listen on ephemeral ports and record what they receive.

use std::sync::Arc;
use std::time::Duration;

use sim_protocol::{
    bind_listener, run_listener, send_message, shutdown_channel, Message, ShutdownSignal, Tick,
    TransportConfig,
};
use tokio::sync::mpsc;

use crate::config::MonitoringConfig;
use crate::{ClockConfig, ClockPeers, ClockState, SimulationClock};

/// Which fake peer saw a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peer {
    Feeder,
    Scheduler,
}

struct Harness {
    clock: Arc<SimulationClock>,
    control_addr: String,
    events: mpsc::UnboundedReceiver<(Peer, Tick)>,
    signal: ShutdownSignal,
}

async fn spawn_peer(peer: Peer, events: mpsc::UnboundedSender<(Peer, Tick)>, signal: &ShutdownSignal) -> String {
    let listener = bind_listener("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, mut rx) = mpsc::channel(64);

    tokio::spawn(run_listener("fake-peer", listener, tx, TransportConfig::default(), signal.subscribe()));
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Message::Tick(tick) = message {
                let _ = events.send((peer, tick));
            }
        }
    });

    addr
}

async fn start_harness(tick_period_ms: u64, feeder_delay_ms: u64) -> Harness {
    let (signal, _) = shutdown_channel();
    let (events_tx, events) = mpsc::unbounded_channel();

    let feeder_addr = spawn_peer(Peer::Feeder, events_tx.clone(), &signal).await;
    let scheduler_addr = spawn_peer(Peer::Scheduler, events_tx, &signal).await;

    let config = ClockConfig {
        tick_period_ms,
        feeder_delay_ms,
        initial_tick: 0,
        monitoring: MonitoringConfig { emit_metrics: false, metrics_interval_ticks: 0, history_size: 64 },
    };
    let clock = Arc::new(
        SimulationClock::new(config, ClockPeers { feeder_addr, scheduler_addr }, TransportConfig::default())
            .unwrap(),
    );

    let control = bind_listener("127.0.0.1:0").await.unwrap();
    let control_addr = control.local_addr().unwrap().to_string();
    tokio::spawn(clock.clone().run_control_plane(control, signal.subscribe()));

    Harness { clock, control_addr, events, signal }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<(Peer, Tick)>) -> (Peer, Tick) {
    tokio::time::timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap()
}

#[cfg(test)]
#[allow(clippy::module_inception)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_feeder_receives_each_tick_before_scheduler() {
        let mut harness = start_harness(60, 20).await;
        let clock = harness.clock.clone();
        let loop_handle = tokio::spawn({
            let shutdown = harness.signal.subscribe();
            async move { clock.run_clock_loop(shutdown).await }
        });

        for expected in 0..3 {
            assert_eq!(next_event(&mut harness.events).await, (Peer::Feeder, expected));
            assert_eq!(next_event(&mut harness.events).await, (Peer::Scheduler, expected));
        }

        send_message(&harness.control_addr, &Message::Terminate, &TransportConfig::default())
            .await
            .unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(2), loop_handle).await.unwrap().unwrap().unwrap();
        assert_eq!(harness.clock.state(), ClockState::Stopped);
        assert_eq!(summary.ticks_sent, summary.last_tick.unwrap() + 1);

        harness.signal.trigger();
    }

    #[tokio::test]
    async fn test_in_flight_cycle_completes_after_termination() {
        let mut harness = start_harness(1_000, 300).await;
        let clock = harness.clock.clone();
        let loop_handle = tokio::spawn({
            let shutdown = harness.signal.subscribe();
            async move { clock.run_clock_loop(shutdown).await }
        });

        assert_eq!(next_event(&mut harness.events).await, (Peer::Feeder, 0));

        // Stop while the clock is inside the feeder delay of cycle 0
        send_message(&harness.control_addr, &Message::Terminate, &TransportConfig::default())
            .await
            .unwrap();

        assert_eq!(next_event(&mut harness.events).await, (Peer::Scheduler, 0));

        let summary = tokio::time::timeout(Duration::from_secs(2), loop_handle).await.unwrap().unwrap().unwrap();
        assert_eq!(summary.last_tick, Some(0));
        assert_eq!(summary.ticks_sent, 1);

        let late = tokio::time::timeout(Duration::from_millis(200), harness.events.recv()).await;
        assert!(late.is_err(), "no tick may follow the termination cycle");

        harness.signal.trigger();
    }

    #[tokio::test]
    async fn test_control_plane_ignores_non_termination_messages() {
        let mut harness = start_harness(40, 5).await;
        let clock = harness.clock.clone();
        let loop_handle = tokio::spawn({
            let shutdown = harness.signal.subscribe();
            async move { clock.run_clock_loop(shutdown).await }
        });

        send_message(&harness.control_addr, &Message::Tick(99), &TransportConfig::default())
            .await
            .unwrap();

        assert_eq!(next_event(&mut harness.events).await.1, 0);
        assert_eq!(next_event(&mut harness.events).await.1, 0);
        assert_eq!(next_event(&mut harness.events).await.1, 1);
        assert!(harness.clock.is_running());

        harness.signal.trigger();
        let summary = tokio::time::timeout(Duration::from_secs(2), loop_handle).await.unwrap().unwrap().unwrap();
        assert!(summary.ticks_sent >= 2);
        assert_eq!(harness.clock.state(), ClockState::Stopped);
    }

    #[tokio::test]
    async fn test_unreachable_peers_do_not_stall_the_clock() {
        let (signal, _) = shutdown_channel();
        let config = ClockConfig {
            tick_period_ms: 10,
            feeder_delay_ms: 1,
            initial_tick: 7,
            monitoring: MonitoringConfig { emit_metrics: false, metrics_interval_ticks: 0, history_size: 8 },
        };
        let dead = bind_listener("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap().to_string();
        drop(dead);

        let clock = Arc::new(
            SimulationClock::new(
                config,
                ClockPeers { feeder_addr: dead_addr.clone(), scheduler_addr: dead_addr },
                TransportConfig::default(),
            )
            .unwrap(),
        );

        let loop_handle = tokio::spawn({
            let clock = clock.clone();
            let shutdown = signal.subscribe();
            async move { clock.run_clock_loop(shutdown).await }
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        signal.trigger();

        let summary = tokio::time::timeout(Duration::from_secs(2), loop_handle).await.unwrap().unwrap().unwrap();
        assert!(summary.ticks_sent >= 2);
        assert_eq!(summary.metrics.feeder_send_failures, summary.ticks_sent);
        assert_eq!(summary.metrics.scheduler_send_failures, summary.ticks_sent);
        assert!(clock.get_current_tick() > 7);
    }

    #[tokio::test]
    async fn test_clock_cannot_run_twice() {
        let harness = start_harness(20, 2).await;
        harness.clock.request_stop();

        let first = harness.clock.run_clock_loop(harness.signal.subscribe()).await.unwrap();
        assert_eq!(first.ticks_sent, 0);

        let second = harness.clock.run_clock_loop(harness.signal.subscribe()).await;
        assert!(matches!(second, Err(crate::ClockError::ClockAlreadyRunning)));

        harness.signal.trigger();
    }
}
