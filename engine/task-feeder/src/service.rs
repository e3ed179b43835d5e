//! Task Feeder service loop
//!
//! Ticks from the Clock arrive through the listener channel; for each one the Feeder pushes
//! the due tasks to the Scheduler Engine, then the all-emitted notice when the last task has
//! gone out, then (in barrier mode) the arrivals-settled notice for that tick. Sends are
//! sequential, so the Scheduler sees them in this order.

use serde::Serialize;
use sim_protocol::{
    deliver, run_listener, Message, ShutdownListener, TaskEnvelope, Tick, TickOrdering,
    TransportConfig,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feeder::{FeedBatch, TaskFeeder};

/// Counters reported when the Feeder stops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeederSummary {
    pub ticks_handled: u64,
    pub tasks_sent: u64,
    pub send_failures: u64,
    pub all_emitted_sent: bool,
}

/// The Feeder component: owns the task set and talks to the Scheduler Engine
pub struct FeederService {
    feeder: TaskFeeder,
    scheduler_addr: String,
    transport: TransportConfig,
    ordering: TickOrdering,
    summary: FeederSummary,
}

impl FeederService {
    pub fn new(
        feeder: TaskFeeder,
        scheduler_addr: impl Into<String>,
        transport: TransportConfig,
        ordering: TickOrdering,
    ) -> Self {
        Self {
            feeder,
            scheduler_addr: scheduler_addr.into(),
            transport,
            ordering,
            summary: FeederSummary::default(),
        }
    }

    /// Serve ticks until shutdown
    pub async fn run(mut self, listener: TcpListener, shutdown: ShutdownListener) -> FeederSummary {
        info!(
            tasks = self.feeder.task_count(),
            scheduler = %self.scheduler_addr,
            ordering = %self.ordering,
            "Starting Task Feeder"
        );

        let (tx, mut rx) = mpsc::channel(self.transport.channel_capacity);
        let listener_task =
            tokio::spawn(run_listener("feeder", listener, tx, self.transport.clone(), shutdown));

        while let Some(message) = rx.recv().await {
            match message {
                Message::Tick(tick) => self.handle_tick(tick).await,
                other => warn!(kind = other.kind(), "Feeder only accepts ticks, discarding"),
            }
        }

        let _ = listener_task.await;

        info!(
            ticks = self.summary.ticks_handled,
            tasks_sent = self.summary.tasks_sent,
            failures = self.summary.send_failures,
            "Task Feeder stopped"
        );
        self.summary
    }

    /// Handle one tick from the Clock
    pub async fn handle_tick(&mut self, tick: Tick) {
        self.summary.ticks_handled += 1;
        let batch = self.feeder.on_tick(tick);
        debug!(tick, due = batch.tasks.len(), "Feeder received tick");

        for message in self.outbound_messages(batch) {
            let is_task = matches!(message, Message::Envelope(TaskEnvelope::Task(_)));
            if deliver(&self.scheduler_addr, &message, &self.transport).await {
                if is_task {
                    self.summary.tasks_sent += 1;
                }
            } else {
                self.summary.send_failures += 1;
            }
        }
    }

    /// Messages for one batch, in the order the Scheduler must see them
    fn outbound_messages(&mut self, batch: FeedBatch) -> Vec<Message> {
        let mut messages: Vec<Message> = Vec::with_capacity(batch.tasks.len() + 2);

        for task in batch.tasks {
            info!(tick = batch.tick, task = %task.id, "Emitting task");
            messages.push(TaskEnvelope::Task(task).into());
        }

        if let Some(task_count) = batch.all_emitted {
            info!(tick = batch.tick, task_count, "All tasks emitted");
            self.summary.all_emitted_sent = true;
            messages.push(TaskEnvelope::AllTasksEmitted { task_count: Some(task_count) }.into());
        }

        if self.ordering == TickOrdering::Barrier {
            messages.push(TaskEnvelope::ArrivalsSettled { tick: batch.tick }.into());
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_protocol::{bind_listener, send_message, shutdown_channel, TaskSpec};
    use std::time::Duration;

    async fn fake_scheduler(
        signal: &sim_protocol::ShutdownSignal,
    ) -> (String, mpsc::Receiver<Message>) {
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run_listener("fake-scheduler", listener, tx, TransportConfig::default(), signal.subscribe()));
        (addr, rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<Message>) -> Message {
        tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_barrier_mode_message_order() {
        let (signal, _) = shutdown_channel();
        let (scheduler_addr, mut inbox) = fake_scheduler(&signal).await;

        let feeder = TaskFeeder::new(vec![TaskSpec::new("A", 0, 3, 1), TaskSpec::new("B", 1, 2, 1)]);
        let service = FeederService::new(feeder, scheduler_addr, TransportConfig::default(), TickOrdering::Barrier);

        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let feeder_addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(service.run(listener, signal.subscribe()));

        let config = TransportConfig::default();
        send_message(&feeder_addr, &Message::Tick(0), &config).await.unwrap();

        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::Task(TaskSpec::new("A", 0, 3, 1))));
        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::ArrivalsSettled { tick: 0 }));

        send_message(&feeder_addr, &Message::Tick(1), &config).await.unwrap();

        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::Task(TaskSpec::new("B", 1, 2, 1))));
        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::AllTasksEmitted { task_count: Some(2) }));
        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::ArrivalsSettled { tick: 1 }));

        signal.trigger();
        let summary = tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(
            summary,
            FeederSummary { ticks_handled: 2, tasks_sent: 2, send_failures: 0, all_emitted_sent: true }
        );
    }

    #[tokio::test]
    async fn test_delay_mode_sends_no_settled_notice() {
        let (signal, _) = shutdown_channel();
        let (scheduler_addr, mut inbox) = fake_scheduler(&signal).await;

        let feeder = TaskFeeder::new(vec![TaskSpec::new("A", 0, 3, 1)]);
        let mut service = FeederService::new(feeder, scheduler_addr, TransportConfig::default(), TickOrdering::Delay);

        service.handle_tick(0).await;
        service.handle_tick(1).await;

        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::Task(TaskSpec::new("A", 0, 3, 1))));
        assert_eq!(recv(&mut inbox).await, Message::from(TaskEnvelope::AllTasksEmitted { task_count: Some(1) }));

        let nothing = tokio::time::timeout(Duration::from_millis(150), inbox.recv()).await;
        assert!(nothing.is_err());

        signal.trigger();
    }

    #[tokio::test]
    async fn test_lost_task_messages_are_not_retried() {
        let dead = bind_listener("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap().to_string();
        drop(dead);

        let feeder = TaskFeeder::new(vec![TaskSpec::new("A", 0, 3, 1)]);
        let mut service = FeederService::new(feeder, dead_addr, TransportConfig::default(), TickOrdering::Barrier);

        service.handle_tick(0).await;
        service.handle_tick(0).await;

        // task, all-emitted and settled fail on the first tick; the repeat only adds a settled notice
        assert_eq!(service.summary.tasks_sent, 0);
        assert_eq!(service.summary.send_failures, 4);
        assert!(service.summary.all_emitted_sent);
    }
}
