// Feeder state: which tasks are due at a tick and which have already been pushed

use std::collections::HashSet;

use sim_protocol::{TaskId, TaskSpec, Tick};
use tracing::warn;

/// Everything the Feeder must send after handling one tick, in send order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedBatch {
    pub tick: Tick,

    /// Tasks whose arrival time equals `tick`, first time seen
    pub tasks: Vec<TaskSpec>,

    /// Set exactly once, on the tick where the last task was emitted
    pub all_emitted: Option<usize>,
}

/// The full task set plus emission bookkeeping
#[derive(Debug)]
pub struct TaskFeeder {
    tasks: Vec<TaskSpec>,
    emitted: HashSet<TaskId>,
    all_emitted_sent: bool,
    last_tick: Option<Tick>,
}

impl TaskFeeder {
    /// Build a feeder over `tasks`; duplicate identities keep their first occurrence
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(tasks.len());

        for task in tasks {
            if seen.insert(task.id.clone()) {
                unique.push(task);
            } else {
                warn!(task = %task.id, "Duplicate task identity, keeping the first definition");
            }
        }
        unique.sort_by_key(|task| task.arrival_time);

        Self { tasks: unique, emitted: HashSet::new(), all_emitted_sent: false, last_tick: None }
    }

    /// Select the tasks due at `tick` and mark them emitted
    pub fn on_tick(&mut self, tick: Tick) -> FeedBatch {
        self.last_tick = Some(tick);

        let due: Vec<TaskSpec> = self
            .tasks
            .iter()
            .filter(|task| task.arrival_time == tick && !self.emitted.contains(&task.id))
            .cloned()
            .collect();

        for task in &due {
            self.emitted.insert(task.id.clone());
        }

        let mut all_emitted = None;
        if self.emitted.len() == self.tasks.len() && !self.all_emitted_sent {
            self.all_emitted_sent = true;
            all_emitted = Some(self.tasks.len());
        }

        FeedBatch { tick, tasks: due, all_emitted }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }

    pub fn all_emitted_sent(&self) -> bool {
        self.all_emitted_sent
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }
}
