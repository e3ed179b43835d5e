// Per-task scheduling state held by the engine

use serde::Serialize;
use sim_protocol::{TaskId, TaskSpec, Tick};

/// A task owned by the Scheduler Engine: fixed identity plus mutable scheduling state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledTask {
    pub spec: TaskSpec,

    /// Units of execution still owed; never increases
    pub remaining_time: u64,

    /// Current priority, lowered only by aging and never below 1
    pub priority: u32,

    pub start_time: Option<Tick>,
    pub finish_time: Option<Tick>,
    pub response_time: Option<u64>,

    /// Insertion order into the engine, last-resort tie-break
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl ScheduledTask {
    pub(crate) fn new(spec: TaskSpec, seq: u64) -> Self {
        Self {
            remaining_time: spec.burst_time,
            priority: spec.priority,
            spec,
            start_time: None,
            finish_time: None,
            response_time: None,
            seq,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.spec.id
    }

    pub fn arrival_time(&self) -> Tick {
        self.spec.arrival_time
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_time == 0
    }

    /// Record the first dispatch; later dispatches leave start and response untouched
    pub(crate) fn dispatch(&mut self, tick: Tick) -> bool {
        if self.start_time.is_some() {
            return false;
        }
        self.start_time = Some(tick);
        self.response_time = Some(tick.saturating_sub(self.spec.arrival_time));
        true
    }

    /// Execute for one tick
    pub(crate) fn run_once(&mut self) {
        self.remaining_time = self.remaining_time.saturating_sub(1);
    }

    /// One aging step, floored at priority 1
    pub(crate) fn age(&mut self) {
        if self.priority > 1 {
            self.priority -= 1;
        }
    }

    pub fn wait_time(&self) -> Option<u64> {
        self.start_time.map(|start| start.saturating_sub(self.spec.arrival_time))
    }

    pub fn turnaround_time(&self) -> Option<u64> {
        self.finish_time.map(|finish| finish.saturating_sub(self.spec.arrival_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_dispatch_only() {
        let mut task = ScheduledTask::new(TaskSpec::new("A", 2, 3, 4), 0);

        assert!(task.dispatch(5));
        assert!(!task.dispatch(9));
        assert_eq!(task.start_time, Some(5));
        assert_eq!(task.response_time, Some(3));
        assert_eq!(task.wait_time(), Some(3));
    }

    #[test]
    fn test_run_and_age_floor() {
        let mut task = ScheduledTask::new(TaskSpec::new("A", 0, 1, 2), 0);

        task.run_once();
        assert!(task.is_finished());
        task.run_once();
        assert_eq!(task.remaining_time, 0);

        task.age();
        task.age();
        assert_eq!(task.priority, 1);
        assert_eq!(task.spec.priority, 2);
    }
}
