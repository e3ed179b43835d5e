//! SchedulerState - the single mutable aggregate owned by the Scheduler Engine
//!
//! Three operations mutate it: `enqueue_task`, `mark_all_emitted` and `apply_tick`. The
//! owning loop calls them one message at a time, so no locking happens here.
//!
//! Per tick, in order: aging (dynamic priority only), finalize a task that ran out on the
//! previous tick, the policy's preemption check, selection, the termination check, then one
//! unit of execution or an idle marker.

use std::collections::{HashSet, VecDeque};

use sim_protocol::{TaskId, TaskSpec, Tick};
use tracing::{debug, info, warn};

use crate::algorithm::Algorithm;
use crate::report::SimulationReport;
use crate::task::ScheduledTask;

/// What a call to `apply_tick` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The task executed for one unit
    Ran(TaskId),
    /// Nothing was runnable
    Idle,
    /// The termination condition held at this tick; nothing executed
    Completed,
    /// The tick was not newer than the last one applied
    Stale,
    /// The simulation had already finished
    Ignored,
}

/// Scheduling state for one run
#[derive(Debug)]
pub struct SchedulerState {
    algorithm: Algorithm,
    ready: VecDeque<ScheduledTask>,
    current: Option<ScheduledTask>,
    finished: Vec<ScheduledTask>,
    timeline: Vec<Option<TaskId>>,
    received: HashSet<TaskId>,
    last_tick: Option<Tick>,
    quantum_used: u64,
    aging_counter: u64,
    all_tasks_emitted: bool,
    expected_tasks: Option<usize>,
    simulation_finished: bool,
    next_seq: u64,
}

impl SchedulerState {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ready: VecDeque::new(),
            current: None,
            finished: Vec::new(),
            timeline: Vec::new(),
            received: HashSet::new(),
            last_tick: None,
            quantum_used: 0,
            aging_counter: 0,
            all_tasks_emitted: false,
            expected_tasks: None,
            simulation_finished: false,
            next_seq: 0,
        }
    }

    /// Admit a task to the ready queue. Duplicates and late arrivals after termination are
    /// ignored; returns whether the task was admitted.
    pub fn enqueue_task(&mut self, spec: TaskSpec) -> bool {
        if self.simulation_finished {
            debug!(task = %spec.id, "Simulation finished, ignoring task");
            return false;
        }
        if !self.received.insert(spec.id.clone()) {
            warn!(task = %spec.id, "Duplicate task delivery ignored");
            return false;
        }

        debug!(
            task = %spec.id,
            arrival = spec.arrival_time,
            burst = spec.burst_time,
            priority = spec.priority,
            tick = ?self.last_tick,
            "Task added to ready queue"
        );
        let task = ScheduledTask::new(spec, self.next_seq);
        self.next_seq += 1;
        self.ready.push_back(task);
        true
    }

    /// Record the Feeder's all-emitted notice, with the number of distinct tasks it sent
    pub fn mark_all_emitted(&mut self, task_count: Option<usize>) {
        if self.simulation_finished {
            return;
        }
        info!(task_count = ?task_count, received = self.received.len(), "All tasks emitted");
        self.all_tasks_emitted = true;
        if task_count.is_some() {
            self.expected_tasks = task_count;
        }
    }

    /// Advance the simulation by one tick
    pub fn apply_tick(&mut self, tick: Tick) -> TickOutcome {
        if self.simulation_finished {
            debug!(tick, "Simulation finished, ignoring tick");
            return TickOutcome::Ignored;
        }
        if let Some(last) = self.last_tick {
            if tick <= last {
                warn!(tick, last_tick = last, "Stale tick discarded");
                return TickOutcome::Stale;
            }
        }
        self.last_tick = Some(tick);

        self.apply_aging(tick);
        self.finalize_current(tick);
        self.preempt_current(tick);
        self.dispatch_next(tick);

        if self.termination_reached() {
            self.simulation_finished = true;
            info!(tick, finished = self.finished.len(), algorithm = self.algorithm.key(), "Simulation complete");
            return TickOutcome::Completed;
        }

        self.execute(tick)
    }

    fn apply_aging(&mut self, tick: Tick) {
        let Some(period) = self.algorithm.aging_period() else {
            return;
        };

        self.aging_counter += 1;
        if self.aging_counter < period {
            return;
        }
        self.aging_counter = 0;

        for task in self.ready.iter_mut() {
            task.age();
        }
        if let Some(task) = self.current.as_mut() {
            task.age();
        }
        debug!(tick, "Aging applied");
    }

    fn finalize_current(&mut self, tick: Tick) {
        if !self.current.as_ref().is_some_and(ScheduledTask::is_finished) {
            return;
        }
        if let Some(mut task) = self.current.take() {
            task.finish_time = Some(tick);
            info!(task = %task.id(), tick, "Task finished");
            self.finished.push(task);
            self.quantum_used = 0;
        }
    }

    fn preempt_current(&mut self, tick: Tick) {
        let Some(current) = self.current.as_ref() else {
            return;
        };
        if !self.algorithm.should_preempt(current, &self.ready, self.quantum_used, tick) {
            return;
        }
        if let Some(task) = self.current.take() {
            debug!(task = %task.id(), tick, remaining = task.remaining_time, "Task preempted");
            self.ready.push_back(task);
            self.quantum_used = 0;
        }
    }

    fn dispatch_next(&mut self, tick: Tick) {
        if self.current.is_some() {
            return;
        }
        let Some(index) = self.algorithm.select(&self.ready, tick) else {
            return;
        };
        if let Some(mut task) = self.ready.remove(index) {
            if task.dispatch(tick) {
                debug!(task = %task.id(), tick, response = ?task.response_time, "Task dispatched for the first time");
            }
            self.quantum_used = 0;
            self.current = Some(task);
        }
    }

    fn termination_reached(&self) -> bool {
        if !self.all_tasks_emitted || self.current.is_some() || !self.ready.is_empty() || self.finished.is_empty() {
            return false;
        }
        match self.expected_tasks {
            Some(expected) if self.received.len() < expected => {
                debug!(expected, received = self.received.len(), "Waiting for outstanding task deliveries");
                false
            }
            _ => true,
        }
    }

    fn execute(&mut self, tick: Tick) -> TickOutcome {
        match self.current.as_mut() {
            Some(task) => {
                task.run_once();
                self.quantum_used += 1;
                debug!(tick, task = %task.id(), remaining = task.remaining_time, "Executing");
                self.timeline.push(Some(task.id().clone()));
                TickOutcome::Ran(task.id().clone())
            }
            None => {
                debug!(tick, "CPU idle");
                self.timeline.push(None);
                TickOutcome::Idle
            }
        }
    }

    /// Final report, available once the simulation has finished
    pub fn report(&self) -> Option<SimulationReport> {
        if !self.simulation_finished {
            return None;
        }
        let total_ticks = self.last_tick.unwrap_or_default();
        Some(SimulationReport::build(self.algorithm, &self.finished, &self.timeline, total_ticks))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn is_finished(&self) -> bool {
        self.simulation_finished
    }

    pub fn all_tasks_emitted(&self) -> bool {
        self.all_tasks_emitted
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }

    pub fn current_task(&self) -> Option<&ScheduledTask> {
        self.current.as_ref()
    }

    pub fn ready_tasks(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.ready.iter()
    }

    pub fn finished_tasks(&self) -> &[ScheduledTask] {
        &self.finished
    }

    /// Execution timeline so far; `None` marks an idle tick
    pub fn timeline(&self) -> &[Option<TaskId>] {
        &self.timeline
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }
}
