//! Scheduling policies
//!
//! The seven policies form a closed set. Each answers two questions for a tick: should the
//! running task be preempted, and which ready task runs next. Ties on the policy's own
//! criterion fall back to earliest arrival, then to insertion order.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use sim_protocol::Tick;

use crate::error::SchedulerError;
use crate::task::ScheduledTask;
use crate::{DEFAULT_AGING_PERIOD, DEFAULT_QUANTUM};

/// Scheduling policy, fixed for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// First-Come, First-Served
    #[default]
    Fcfs,
    /// FIFO with forced preemption after `quantum` consecutive ticks
    RoundRobin { quantum: u64 },
    /// Shortest burst first, non-preemptive
    Sjf,
    /// Shortest remaining time first, preemptive
    Srtf,
    /// Lowest priority value first, non-preemptive
    PriorityCooperative,
    /// Lowest priority value first, preemptive
    PriorityPreemptive,
    /// Preemptive priority with aging every `aging_period` ticks
    PriorityDynamic { aging_period: u64 },
}

impl Algorithm {
    /// All algorithm keys, in display order
    pub const KEYS: [&'static str; 7] = ["fcfs", "rr", "sjf", "srtf", "prioc", "priop", "priod"];

    /// Resolve a key with explicit Round-Robin quantum and aging period
    pub fn from_key(key: &str, quantum: u64, aging_period: u64) -> Result<Self, SchedulerError> {
        let algorithm = match key.trim().to_ascii_lowercase().as_str() {
            "fcfs" => Algorithm::Fcfs,
            "rr" => Algorithm::RoundRobin { quantum },
            "sjf" => Algorithm::Sjf,
            "srtf" => Algorithm::Srtf,
            "prioc" => Algorithm::PriorityCooperative,
            "priop" => Algorithm::PriorityPreemptive,
            "priod" => Algorithm::PriorityDynamic { aging_period },
            _ => return Err(SchedulerError::UnknownAlgorithm(key.to_string())),
        };
        algorithm.validate()?;
        Ok(algorithm)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        match self {
            Algorithm::RoundRobin { quantum: 0 } => {
                Err(SchedulerError::Config("Round-Robin quantum must be at least 1".to_string()))
            }
            Algorithm::PriorityDynamic { aging_period: 0 } => {
                Err(SchedulerError::Config("aging period must be at least 1 tick".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "fcfs",
            Algorithm::RoundRobin { .. } => "rr",
            Algorithm::Sjf => "sjf",
            Algorithm::Srtf => "srtf",
            Algorithm::PriorityCooperative => "prioc",
            Algorithm::PriorityPreemptive => "priop",
            Algorithm::PriorityDynamic { .. } => "priod",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "First-Come, First-Served",
            Algorithm::RoundRobin { .. } => "Round-Robin",
            Algorithm::Sjf => "Shortest Job First",
            Algorithm::Srtf => "Shortest Remaining Time First",
            Algorithm::PriorityCooperative => "Fixed Priority (cooperative)",
            Algorithm::PriorityPreemptive => "Fixed Priority (preemptive)",
            Algorithm::PriorityDynamic { .. } => "Dynamic Priority (aging)",
        }
    }

    pub fn is_preemptive(&self) -> bool {
        matches!(
            self,
            Algorithm::RoundRobin { .. }
                | Algorithm::Srtf
                | Algorithm::PriorityPreemptive
                | Algorithm::PriorityDynamic { .. }
        )
    }

    /// Aging period, for the dynamic-priority policy only
    pub fn aging_period(&self) -> Option<u64> {
        match self {
            Algorithm::PriorityDynamic { aging_period } => Some(*aging_period),
            _ => None,
        }
    }

    /// Whether `current` must go back to the ready queue before selection at `tick`
    pub(crate) fn should_preempt(
        &self,
        current: &ScheduledTask,
        ready: &VecDeque<ScheduledTask>,
        quantum_used: u64,
        tick: Tick,
    ) -> bool {
        match self {
            Algorithm::RoundRobin { quantum } => quantum_used >= *quantum,
            Algorithm::Srtf => eligible(ready, tick)
                .map(|task| task.remaining_time)
                .min()
                .is_some_and(|shortest| shortest < current.remaining_time),
            Algorithm::PriorityPreemptive | Algorithm::PriorityDynamic { .. } => eligible(ready, tick)
                .map(|task| task.priority)
                .min()
                .is_some_and(|best| best < current.priority),
            Algorithm::Fcfs | Algorithm::Sjf | Algorithm::PriorityCooperative => false,
        }
    }

    /// Index into `ready` of the task to dispatch at `tick`
    pub(crate) fn select(&self, ready: &VecDeque<ScheduledTask>, tick: Tick) -> Option<usize> {
        let candidates = ready.iter().enumerate().filter(|(_, task)| task.arrival_time() <= tick);

        match self {
            Algorithm::RoundRobin { .. } => candidates.map(|(index, _)| index).next(),
            Algorithm::Fcfs => candidates
                .min_by_key(|(_, task)| (task.arrival_time(), task.seq))
                .map(|(index, _)| index),
            Algorithm::Sjf => candidates
                .min_by_key(|(_, task)| (task.spec.burst_time, task.arrival_time(), task.seq))
                .map(|(index, _)| index),
            Algorithm::Srtf => candidates
                .min_by_key(|(_, task)| (task.remaining_time, task.arrival_time(), task.seq))
                .map(|(index, _)| index),
            Algorithm::PriorityCooperative
            | Algorithm::PriorityPreemptive
            | Algorithm::PriorityDynamic { .. } => candidates
                .min_by_key(|(_, task)| (task.priority, task.arrival_time(), task.seq))
                .map(|(index, _)| index),
        }
    }
}

/// Ready tasks whose arrival time has been reached
fn eligible(ready: &VecDeque<ScheduledTask>, tick: Tick) -> impl Iterator<Item = &ScheduledTask> {
    ready.iter().filter(move |task| task.arrival_time() <= tick)
}

impl FromStr for Algorithm {
    type Err = SchedulerError;

    /// Parse a key using the default quantum and aging period
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::from_key(s, DEFAULT_QUANTUM, DEFAULT_AGING_PERIOD)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::RoundRobin { quantum } => write!(f, "{} (quantum {quantum})", self.display_name()),
            Algorithm::PriorityDynamic { aging_period } => {
                write!(f, "{} (every {aging_period} ticks)", self.display_name())
            }
            _ => f.write_str(self.display_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_protocol::TaskSpec;

    fn queue(specs: &[(&str, Tick, u64, u32)]) -> VecDeque<ScheduledTask> {
        specs
            .iter()
            .enumerate()
            .map(|(seq, (id, arrival, burst, priority))| {
                ScheduledTask::new(TaskSpec::new(*id, *arrival, *burst, *priority), seq as u64)
            })
            .collect()
    }

    #[test]
    fn test_keys_roundtrip() {
        for key in Algorithm::KEYS {
            let algorithm: Algorithm = key.parse().unwrap();
            assert_eq!(algorithm.key(), key);
        }
        assert_eq!("RR".parse::<Algorithm>().unwrap(), Algorithm::RoundRobin { quantum: 3 });
        assert_eq!("priod".parse::<Algorithm>().unwrap(), Algorithm::PriorityDynamic { aging_period: 5 });
        assert!(matches!("lottery".parse::<Algorithm>(), Err(SchedulerError::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_zero_parameters_rejected() {
        assert!(Algorithm::from_key("rr", 0, 5).is_err());
        assert!(Algorithm::from_key("priod", 3, 0).is_err());
        assert!(Algorithm::from_key("fcfs", 0, 0).is_ok());
    }

    #[test]
    fn test_selection_rules() {
        let ready = queue(&[("A", 1, 5, 3), ("B", 0, 2, 2), ("C", 0, 4, 1)]);

        assert_eq!(Algorithm::Fcfs.select(&ready, 5), Some(1));
        assert_eq!(Algorithm::RoundRobin { quantum: 2 }.select(&ready, 5), Some(0));
        assert_eq!(Algorithm::Sjf.select(&ready, 5), Some(1));
        assert_eq!(Algorithm::PriorityCooperative.select(&ready, 5), Some(2));
    }

    #[test]
    fn test_ties_prefer_earliest_arrival_then_insertion() {
        let ready = queue(&[("late", 2, 3, 1), ("early", 1, 3, 1), ("twin", 1, 3, 1)]);

        assert_eq!(Algorithm::Sjf.select(&ready, 5), Some(1));
        assert_eq!(Algorithm::Srtf.select(&ready, 5), Some(1));
        assert_eq!(Algorithm::PriorityPreemptive.select(&ready, 5), Some(1));
    }

    #[test]
    fn test_future_arrivals_are_not_selected() {
        let ready = queue(&[("future", 4, 1, 1)]);

        assert_eq!(Algorithm::Fcfs.select(&ready, 3), None);
        assert_eq!(Algorithm::Fcfs.select(&ready, 4), Some(0));
    }

    #[test]
    fn test_preemption_is_strict() {
        let running = queue(&[("run", 0, 3, 2)]).pop_front().unwrap();
        let equal = queue(&[("eq", 0, 3, 2)]);
        let better = queue(&[("better", 0, 1, 1)]);

        assert!(!Algorithm::Srtf.should_preempt(&running, &equal, 0, 1));
        assert!(Algorithm::Srtf.should_preempt(&running, &better, 0, 1));
        assert!(!Algorithm::PriorityPreemptive.should_preempt(&running, &equal, 0, 1));
        assert!(Algorithm::PriorityPreemptive.should_preempt(&running, &better, 0, 1));
        assert!(!Algorithm::PriorityCooperative.should_preempt(&running, &better, 0, 1));
        assert!(!Algorithm::Sjf.should_preempt(&running, &better, 0, 1));
    }

    #[test]
    fn test_round_robin_quantum_expiry() {
        let running = queue(&[("run", 0, 9, 1)]).pop_front().unwrap();
        let rr = Algorithm::RoundRobin { quantum: 3 };

        assert!(!rr.should_preempt(&running, &VecDeque::new(), 2, 0));
        assert!(rr.should_preempt(&running, &VecDeque::new(), 3, 0));
    }
}
