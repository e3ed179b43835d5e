//! Simulation report: per-task statistics, averages and the execution timeline

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sim_protocol::{TaskId, Tick};
use tracing::info;

use crate::algorithm::Algorithm;
use crate::config::ReportFormat;
use crate::error::{SchedulerError, SchedulerResult};
use crate::task::ScheduledTask;

/// Timeline marker for a tick on which nothing ran
pub const IDLE_MARKER: &str = "idle";

/// Statistics for one finished task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub id: TaskId,
    pub arrival_time: Tick,
    pub burst_time: u64,
    pub original_priority: u32,
    pub final_priority: u32,
    pub start_time: Tick,
    pub finish_time: Tick,
    pub wait_time: u64,
    pub turnaround_time: u64,
    pub response_time: u64,
}

/// Averages over all finished tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub wait_time: f64,
    pub turnaround_time: f64,
    pub response_time: f64,
}

/// Everything the Scheduler Engine emits when a run completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub algorithm: String,
    pub algorithm_name: String,
    pub task_count: usize,

    /// Tick at which termination was detected. Equals the timeline length only when the
    /// Scheduler saw every tick from 0; a Scheduler that joins a running Clock late records
    /// fewer timeline entries.
    pub total_ticks: Tick,

    /// One entry per executed tick: a task id or the idle marker
    pub timeline: Vec<String>,

    /// Rows in completion order
    pub tasks: Vec<TaskStats>,
    pub averages: Averages,
    pub generated_at: DateTime<Utc>,
}

impl SimulationReport {
    pub fn build(
        algorithm: Algorithm,
        finished: &[ScheduledTask],
        timeline: &[Option<TaskId>],
        total_ticks: Tick,
    ) -> Self {
        let tasks: Vec<TaskStats> = finished.iter().map(task_stats).collect();

        let averages = if tasks.is_empty() {
            Averages::default()
        } else {
            let n = tasks.len() as f64;
            Averages {
                wait_time: tasks.iter().map(|t| t.wait_time as f64).sum::<f64>() / n,
                turnaround_time: tasks.iter().map(|t| t.turnaround_time as f64).sum::<f64>() / n,
                response_time: tasks.iter().map(|t| t.response_time as f64).sum::<f64>() / n,
            }
        };

        Self {
            algorithm: algorithm.key().to_string(),
            algorithm_name: algorithm.to_string(),
            task_count: tasks.len(),
            total_ticks,
            timeline: timeline
                .iter()
                .map(|slot| slot.as_ref().map_or_else(|| IDLE_MARKER.to_string(), TaskId::to_string))
                .collect(),
            tasks,
            averages,
            generated_at: Utc::now(),
        }
    }

    /// Look up a task row by id
    pub fn task(&self, id: &str) -> Option<&TaskStats> {
        self.tasks.iter().find(|row| row.id.as_str() == id)
    }

    /// Plain-text rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== SIMULATION RESULTS ===");
        let _ = writeln!(out, "Algorithm: {} ({})", self.algorithm.to_uppercase(), self.algorithm_name);
        let _ = writeln!(out, "Tasks: {}", self.task_count);
        let _ = writeln!(out, "Total simulated time: {}", self.total_ticks);
        let _ = writeln!(out, "Generated at: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(out);

        let _ = writeln!(out, "Execution timeline:");
        let _ = writeln!(out, "{}", self.timeline.join(" | "));
        let _ = writeln!(out);

        let _ = writeln!(out, "Task statistics:");
        let _ = writeln!(out, "ID | Arrival | Burst | Priority | Final priority | Start | Finish | Wait | Turnaround | Response");
        for row in &self.tasks {
            let _ = writeln!(
                out,
                "{} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
                row.id,
                row.arrival_time,
                row.burst_time,
                row.original_priority,
                row.final_priority,
                row.start_time,
                row.finish_time,
                row.wait_time,
                row.turnaround_time,
                row.response_time
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Averages:");
        let _ = writeln!(out, "Average wait time: {:.2}", self.averages.wait_time);
        let _ = writeln!(out, "Average turnaround time: {:.2}", self.averages.turnaround_time);
        let _ = write!(out, "Average response time: {:.2}", self.averages.response_time);

        out
    }

    /// Render in `format`
    pub fn render(&self, format: ReportFormat) -> SchedulerResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// File name for this report, e.g. `result_fcfs.txt`
    pub fn file_name(&self, format: ReportFormat) -> String {
        format!("result_{}.{}", self.algorithm, format.extension())
    }

    /// Write the report into `dir`, creating it if needed, and return the file path
    pub fn write_to(&self, dir: impl AsRef<Path>, format: ReportFormat) -> SchedulerResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|source| SchedulerError::Report { path: dir.to_path_buf(), source })?;

        let path = dir.join(self.file_name(format));
        let content = self.render(format)?;
        std::fs::write(&path, content)
            .map_err(|source| SchedulerError::Report { path: path.clone(), source })?;

        info!(path = %path.display(), tasks = self.task_count, total_ticks = self.total_ticks, "Report written");
        Ok(path)
    }
}

fn task_stats(task: &ScheduledTask) -> TaskStats {
    let start_time = task.start_time.unwrap_or(task.spec.arrival_time);
    let finish_time = task.finish_time.unwrap_or(start_time);

    TaskStats {
        id: task.spec.id.clone(),
        arrival_time: task.spec.arrival_time,
        burst_time: task.spec.burst_time,
        original_priority: task.spec.priority,
        final_priority: task.priority,
        start_time,
        finish_time,
        wait_time: task.wait_time().unwrap_or_default(),
        turnaround_time: task.turnaround_time().unwrap_or_default(),
        response_time: task.response_time.unwrap_or_default(),
    }
}
