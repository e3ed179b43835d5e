// Task-file loading and validation
//
// One task per line: `id;arrival_time;burst_time;priority`. Fields may also be separated by
// commas or whitespace. Blank lines and `#` comments are skipped.

use std::path::Path;

use sim_protocol::TaskSpec;
use tracing::info;

use crate::error::{FeederError, FeederResult};

/// Load and validate a task file, sorted by arrival time
pub fn load_tasks(path: impl AsRef<Path>) -> FeederResult<Vec<TaskSpec>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|source| FeederError::Io { path: path.to_path_buf(), source })?;

    let tasks = parse_tasks(&content)?;
    info!(path = %path.display(), tasks = tasks.len(), "Loaded task set");
    Ok(tasks)
}

/// Parse and validate task definitions, sorted by arrival time (stable)
pub fn parse_tasks(content: &str) -> FeederResult<Vec<TaskSpec>> {
    let mut tasks = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let fields: Vec<&str> = text
            .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let [id, arrival, burst, priority] = fields.as_slice() else {
            return Err(FeederError::InvalidTask {
                line,
                reason: format!("expected 4 fields (id;arrival;burst;priority), found {}", fields.len()),
            });
        };

        let arrival = parse_field(line, "arrival_time", arrival)?;
        if arrival < 0 {
            return Err(FeederError::InvalidTask { line, reason: "arrival_time must not be negative".to_string() });
        }

        let burst = parse_field(line, "burst_time", burst)?;
        if burst <= 0 {
            return Err(FeederError::InvalidTask { line, reason: "burst_time must be greater than zero".to_string() });
        }

        let priority = parse_field(line, "priority", priority)?;
        if priority < 1 {
            return Err(FeederError::InvalidTask { line, reason: "priority must be at least 1".to_string() });
        }
        if priority > i64::from(u32::MAX) {
            return Err(FeederError::InvalidTask { line, reason: format!("priority must not exceed {}", u32::MAX) });
        }

        let spec = TaskSpec::new(*id, arrival as u64, burst as u64, priority as u32);
        spec.validate().map_err(|e| FeederError::InvalidTask { line, reason: e.to_string() })?;
        tasks.push(spec);
    }

    if tasks.is_empty() {
        return Err(FeederError::EmptyTaskSet);
    }

    tasks.sort_by_key(|task| task.arrival_time);
    Ok(tasks)
}

fn parse_field(line: usize, name: &str, value: &str) -> FeederResult<i64> {
    value
        .parse::<i64>()
        .map_err(|_| FeederError::InvalidTask { line, reason: format!("{name} '{value}' is not an integer") })
}
