// End-to-end runs of all three components over loopback TCP

use std::time::Duration;

use scheduler_engine::ReportFormat;
use scheduler_sim_service::{run_simulation, ServiceConfig};
use sim_protocol::{TaskSpec, TickOrdering};

fn test_config(report_dir: &std::path::Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.network.clock_port = 0;
    config.network.feeder_port = 0;
    config.network.scheduler_port = 0;
    config.clock.tick_period_ms = 20;
    config.clock.feeder_delay_ms = 2;
    config.scheduler.report.directory = report_dir.to_path_buf();
    config.service.shutdown_timeout_secs = 2;
    config
}

fn never() -> impl std::future::Future<Output = ()> {
    std::future::pending()
}

#[tokio::test]
async fn test_fcfs_run_produces_expected_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    assert!(config.validate().is_ok());

    let tasks = vec![TaskSpec::new("A", 0, 3, 1), TaskSpec::new("B", 1, 2, 1)];
    let outcome = tokio::time::timeout(Duration::from_secs(20), run_simulation(config, tasks, never()))
        .await
        .unwrap()
        .unwrap();

    let report = outcome.report.unwrap();
    assert_eq!(report.timeline, vec!["A", "A", "A", "B", "B"]);
    assert_eq!(report.total_ticks, 5);

    let b = report.task("B").unwrap();
    assert_eq!((b.start_time, b.finish_time, b.wait_time, b.turnaround_time, b.response_time), (3, 5, 2, 4, 2));

    let path = outcome.report_path.unwrap();
    assert!(path.ends_with("result_fcfs.txt"));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("A | A | A | B | B"));

    let feeder = outcome.feeder.unwrap();
    assert_eq!(feeder.tasks_sent, 2);
    assert!(feeder.all_emitted_sent);

    let clock = outcome.clock.unwrap();
    assert!(clock.ticks_sent >= 6);
}

#[tokio::test]
async fn test_srtf_run_with_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scheduler.algorithm = "srtf".to_string();
    config.scheduler.report.format = ReportFormat::Json;
    config.ordering = TickOrdering::Barrier;

    let tasks = vec![TaskSpec::new("A", 0, 4, 1), TaskSpec::new("B", 1, 2, 1)];
    let outcome = tokio::time::timeout(Duration::from_secs(20), run_simulation(config, tasks, never()))
        .await
        .unwrap()
        .unwrap();

    let report = outcome.report.unwrap();
    assert_eq!(report.timeline, vec!["A", "B", "B", "A", "A", "A"]);

    let path = outcome.report_path.unwrap();
    assert!(path.ends_with("result_srtf.json"));
    let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(parsed["algorithm"], "srtf");
    assert_eq!(parsed["total_ticks"], 6);
}

#[tokio::test]
async fn test_interrupt_before_completion_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let tasks = vec![TaskSpec::new("far", 10_000, 1, 1)];
    let interrupt = tokio::time::sleep(Duration::from_millis(150));
    let outcome = tokio::time::timeout(Duration::from_secs(20), run_simulation(config, tasks, interrupt))
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.report.is_none());
    assert!(outcome.report_path.is_none());
    assert!(outcome.clock.unwrap().ticks_sent > 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_port_conflict_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let mut config = test_config(dir.path());
    config.network.scheduler_port = occupied.local_addr().unwrap().port();

    let tasks = vec![TaskSpec::new("A", 0, 1, 1)];
    let result = run_simulation(config, tasks, never()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_task_due_before_first_tick_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.clock.initial_tick = 2;
    assert!(config.validate().is_ok());

    let tasks = vec![TaskSpec::new("A", 0, 1, 1), TaskSpec::new("B", 3, 1, 1)];
    let result = tokio::time::timeout(Duration::from_secs(3), run_simulation(config, tasks, never()))
        .await
        .unwrap();

    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
