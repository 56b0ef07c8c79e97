//! End-to-end lifecycle tests against real child processes
//!
//! Nodes are small `sh` scripts in a temporary project root; health endpoints
//! are served by wiremock or left closed.

#![cfg(unix)]

use std::collections::HashMap;
use std::time::{Duration, Instant};

use shared::{NodeDescriptor, NodeId, NodeStatus};
use supervisor::services::{HttpHealthProber, RealProcessManager};
use supervisor::{LaunchReason, NodeRegistry, ProcessManager, StopOutcome, Supervisor};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{closed_port, TestFixtures, TestWorkspace};

async fn healthy_endpoint() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// A on a healthy port, B on a closed port depending on A
fn core_registry(a_port: u16, b_port: u16) -> NodeRegistry {
    let mut groups = HashMap::new();
    groups.insert(
        "core".to_string(),
        vec![
            NodeDescriptor::new("A", "Alpha", a_port, "core").critical(),
            NodeDescriptor::new("B", "Beta", b_port, "core")
                .critical()
                .with_dependency("A"),
        ],
    );
    NodeRegistry::from_groups(groups).unwrap()
}

#[tokio::test]
async fn test_start_group_end_to_end() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_A_Alpha", TestFixtures::WELL_BEHAVED);
    workspace.add_node("Node_B", TestFixtures::WELL_BEHAVED);
    let server = healthy_endpoint().await;
    let config = workspace.config();

    let supervisor = Supervisor::new(
        core_registry(server.address().port(), closed_port()),
        RealProcessManager::new(&config),
        HttpHealthProber::new("127.0.0.1").unwrap(),
        &config,
    );

    // Act
    let started = Instant::now();
    let report = supervisor.start_group("core", true).await.unwrap();

    // Assert
    let launched: Vec<(&str, LaunchReason)> = report
        .launches
        .iter()
        .map(|launch| (launch.node_id.as_str(), launch.reason))
        .collect();
    assert_eq!(launched, vec![("A", LaunchReason::Primary), ("B", LaunchReason::Primary)]);
    assert!(report.launches.iter().all(|launch| launch.status == NodeStatus::Starting));

    assert_eq!(report.healthy_count, 1);
    assert_eq!(report.total_count, 2);
    assert_eq!(report.readiness[&NodeId::from("A")], NodeStatus::Healthy);
    assert_eq!(report.readiness[&NodeId::from("B")], NodeStatus::Timeout);
    assert!(started.elapsed() >= TestFixtures::fast_timings().max_wait);

    let log_file = config.logs_dir.join("node_A_Alpha.log");
    assert!(
        workspace
            .wait_for_log(&log_file, "node A (Alpha)", Duration::from_secs(2))
            .await
    );
    assert!(std::fs::metadata(&log_file).unwrap().len() > 0);

    let stopped = supervisor.stop_all().await.unwrap();
    assert_eq!(stopped.len(), 2);
}

#[tokio::test]
async fn test_status_reflects_tracked_processes() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_A_Alpha", TestFixtures::WELL_BEHAVED);
    workspace.add_node("node_B_beta", TestFixtures::WELL_BEHAVED);
    let server = healthy_endpoint().await;
    let config = workspace.config();

    let supervisor = Supervisor::new(
        core_registry(server.address().port(), closed_port()),
        RealProcessManager::new(&config),
        HttpHealthProber::new("127.0.0.1").unwrap(),
        &config,
    );

    let before = supervisor.check_all().await;
    assert_eq!(before.counts.not_running, 2);

    // Act
    supervisor.start_group("core", false).await.unwrap();
    let snapshot = supervisor.check_all().await;
    let report = supervisor.generate_report().await;

    // Assert
    assert_eq!(snapshot.counts.healthy, 1);
    assert_eq!(snapshot.counts.unhealthy, 1);
    assert_eq!(snapshot.counts.not_running, 0);
    assert_eq!(report.summary.running, 2);
    assert_eq!(report.summary.healthy, 1);
    assert_eq!(report.summary.unhealthy, 1);

    let outcomes = supervisor.stop_all().await.unwrap();
    assert!(outcomes
        .iter()
        .all(|(_, outcome)| *outcome == StopOutcome::Graceful));
    assert_eq!(supervisor.check_all().await.counts.not_running, 2);
}

#[tokio::test]
async fn test_graceful_stop() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_G", TestFixtures::WELL_BEHAVED);
    let processes = RealProcessManager::new(&workspace.config());
    let descriptor = NodeDescriptor::new("G", "Graceful", closed_port(), "core");

    let info = processes.start(&descriptor).await.unwrap();
    assert!(workspace
        .wait_for_log(&info.log_file, "node G", Duration::from_secs(2))
        .await);

    // Act
    let outcome = processes.stop(&descriptor.id).await.unwrap();

    // Assert
    assert_eq!(outcome, StopOutcome::Graceful);
    assert!(!processes.is_tracked(&descriptor.id).await);
    assert_eq!(processes.status_of(&descriptor.id).await, NodeStatus::Stopped);

    // A second stop has nothing left to do
    assert_eq!(
        processes.stop(&descriptor.id).await.unwrap(),
        StopOutcome::NotTracked
    );
}

#[tokio::test]
async fn test_forced_stop_after_grace_period() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_S_Stubborn", TestFixtures::IGNORES_TERM);
    let processes = RealProcessManager::new(&workspace.config());
    let descriptor = NodeDescriptor::new("S", "Stubborn", closed_port(), "core");

    let info = processes.start(&descriptor).await.unwrap();
    // The trap must be installed before the signal is sent
    assert!(workspace
        .wait_for_log(&info.log_file, "started", Duration::from_secs(2))
        .await);

    // Act
    let started = Instant::now();
    let outcome = processes.stop(&descriptor.id).await.unwrap();

    // Assert
    assert_eq!(outcome, StopOutcome::Forced);
    assert!(started.elapsed() >= TestFixtures::GRACE_PERIOD);
    assert!(!processes.is_tracked(&descriptor.id).await);
    assert_eq!(processes.status_of(&descriptor.id).await, NodeStatus::Stopped);
}

#[tokio::test]
async fn test_exited_process_is_reaped() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_E_Ephemeral", "echo bye\n");
    let processes = RealProcessManager::new(&workspace.config());
    let descriptor = NodeDescriptor::new("E", "Ephemeral", closed_port(), "core");

    processes.start(&descriptor).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Act
    let reaped = processes.reap_exited().await;

    // Assert
    assert_eq!(reaped, vec![descriptor.id.clone()]);
    assert!(!processes.is_tracked(&descriptor.id).await);
    assert_eq!(processes.status_of(&descriptor.id).await, NodeStatus::Stopped);
}

#[tokio::test]
async fn test_stop_all_isolates_stuck_node() {
    // Arrange
    let workspace = TestWorkspace::new();
    workspace.add_node("Node_S_Stubborn", TestFixtures::IGNORES_TERM);
    workspace.add_node("Node_G", TestFixtures::WELL_BEHAVED);
    let processes = RealProcessManager::new(&workspace.config());
    let stubborn = NodeDescriptor::new("S", "Stubborn", closed_port(), "core");
    let graceful = NodeDescriptor::new("G", "Graceful", closed_port(), "core");

    let stubborn_info = processes.start(&stubborn).await.unwrap();
    let graceful_info = processes.start(&graceful).await.unwrap();
    assert!(workspace
        .wait_for_log(&stubborn_info.log_file, "started", Duration::from_secs(2))
        .await);
    assert!(workspace
        .wait_for_log(&graceful_info.log_file, "node G", Duration::from_secs(2))
        .await);

    // Act
    let started = Instant::now();
    let outcomes: HashMap<NodeId, StopOutcome> = processes.stop_all().await.unwrap().into_iter().collect();
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(outcomes[&stubborn.id], StopOutcome::Forced);
    assert_eq!(outcomes[&graceful.id], StopOutcome::Graceful);
    // One grace period covers both nodes; they are not waited on one after another
    assert!(elapsed >= TestFixtures::GRACE_PERIOD);
    assert!(elapsed < TestFixtures::GRACE_PERIOD * 2);

    for descriptor in [&stubborn, &graceful] {
        assert!(!processes.is_tracked(&descriptor.id).await);
        assert_eq!(processes.status_of(&descriptor.id).await, NodeStatus::Stopped);
    }
}
