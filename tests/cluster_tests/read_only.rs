//! Stories that observe the cluster without changing it

use std::sync::Arc;
use std::time::Duration;

use rhmi_alerts::alerts::AlertState;
use rhmi_alerts::exec::KubePodExecutor;
use rhmi_alerts::poller::AlertPoller;
use rhmi_alerts::scale::{KubeReplicaScaler, ReplicaScaler};

use super::helpers::{cluster_client, live_scenario, scenario_config};

/// Story: an SRE checks the cluster is quiet before a game day
///
/// On a healthy cluster neither Fuse UI alert is pending or firing.
#[tokio::test]
#[ignore = "requires RHMI cluster - run with: cargo test --test cluster -- --ignored"]
async fn story_healthy_cluster_has_no_fuse_alerts() {
    let scenario = live_scenario().await;
    let snapshot = scenario.precheck().await.expect("fuse alerts are active");
    assert!(snapshot.all_in(AlertState::None));
}

/// Story: Prometheus answers for every tracked alert
#[tokio::test]
#[ignore = "requires RHMI cluster - run with: cargo test --test cluster -- --ignored"]
async fn story_prometheus_reports_every_tracked_alert() {
    let client = cluster_client().await;
    let config = scenario_config();
    let poller = AlertPoller::from_config(Arc::new(KubePodExecutor::new(client)), &config);

    let snapshot = tokio::time::timeout(Duration::from_secs(60), poller.poll())
        .await
        .expect("poll timed out")
        .expect("poll failed");
    assert_eq!(snapshot.len(), config.tracked_alerts.len());
}

/// Story: Alertmanager's routing was rendered from the current secrets
#[tokio::test]
#[ignore = "requires RHMI cluster - run with: cargo test --test cluster -- --ignored"]
async fn story_alertmanager_config_matches_secrets() {
    let scenario = live_scenario().await;
    scenario
        .audit()
        .await
        .expect("alertmanager configuration out of sync with secrets");
}

/// Story: both Fuse workloads are readable with their real kinds
#[tokio::test]
#[ignore = "requires RHMI cluster - run with: cargo test --test cluster -- --ignored"]
async fn story_fuse_workloads_are_scalable() {
    let scenario = live_scenario().await;
    let scaler = KubeReplicaScaler::new(cluster_client().await);

    for workload in scenario.workloads() {
        let replicas = scaler
            .get_replicas(&workload)
            .await
            .unwrap_or_else(|e| panic!("cannot read {workload}: {e}"));
        assert!(replicas >= 0, "{workload} reports {replicas} replicas");
    }
}
