//! The full alert mechanism scenario on a live cluster
//!
//! 1. Checks the Fuse UI alerts are quiet
//! 2. Holds the Fuse operator and UI at zero replicas
//! 3. Waits for the alerts to go pending, then firing
//! 4. Confirms Alertmanager lists them
//! 5. Restores replicas and waits for the alerts to clear
//! 6. Audits the Alertmanager configuration
//!
//! # Running
//!
//! ```bash
//! cargo test --features cluster --test cluster alerts_mechanism -- --ignored --nocapture
//! ```

#![cfg(feature = "cluster")]

use std::time::Duration;

use rhmi_alerts::scale::{KubeReplicaScaler, ReplicaScaler};

use super::helpers::{cluster_client, live_scenario};

/// Three state waits of up to 15 minutes each, plus slack
const SCENARIO_TIMEOUT: Duration = Duration::from_secs(50 * 60);

/// Story: breaking the Fuse UI is noticed, routed, and recovered from
#[tokio::test]
#[ignore = "scales Fuse to zero - run with: cargo test --features cluster --test cluster -- --ignored"]
async fn story_fuse_outage_fires_and_clears_alerts() {
    let scenario = live_scenario().await;
    let scaler = KubeReplicaScaler::new(cluster_client().await);

    let mut before = Vec::new();
    for workload in scenario.workloads() {
        let replicas = scaler.get_replicas(&workload).await.expect("read replicas");
        before.push((workload, replicas));
    }

    let report = tokio::time::timeout(SCENARIO_TIMEOUT, scenario.run())
        .await
        .expect("scenario timed out")
        .expect("alert mechanism broken");
    println!("{report}");

    for (workload, replicas) in before {
        let after = scaler.get_replicas(&workload).await.expect("read replicas");
        assert_eq!(after, replicas, "{workload} not restored");
    }
}
