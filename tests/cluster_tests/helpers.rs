//! Shared setup for live-cluster tests

use std::path::Path;
use std::sync::Once;

use kube::Client;
use rhmi_alerts::client::create_client;
use rhmi_alerts::config::ScenarioConfig;
use rhmi_alerts::scenario::AlertScenario;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the crypto provider and a test-writer subscriber, once per binary
pub fn init_cluster_test() {
    INIT.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,rhmi_alerts=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Client for the cluster in `KUBECONFIG`
pub async fn cluster_client() -> Client {
    init_cluster_test();
    create_client(None)
        .await
        .expect("failed to create client; is KUBECONFIG pointing at an RHMI cluster?")
}

/// Scenario config, from `RHMI_ALERTS_CONFIG` if set
pub fn scenario_config() -> ScenarioConfig {
    match std::env::var("RHMI_ALERTS_CONFIG") {
        Ok(path) => ScenarioConfig::from_file(Path::new(&path)).expect("invalid RHMI_ALERTS_CONFIG"),
        Err(_) => ScenarioConfig::default(),
    }
}

/// Scenario wired to the live cluster
pub async fn live_scenario() -> AlertScenario {
    AlertScenario::from_client(cluster_client().await, scenario_config())
}
