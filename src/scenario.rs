//! The alert mechanism scenario
//!
//! 1. Check no tracked alert is active.
//! 2. Hold the Fuse operator and UI at zero replicas.
//! 3. Wait for the alerts to go pending, then firing.
//! 4. Confirm Alertmanager lists them.
//! 5. Restore replicas and wait for the alerts to clear.
//! 6. Audit Alertmanager's routing configuration against its secrets.
//!
//! Replicas are restored on every exit path out of steps 3 and 4.

use std::fmt;
use std::sync::Arc;

use kube::Client;
use tracing::{info, instrument};

use crate::alerts::{AlertSnapshot, AlertState};
use crate::audit::audit_alertmanager;
use crate::config::ScenarioConfig;
use crate::crosscheck::check_alertmanager_with;
use crate::exec::{KubePodExecutor, PodExecutor};
use crate::inject::{ReplicaOverride, ReplicaSnapshot};
use crate::poller::{wait_for_state, AlertPoller};
use crate::scale::{KubeReplicaScaler, ReplicaScaler, WorkloadRef};
use crate::secrets::{KubeSecretSource, SecretSource};
use crate::{Error, Result};

/// Outcome of a successful scenario run
#[derive(Clone, Debug)]
pub struct ScenarioReport {
    /// Replica counts captured before injection, and restored afterwards
    pub original_replicas: Vec<ReplicaSnapshot>,
    /// Tracking table when every alert was firing
    pub firing: AlertSnapshot,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alerts fired and cleared; restored replicas:")?;
        for snapshot in &self.original_replicas {
            writeln!(f, "  {} = {}", snapshot.workload, snapshot.replicas)?;
        }
        write!(f, "{}", self.firing)
    }
}

/// Drives the scenario against a set of cluster backends
pub struct AlertScenario {
    executor: Arc<dyn PodExecutor>,
    scaler: Arc<dyn ReplicaScaler>,
    secrets: Arc<dyn SecretSource>,
    poller: AlertPoller,
    config: ScenarioConfig,
}

impl AlertScenario {
    /// Create a scenario over explicit backends
    pub fn new(
        executor: Arc<dyn PodExecutor>,
        scaler: Arc<dyn ReplicaScaler>,
        secrets: Arc<dyn SecretSource>,
        config: ScenarioConfig,
    ) -> Self {
        let poller = AlertPoller::from_config(executor.clone(), &config);
        Self {
            executor,
            scaler,
            secrets,
            poller,
            config,
        }
    }

    /// Create a scenario whose backends all talk to the cluster behind `client`
    pub fn from_client(client: Client, config: ScenarioConfig) -> Self {
        Self::new(
            Arc::new(KubePodExecutor::new(client.clone())),
            Arc::new(KubeReplicaScaler::new(client.clone())),
            Arc::new(KubeSecretSource::new(client)),
            config,
        )
    }

    /// The configuration in use
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Workloads held at zero during injection
    pub fn workloads(&self) -> Vec<WorkloadRef> {
        vec![
            WorkloadRef::deployment(
                &self.config.operator_deployment,
                &self.config.fuse_operator_namespace,
            ),
            WorkloadRef::deployment_config(
                &self.config.ui_deployment_config,
                &self.config.fuse_product_namespace,
            ),
        ]
    }

    /// Fail if any tracked alert is already pending or firing
    #[instrument(skip(self))]
    pub async fn precheck(&self) -> Result<AlertSnapshot> {
        let snapshot = self.poller.poll().await?;
        let active = snapshot.active();
        if !active.is_empty() {
            for alert in &active {
                info!(alert = %alert, state = ?snapshot.state(alert), "Alert should not be active");
            }
            return Err(Error::AlertsActive(active));
        }
        info!("No tracked alert active");
        Ok(snapshot)
    }

    /// Wait for every tracked alert to reach `expected`
    pub async fn wait_for(&self, expected: AlertState) -> Result<AlertSnapshot> {
        wait_for_state(
            &self.poller,
            expected,
            self.config.poll_interval(),
            self.config.state_timeout(),
        )
        .await
    }

    /// Confirm Alertmanager lists every tracked alert
    pub async fn crosscheck(&self) -> Result<()> {
        check_alertmanager_with(self.executor.as_ref(), &self.config).await
    }

    /// Audit Alertmanager's routing configuration against its secrets
    pub async fn audit(&self) -> Result<()> {
        audit_alertmanager(self.secrets.as_ref(), &self.config).await
    }

    /// Run the whole scenario
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ScenarioReport> {
        self.precheck().await?;

        let (original_replicas, firing) = ReplicaOverride::scoped(
            self.scaler.clone(),
            self.workloads(),
            self.config.injector_pause(),
            |snapshots| async move {
                self.wait_for(AlertState::Pending).await?;
                let firing = self.wait_for(AlertState::Firing).await?;
                self.crosscheck().await?;
                Ok((snapshots, firing))
            },
        )
        .await?;

        self.wait_for(AlertState::None).await?;
        self.audit().await?;

        let report = ScenarioReport {
            original_replicas,
            firing,
        };
        info!("Alert mechanism verified");
        Ok(report)
    }
}
