//! Alert state polling and the wait-for-state loop

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::alerts::{AlertSnapshot, AlertState};
use crate::config::{PodCommand, ScenarioConfig};
use crate::exec::{run_pod_command, PodExecutor};
use crate::{Error, Result};

/// Fetches the tracking table from Prometheus
#[derive(Clone)]
pub struct AlertPoller {
    executor: Arc<dyn PodExecutor>,
    namespace: String,
    command: PodCommand,
    tracked: Vec<String>,
}

impl AlertPoller {
    /// Create a poller that runs `command` in `namespace`
    pub fn new(
        executor: Arc<dyn PodExecutor>,
        namespace: impl Into<String>,
        command: PodCommand,
        tracked: Vec<String>,
    ) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
            command,
            tracked,
        }
    }

    /// Create a poller for the Prometheus query in `config`
    pub fn from_config(executor: Arc<dyn PodExecutor>, config: &ScenarioConfig) -> Self {
        Self::new(
            executor,
            config.monitoring_namespace.clone(),
            config.prometheus.clone(),
            config.tracked_alerts.clone(),
        )
    }

    /// Names of the tracked alerts
    pub fn tracked(&self) -> &[String] {
        &self.tracked
    }

    /// Query Prometheus once and build a fresh tracking table
    pub async fn poll(&self) -> Result<AlertSnapshot> {
        let output = run_pod_command(self.executor.as_ref(), &self.namespace, &self.command)
            .await
            .map_err(|e| e.exec_context("failed to exec to prometheus pod"))?;
        AlertSnapshot::from_response(&output, &self.tracked)
    }
}

/// Poll until every tracked alert is in `expected`
///
/// Polls immediately, then every `interval` until `timeout` has elapsed.
/// Poll failures and partial matches are logged and retried. On timeout the
/// error lists the alerts still outside `expected` at the last successful poll.
#[instrument(skip(poller, expected), fields(expected = %expected))]
pub async fn wait_for_state(
    poller: &AlertPoller,
    expected: AlertState,
    interval: Duration,
    timeout: Duration,
) -> Result<AlertSnapshot> {
    let start = Instant::now();
    let mut last: Option<AlertSnapshot> = None;

    loop {
        match poller.poll().await {
            Ok(snapshot) if snapshot.all_in(expected) => {
                info!(
                    elapsed_secs = start.elapsed().as_secs(),
                    "All tracked alerts in expected state"
                );
                return Ok(snapshot);
            }
            Ok(snapshot) => {
                for (alert, state) in snapshot.outside(expected) {
                    info!(
                        alert = %alert,
                        state = %state,
                        "Alert is not in expected state yet"
                    );
                }
                last = Some(snapshot);
            }
            Err(e) => {
                warn!(error = %e, "Failed to get alert state");
            }
        }

        if start.elapsed() + interval > timeout {
            break;
        }
        debug!(interval_secs = interval.as_secs(), "Waiting before retrying");
        tokio::time::sleep(interval).await;
    }

    let pending = last
        .map(|snapshot| {
            snapshot
                .outside(expected)
                .into_iter()
                .map(|(name, state)| (name, state.to_string()))
                .collect()
        })
        .unwrap_or_default();

    Err(Error::Timeout {
        expected: expected.to_string(),
        pending,
    })
}
