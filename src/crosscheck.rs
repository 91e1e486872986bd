//! Alertmanager cross-check
//!
//! Prometheus reporting an alert as firing does not prove it reached the
//! routing backend. This asks Alertmanager itself, via `amtool` inside its
//! pod, and looks for every tracked alert name in the listing.

use tracing::{info, instrument};

use crate::config::{PodCommand, ScenarioConfig};
use crate::exec::{run_pod_command, PodExecutor};
use crate::{Error, Result};

/// Check that every alert in `tracked` appears in Alertmanager's active list
#[instrument(skip_all, fields(pod = %command.pod))]
pub async fn check_alertmanager<S: AsRef<str>>(
    executor: &dyn PodExecutor,
    namespace: &str,
    command: &PodCommand,
    tracked: &[S],
) -> Result<()> {
    let output = run_pod_command(executor, namespace, command)
        .await
        .map_err(|e| e.exec_context("failed to exec to alertmanager pod"))?;

    for alert in tracked {
        let alert = alert.as_ref();
        if !output.contains(alert) {
            return Err(Error::AlertNotInAlertmanager(alert.to_string()));
        }
        info!(alert = %alert, "Alert present in alertmanager");
    }
    Ok(())
}

/// [`check_alertmanager`] with the names from `config`
pub async fn check_alertmanager_with(
    executor: &dyn PodExecutor,
    config: &ScenarioConfig,
) -> Result<()> {
    check_alertmanager(
        executor,
        &config.monitoring_namespace,
        &config.alertmanager,
        &config.tracked_alerts,
    )
    .await
}
