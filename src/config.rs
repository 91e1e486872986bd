//! Scenario configuration
//!
//! Every object the scenario touches (namespaces, workloads, pods, secrets,
//! receivers) is named here. Defaults match a standard RHMI installation;
//! a YAML file can override any subset of fields.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Namespace holding the RHMI operator and its notification secrets
pub const DEFAULT_RHMI_OPERATOR_NAMESPACE: &str = "redhat-rhmi-operator";
/// Namespace holding Prometheus and Alertmanager
pub const DEFAULT_MONITORING_NAMESPACE: &str = "redhat-rhmi-middleware-monitoring-operator";
/// Namespace holding the Fuse (Syndesis) operator Deployment
pub const DEFAULT_FUSE_OPERATOR_NAMESPACE: &str = "redhat-rhmi-fuse-operator";
/// Namespace holding the Fuse (Syndesis) UI DeploymentConfig
pub const DEFAULT_FUSE_PRODUCT_NAMESPACE: &str = "redhat-rhmi-fuse";

/// Alerts expected to fire when the Fuse UI is scaled to zero
pub const DEFAULT_TRACKED_ALERTS: &[&str] = &[
    "FuseOnlineSyndesisUIInstanceDown",
    "RHMIFuseOnlineSyndesisUiServiceEndpointDown",
];

/// A command run inside a named container of a named pod
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PodCommand {
    /// Pod name
    pub pod: String,
    /// Container name
    pub container: String,
    /// Command line, split on whitespace before execution
    pub command: String,
}

impl PodCommand {
    /// Command line as argv
    pub fn argv(&self) -> Vec<String> {
        self.command.split_whitespace().map(String::from).collect()
    }
}

/// Reference to a secret and the data key read from it
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Data key
    pub key: String,
}

impl SecretKeyRef {
    fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
        }
    }
}

/// Names of the secrets cross-checked by the configuration audit
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretNames {
    /// Dead man's snitch webhook URL (RHMI operator namespace)
    pub deadmanssnitch: SecretKeyRef,
    /// PagerDuty service key (RHMI operator namespace)
    pub pagerduty: SecretKeyRef,
    /// SMTP credentials secret with `host`, `port`, `username`, `password`
    /// (RHMI operator namespace)
    pub smtp: String,
    /// Alertmanager's own configuration secret (monitoring namespace)
    pub alertmanager: SecretKeyRef,
}

impl Default for SecretNames {
    fn default() -> Self {
        Self {
            deadmanssnitch: SecretKeyRef::new("redhat-rhmi-deadmanssnitch", "url"),
            pagerduty: SecretKeyRef::new("redhat-rhmi-pagerduty", "serviceKey"),
            smtp: "redhat-rhmi-smtp".to_string(),
            alertmanager: SecretKeyRef::new("alertmanager-application-monitoring", "alertmanager.yaml"),
        }
    }
}

/// Complete configuration for one scenario run
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Namespace of the RHMI operator and notification secrets
    pub rhmi_operator_namespace: String,
    /// Namespace of Prometheus and Alertmanager
    pub monitoring_namespace: String,
    /// Namespace of the Fuse operator Deployment
    pub fuse_operator_namespace: String,
    /// Namespace of the Fuse UI DeploymentConfig
    pub fuse_product_namespace: String,
    /// Fuse operator Deployment name
    pub operator_deployment: String,
    /// Fuse UI DeploymentConfig name
    pub ui_deployment_config: String,
    /// Alert query run in the Prometheus pod
    pub prometheus: PodCommand,
    /// Active-alert listing run in the Alertmanager pod
    pub alertmanager: PodCommand,
    /// Secrets read by the configuration audit
    pub secrets: SecretNames,
    /// Receiver carrying the PagerDuty integration
    pub pagerduty_receiver: String,
    /// Receiver carrying the dead man's switch webhook
    pub deadmansswitch_receiver: String,
    /// Alerts tracked through the scenario
    pub tracked_alerts: Vec<String>,
    /// Seconds between alert polls
    pub poll_interval_secs: u64,
    /// Seconds to wait for each state transition
    pub state_timeout_secs: u64,
    /// Milliseconds between injector scale calls (0 = back to back)
    pub injector_pause_millis: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rhmi_operator_namespace: DEFAULT_RHMI_OPERATOR_NAMESPACE.to_string(),
            monitoring_namespace: DEFAULT_MONITORING_NAMESPACE.to_string(),
            fuse_operator_namespace: DEFAULT_FUSE_OPERATOR_NAMESPACE.to_string(),
            fuse_product_namespace: DEFAULT_FUSE_PRODUCT_NAMESPACE.to_string(),
            operator_deployment: "syndesis-operator".to_string(),
            ui_deployment_config: "syndesis-ui".to_string(),
            prometheus: PodCommand {
                pod: "prometheus-application-monitoring-0".to_string(),
                container: "prometheus".to_string(),
                command: "curl localhost:9090/api/v1/alerts".to_string(),
            },
            alertmanager: PodCommand {
                pod: "alertmanager-application-monitoring-0".to_string(),
                container: "alertmanager".to_string(),
                command: "amtool alert --alertmanager.url=http://localhost:9093".to_string(),
            },
            secrets: SecretNames::default(),
            pagerduty_receiver: "critical".to_string(),
            deadmansswitch_receiver: "deadmansswitch".to_string(),
            tracked_alerts: DEFAULT_TRACKED_ALERTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            poll_interval_secs: 60,
            state_timeout_secs: 15 * 60,
            injector_pause_millis: 0,
        }
    }
}

impl ScenarioConfig {
    /// Load a configuration file; fields absent from the file keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a configuration document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the scenario relies on
    pub fn validate(&self) -> Result<()> {
        if self.tracked_alerts.is_empty() {
            return Err(Error::config("tracked_alerts must not be empty"));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::config("poll_interval_secs must be positive"));
        }
        if self.state_timeout_secs < self.poll_interval_secs {
            return Err(Error::config(
                "state_timeout_secs must be at least poll_interval_secs",
            ));
        }
        if self.prometheus.argv().is_empty() || self.alertmanager.argv().is_empty() {
            return Err(Error::config("pod commands must not be empty"));
        }
        Ok(())
    }

    /// Interval between alert polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Timeout for each state transition
    pub fn state_timeout(&self) -> Duration {
        Duration::from_secs(self.state_timeout_secs)
    }

    /// Pause between injector scale calls
    pub fn injector_pause(&self) -> Duration {
        Duration::from_millis(self.injector_pause_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_installation() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.state_timeout(), Duration::from_secs(900));
        assert_eq!(config.injector_pause(), Duration::ZERO);
        assert_eq!(config.tracked_alerts.len(), 2);
        assert_eq!(
            config.prometheus.argv(),
            vec!["curl", "localhost:9090/api/v1/alerts"]
        );
        assert_eq!(config.secrets.pagerduty.key, "serviceKey");
    }

    /// Story: a partial file overrides only what it names
    ///
    /// A staging cluster uses a different monitoring namespace and a shorter
    /// timeout. Everything else stays at the defaults.
    #[test]
    fn story_partial_file_keeps_defaults() {
        let config = ScenarioConfig::from_yaml(
            r#"
monitoring_namespace: staging-monitoring
state_timeout_secs: 300
secrets:
  smtp: staging-smtp
"#,
        )
        .expect("valid config");

        assert_eq!(config.monitoring_namespace, "staging-monitoring");
        assert_eq!(config.state_timeout(), Duration::from_secs(300));
        assert_eq!(config.secrets.smtp, "staging-smtp");
        assert_eq!(config.secrets.pagerduty.name, "redhat-rhmi-pagerduty");
        assert_eq!(config.operator_deployment, "syndesis-operator");
    }

    #[test]
    fn rejects_empty_tracked_alerts() {
        let err = ScenarioConfig::from_yaml("tracked_alerts: []").unwrap_err();
        assert!(err.to_string().contains("tracked_alerts"));
    }

    #[test]
    fn rejects_timeout_shorter_than_interval() {
        let err = ScenarioConfig::from_yaml("poll_interval_secs: 60\nstate_timeout_secs: 30")
            .unwrap_err();
        assert!(err.to_string().contains("state_timeout_secs"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        assert!(ScenarioConfig::from_yaml("poll_interval_secs: 0").is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = ScenarioConfig::from_yaml("tracked_alerts: {").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, "operator_deployment: fuse-operator\n").expect("write");

        let config = ScenarioConfig::from_file(&path).expect("valid config");
        assert_eq!(config.operator_deployment, "fuse-operator");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ScenarioConfig::from_file(Path::new("/nonexistent/scenario.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
