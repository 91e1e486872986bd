//! Error types for the alert verification scenario
//!
//! Errors carry the context needed to tell which step of the scenario failed
//! (which pod, which secret, which alert). Configuration mismatches are the
//! exception: they name the field only and never echo secret material.

use thiserror::Error;

/// Main error type for alert verification
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Remote command execution inside a pod failed
    #[error("exec error in pod {pod}: {message}")]
    Exec {
        /// Pod the command was executed in
        pod: String,
        /// Description of what failed
        message: String,
    },

    /// Malformed JSON or YAML returned by a backend or read from a secret
    #[error("parse error [{context}]: {message}")]
    Parse {
        /// What was being parsed (e.g. "prometheus alerts", "alertmanager.yaml")
        context: String,
        /// Description of what failed
        message: String,
    },

    /// Tracked alerts were already active before fault injection
    #[error("alerts already active before fault injection: {}", .0.join(", "))]
    AlertsActive(Vec<String>),

    /// Alerts did not all reach the expected state before the timeout
    #[error("timed out waiting for alerts to reach state {expected}: {}", format_pending(.pending))]
    Timeout {
        /// The state every tracked alert was expected to reach
        expected: String,
        /// Alerts outside the expected state at the last observation, with their state
        pending: Vec<(String, String)>,
    },

    /// A tracked alert was not listed by Alertmanager
    #[error("{0} alert not firing in alertmanager")]
    AlertNotInAlertmanager(String),

    /// A secret exists but lacks a required key
    #[error("secret {namespace}/{name} missing key {key}")]
    SecretKeyMissing {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
        /// The missing data key
        key: String,
    },

    /// A routing field does not match its secret
    ///
    /// Only the field name is reported; values are redacted.
    #[error("{0} not set correctly")]
    ConfigMismatch(&'static str),

    /// A receiver in the routing configuration has an unexpected shape
    #[error("receiver {name}: {message}")]
    Receiver {
        /// Receiver name
        name: String,
        /// Description of the unexpected shape
        message: String,
    },

    /// Invalid scenario configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Where the error occurred (e.g. "injector", "restore")
        context: String,
        /// Description of what failed
        message: String,
    },
}

fn format_pending(pending: &[(String, String)]) -> String {
    if pending.is_empty() {
        return "no successful poll".to_string();
    }
    pending
        .iter()
        .map(|(name, state)| format!("{name}={state}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create an exec error for the given pod
    pub fn exec(pod: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Exec {
            pod: pod.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create a receiver shape error
    pub fn receiver(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Receiver {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Prefix the message of an exec error; other errors pass through
    pub fn exec_context(self, prefix: &str) -> Self {
        match self {
            Error::Exec { pod, message } => Error::Exec {
                message: format!("{}: {}", prefix, message),
                pod,
            },
            other => other,
        }
    }

    /// Whether retrying the failed call may succeed
    ///
    /// Server-side failures, throttling, write conflicts, connection failures
    /// and pod exec failures are transient. Client-side errors such as bad
    /// auth, TLS setup or undecodable responses are not. Parse failures are
    /// transient only inside a poll loop, which the caller decides.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(resp)) => {
                resp.code >= 500 || resp.code == 429 || resp.code == 409
            }
            Error::Kube(
                kube::Error::HyperError(_) | kube::Error::Service(_) | kube::Error::ReadEvents(_),
            ) => true,
            Error::Exec { .. } => true,
            _ => false,
        }
    }

    /// Whether this is an optimistic-concurrency conflict (HTTP 409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(resp)) if resp.code == 409)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> Error {
        Error::Kube(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    /// Story: a mismatch names the field and nothing else
    ///
    /// The audit compares SMTP passwords and PagerDuty keys. The error that
    /// surfaces in CI logs must not contain either value.
    #[test]
    fn story_config_mismatch_is_redacted() {
        let err = Error::ConfigMismatch("smtp_auth_password");
        assert_eq!(err.to_string(), "smtp_auth_password not set correctly");
    }

    #[test]
    fn timeout_lists_alerts_outside_expected_state() {
        let err = Error::Timeout {
            expected: "firing".to_string(),
            pending: vec![
                ("FuseOnlineSyndesisUIInstanceDown".to_string(), "pending".to_string()),
                ("RHMIFuseOnlineSyndesisUiServiceEndpointDown".to_string(), "none".to_string()),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("state firing"));
        assert!(msg.contains("FuseOnlineSyndesisUIInstanceDown=pending"));
        assert!(msg.contains("RHMIFuseOnlineSyndesisUiServiceEndpointDown=none"));
    }

    #[test]
    fn timeout_without_any_successful_poll() {
        let err = Error::Timeout {
            expected: "pending".to_string(),
            pending: vec![],
        };
        assert!(err.to_string().ends_with("no successful poll"));
    }

    #[test]
    fn alerts_active_names_every_alert() {
        let err = Error::AlertsActive(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(
            err.to_string(),
            "alerts already active before fault injection: A, B"
        );
    }

    #[test]
    fn conflicts_and_server_errors_are_transient() {
        assert!(api_error(409).is_conflict());
        assert!(api_error(409).is_transient());
        assert!(api_error(503).is_transient());
        assert!(api_error(429).is_transient());
        assert!(!api_error(404).is_transient());
        assert!(!api_error(404).is_conflict());
        assert!(Error::exec("prometheus-0", "connection reset").is_transient());
        assert!(!Error::parse("prometheus alerts", "eof").is_transient());
        assert!(!Error::ConfigMismatch("dms url").is_transient());
    }

    #[test]
    fn only_connection_level_client_errors_are_transient() {
        let reset = Error::Kube(kube::Error::ReadEvents(std::io::Error::other("connection reset")));
        assert!(reset.is_transient());

        let timeout = Error::Kube(kube::Error::Service("request timed out".into()));
        assert!(timeout.is_transient());

        let undecodable = Error::Kube(kube::Error::SerdeError(
            serde_json::from_str::<u8>("x").unwrap_err(),
        ));
        assert!(!undecodable.is_transient());

        let bad_line = Error::Kube(kube::Error::LinesCodecMaxLineLengthExceeded);
        assert!(!bad_line.is_transient());
        assert!(!bad_line.is_conflict());
    }

    #[test]
    fn exec_context_prefixes_exec_errors_only() {
        let err = Error::exec("prometheus-0", "eof").exec_context("failed to exec to prometheus pod");
        assert_eq!(
            err.to_string(),
            "exec error in pod prometheus-0: failed to exec to prometheus pod: eof"
        );

        let err = Error::config("bad").exec_context("ignored");
        assert_eq!(err.to_string(), "configuration error: bad");
    }

    #[test]
    fn secret_key_missing_names_the_secret() {
        let err = Error::SecretKeyMissing {
            namespace: "redhat-rhmi-operator".to_string(),
            name: "redhat-rhmi-smtp".to_string(),
            key: "port".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "secret redhat-rhmi-operator/redhat-rhmi-smtp missing key port"
        );
    }
}
