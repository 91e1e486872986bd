//! rhmi-alerts - end-to-end verification of the RHMI alerting pipeline
//!
//! Breaks the Fuse Online UI on purpose and checks that the monitoring stack
//! notices: Prometheus raises the UI alerts, they go pending then firing,
//! Alertmanager receives them, and they clear once the UI is restored.
//! Finally the Alertmanager routing configuration is audited against the
//! SMTP, PagerDuty and dead man's snitch secrets it is rendered from.
//!
//! # Modules
//!
//! - [`scenario`] - The end-to-end run tying everything together
//! - [`alerts`] - Alert states and the tracking table
//! - [`poller`] - Prometheus polling and wait-for-state
//! - [`inject`] - Fault injection: holding workloads at zero replicas
//! - [`scale`] - Replica reads and writes for Deployments and DeploymentConfigs
//! - [`exec`] - Running commands inside pods
//! - [`crosscheck`] - Alertmanager's view of the active alerts
//! - [`routing`] - Typed Alertmanager routing configuration
//! - [`secrets`] - Notification secrets, redacted in memory
//! - [`audit`] - Routing configuration vs. secrets
//! - [`config`] - Scenario configuration
//! - [`client`] - Kubernetes client construction
//! - [`retry`] - Backoff and conflict retry
//! - [`telemetry`] - Logging setup
//! - [`yaml`] - YAML parsing
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod alerts;
pub mod audit;
pub mod client;
pub mod config;
pub mod crosscheck;
pub mod error;
pub mod exec;
pub mod inject;
pub mod poller;
pub mod retry;
pub mod routing;
pub mod scale;
pub mod scenario;
pub mod secrets;
pub mod telemetry;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
