//! Integration tests against a live RHMI cluster
//!
//! # Test Organization
//!
//! - `read_only`: Stories that only observe the cluster (alert precheck,
//!   Alertmanager configuration audit). Safe on a shared cluster.
//!
//! - `alerts_mechanism`: The full scenario. Scales the Fuse operator and UI
//!   to zero for several minutes, so only run it on a disposable cluster.
//!
//! # Running These Tests
//!
//! ```bash
//! # Read-only checks (~seconds)
//! cargo test --test cluster read_only -- --ignored
//!
//! # Full scenario (~10-30min)
//! cargo test --features cluster --test cluster alerts_mechanism -- --ignored --nocapture
//! ```

mod alerts_mechanism;
mod helpers;
mod read_only;
