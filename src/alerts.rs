//! Alert states and the tracking table
//!
//! Prometheus' `/api/v1/alerts` only lists alerts that are pending or firing,
//! so every tracked alert starts each poll at [`AlertState::None`] and is
//! raised by whatever the response reports. An [`AlertSnapshot`] is the
//! result of one poll; it is never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::{Error, Result};

/// Lifecycle state of a tracked alert
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertState {
    /// Not reported by Prometheus (or reported inactive)
    #[default]
    None,
    /// Expression true, `for` duration not yet elapsed
    Pending,
    /// Firing and handed to Alertmanager
    Firing,
}

impl AlertState {
    /// Lowercase name as used by the Prometheus API
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::None => "none",
            AlertState::Pending => "pending",
            AlertState::Firing => "firing",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "inactive" => Ok(AlertState::None),
            "pending" => Ok(AlertState::Pending),
            "firing" => Ok(AlertState::Firing),
            other => Err(Error::parse(
                "alert state",
                format!("unknown alert state {:?}", other),
            )),
        }
    }
}

/// Prometheus HTTP API envelope
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `data` payload of `/api/v1/alerts`
#[derive(Debug, Deserialize)]
struct AlertsResult {
    alerts: Vec<ActiveAlert>,
}

#[derive(Debug, Deserialize)]
struct ActiveAlert {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    state: String,
}

const PARSE_CONTEXT: &str = "prometheus alerts";

/// Tracking table: last observed state of every tracked alert
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertSnapshot {
    states: BTreeMap<String, AlertState>,
}

impl AlertSnapshot {
    /// A table with every tracked alert at [`AlertState::None`]
    pub fn reset<S: AsRef<str>>(tracked: &[S]) -> Self {
        Self {
            states: tracked
                .iter()
                .map(|name| (name.as_ref().to_string(), AlertState::None))
                .collect(),
        }
    }

    /// Build a snapshot from a `/api/v1/alerts` response body
    ///
    /// Alerts outside `tracked` are ignored. When an alert is reported more
    /// than once (one entry per label set), the most advanced state wins.
    pub fn from_response<S: AsRef<str>>(body: &str, tracked: &[S]) -> Result<Self> {
        let envelope: ApiResponse = serde_json::from_str(body)
            .map_err(|e| Error::parse(PARSE_CONTEXT, format!("failed to unmarshal json: {}", e)))?;

        if envelope.status != "success" {
            return Err(Error::parse(
                PARSE_CONTEXT,
                format!(
                    "api returned status {}: {} {}",
                    envelope.status,
                    envelope.error_type.unwrap_or_default(),
                    envelope.error.unwrap_or_default()
                ),
            ));
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::parse(PARSE_CONTEXT, "response has no data field"))?;
        let result: AlertsResult = serde_json::from_value(data)
            .map_err(|e| Error::parse(PARSE_CONTEXT, format!("failed to unmarshal json: {}", e)))?;

        let mut snapshot = Self::reset(tracked);
        for alert in result.alerts {
            let Some(name) = alert.labels.get("alertname") else {
                continue;
            };
            let Some(current) = snapshot.states.get_mut(name) else {
                continue;
            };
            let observed: AlertState = alert.state.parse()?;
            if observed > *current {
                *current = observed;
            }
        }
        Ok(snapshot)
    }

    /// State of one tracked alert
    pub fn state(&self, name: &str) -> Option<AlertState> {
        self.states.get(name).copied()
    }

    /// Whether every tracked alert is in `expected`
    pub fn all_in(&self, expected: AlertState) -> bool {
        self.states.values().all(|state| *state == expected)
    }

    /// Tracked alerts not in `expected`, with their current state
    pub fn outside(&self, expected: AlertState) -> Vec<(String, AlertState)> {
        self.states
            .iter()
            .filter(|(_, state)| **state != expected)
            .map(|(name, state)| (name.clone(), *state))
            .collect()
    }

    /// Names of tracked alerts that are pending or firing
    pub fn active(&self) -> Vec<String> {
        self.outside(AlertState::None)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Tracked alert names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Iterate over `(name, state)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, AlertState)> {
        self.states.iter().map(|(name, state)| (name.as_str(), *state))
    }

    /// Number of tracked alerts
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no alerts are tracked
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl fmt::Display for AlertSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, state) in self.iter() {
            writeln!(f, "{:<50} {}", name, state)?;
        }
        Ok(())
    }
}
