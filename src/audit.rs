//! Alertmanager configuration audit
//!
//! Compares the routing configuration Alertmanager actually loaded against
//! the secrets it should have been rendered from. Fields are checked in a
//! fixed order and the first mismatch is returned. Mismatch errors name the
//! field; they never carry either value.

use tracing::{info, instrument};

use crate::config::ScenarioConfig;
use crate::routing::{Receiver, RoutingConfig};
use crate::secrets::{Redacted, SecretBundle, SecretSource};
use crate::{Error, Result};

/// Field names reported on mismatch
pub mod field {
    /// `global.smtp_smarthost`
    pub const SMTP_SMARTHOST: &str = "smtp_smarthost";
    /// `global.smtp_auth_username`
    pub const SMTP_AUTH_USERNAME: &str = "smtp_auth_username";
    /// `global.smtp_auth_password`
    pub const SMTP_AUTH_PASSWORD: &str = "smtp_auth_password";
    /// PagerDuty receiver `service_key`
    pub const PAGERDUTY_SERVICE_KEY: &str = "pagerduty service_key";
    /// Dead man's switch receiver webhook `url`
    pub const DMS_URL: &str = "dms url";
}

fn expect_eq(actual: &str, expected: &Redacted, name: &'static str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ConfigMismatch(name))
    }
}

/// Audit `bundle.alertmanager_config` against the other secrets in `bundle`
pub fn audit_routing(bundle: &SecretBundle, config: &ScenarioConfig) -> Result<()> {
    let routing = RoutingConfig::parse(bundle.alertmanager_config.expose())?;

    let global = &routing.global;
    expect_eq(&global.smtp_smarthost, &bundle.smtp.smarthost(), field::SMTP_SMARTHOST)?;
    expect_eq(&global.smtp_auth_username, &bundle.smtp.username, field::SMTP_AUTH_USERNAME)?;
    expect_eq(&global.smtp_auth_password, &bundle.smtp.password, field::SMTP_AUTH_PASSWORD)?;

    let pagerduty = routing
        .receiver(&config.pagerduty_receiver)
        .ok_or_else(|| Error::receiver(&config.pagerduty_receiver, "not found"))?;
    let dms = routing
        .receiver(&config.deadmansswitch_receiver)
        .ok_or_else(|| Error::receiver(&config.deadmansswitch_receiver, "not found"))?;

    // receivers are checked in file order, so the reported mismatch is the
    // one a reader of the file would hit first
    for receiver in &routing.receivers {
        if std::ptr::eq(receiver, pagerduty) {
            check_pagerduty(receiver, &bundle.pagerduty_service_key)?;
        } else if std::ptr::eq(receiver, dms) {
            check_deadmansswitch(receiver, &bundle.deadmanssnitch_url)?;
        }
    }

    info!(
        receivers = routing.receivers.len(),
        "Alertmanager configuration matches secrets"
    );
    Ok(())
}

fn check_pagerduty(receiver: &Receiver, service_key: &Redacted) -> Result<()> {
    match receiver {
        Receiver::PagerDuty { name, configs } => {
            let first = configs
                .first()
                .ok_or_else(|| Error::receiver(name, "no pagerduty_configs entries"))?;
            expect_eq(&first.service_key, service_key, field::PAGERDUTY_SERVICE_KEY)
        }
        other => Err(Error::receiver(
            other.name(),
            format!("expected a pagerduty receiver, found {}", other.kind()),
        )),
    }
}

fn check_deadmansswitch(receiver: &Receiver, url: &Redacted) -> Result<()> {
    match receiver {
        Receiver::Webhook { name, configs } => {
            let first = configs
                .first()
                .ok_or_else(|| Error::receiver(name, "no webhook_configs entries"))?;
            expect_eq(&first.url, url, field::DMS_URL)
        }
        other => Err(Error::receiver(
            other.name(),
            format!("expected a webhook receiver, found {}", other.kind()),
        )),
    }
}

/// Read the secrets named in `config` and audit the routing configuration
#[instrument(skip_all)]
pub async fn audit_alertmanager(source: &dyn SecretSource, config: &ScenarioConfig) -> Result<()> {
    let bundle = SecretBundle::fetch(source, config).await?;
    audit_routing(&bundle, config)
}
