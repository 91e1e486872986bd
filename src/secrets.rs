//! Notification secrets
//!
//! Values read here are credentials. They are held in [`Redacted`], which
//! zeroes its buffer on drop and never prints its contents.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

#[cfg(test)]
use mockall::automock;

use crate::config::{ScenarioConfig, SecretKeyRef};
use crate::retry::{retry_transient, RetryConfig};
use crate::{Error, Result};

/// A secret value that is zeroed on drop and redacted in `Debug`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Redacted(Zeroizing<String>);

impl Redacted {
    /// Wrap a value
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the plaintext
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl PartialEq<str> for Redacted {
    fn eq(&self, other: &str) -> bool {
        self.expose() == other
    }
}

/// Read access to secret data
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Decoded `data` of a secret, keyed by data key
    async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>>;
}

/// [`SecretSource`] backed by the Kubernetes API
pub struct KubeSecretSource {
    client: Client,
    retry: RetryConfig,
}

impl KubeSecretSource {
    /// Create a source reading through `client`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig::with_max_attempts(5),
        }
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = retry_transient(&self.retry, &format!("read secret {namespace}/{name}"), || {
            let api = api.clone();
            async move { Ok(api.get(name).await?) }
        })
        .await?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }
}

/// SMTP relay credentials from the SMTP secret
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtpCredentials {
    /// Relay host
    pub host: Redacted,
    /// Relay port
    pub port: Redacted,
    /// Auth user
    pub username: Redacted,
    /// Auth password
    pub password: Redacted,
}

impl SmtpCredentials {
    /// `host:port`, the form Alertmanager's `smtp_smarthost` uses
    pub fn smarthost(&self) -> Redacted {
        Redacted::new(format!("{}:{}", self.host.expose(), self.port.expose()))
    }
}

/// Everything the configuration audit compares
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretBundle {
    /// Dead man's snitch webhook URL
    pub deadmanssnitch_url: Redacted,
    /// PagerDuty service key
    pub pagerduty_service_key: Redacted,
    /// SMTP credentials
    pub smtp: SmtpCredentials,
    /// Alertmanager's routing configuration, as stored
    pub alertmanager_config: Redacted,
}

impl SecretBundle {
    /// Read every secret named in `config`
    ///
    /// Notification secrets live in the RHMI operator namespace; the routing
    /// configuration lives in the monitoring namespace.
    #[instrument(skip_all)]
    pub async fn fetch(source: &dyn SecretSource, config: &ScenarioConfig) -> Result<Self> {
        let operator_ns = config.rhmi_operator_namespace.as_str();
        let names = &config.secrets;

        let deadmanssnitch_url = read_key(source, operator_ns, &names.deadmanssnitch).await?;
        let pagerduty_service_key = read_key(source, operator_ns, &names.pagerduty).await?;

        let smtp_data = source.get_secret_data(operator_ns, &names.smtp).await?;
        let smtp_key = |key: &str| take_key(&smtp_data, operator_ns, &names.smtp, key);
        let smtp = SmtpCredentials {
            host: smtp_key("host")?,
            port: smtp_key("port")?,
            username: smtp_key("username")?,
            password: smtp_key("password")?,
        };

        let alertmanager_config =
            read_key(source, &config.monitoring_namespace, &names.alertmanager).await?;

        debug!("Read notification secrets");
        Ok(Self {
            deadmanssnitch_url,
            pagerduty_service_key,
            smtp,
            alertmanager_config,
        })
    }
}

async fn read_key(source: &dyn SecretSource, namespace: &str, secret: &SecretKeyRef) -> Result<Redacted> {
    let data = source.get_secret_data(namespace, &secret.name).await?;
    take_key(&data, namespace, &secret.name, &secret.key)
}

fn take_key(data: &BTreeMap<String, Vec<u8>>, namespace: &str, name: &str, key: &str) -> Result<Redacted> {
    let bytes = data.get(key).ok_or_else(|| Error::SecretKeyMissing {
        namespace: namespace.to_string(),
        name: name.to_string(),
        key: key.to_string(),
    })?;
    // the error must not carry the bytes
    let value = std::str::from_utf8(bytes)
        .map_err(|_| Error::parse(format!("secret {namespace}/{name}"), format!("key {key} is not valid UTF-8")))?;
    Ok(Redacted::new(value))
}
