//! Typed view of the Alertmanager routing configuration
//!
//! Only the parts the audit reads are modelled: the SMTP settings in
//! `global`, and `receivers`. Each receiver is classified by the integration
//! it carries, so the audit can match on a variant instead of digging through
//! untyped maps.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use crate::yaml::parse_yaml_as;
use crate::Result;

const CONTEXT: &str = "alertmanager.yaml";

/// Deserialize a YAML scalar as its source text
///
/// Keys and passwords that look like numbers are compared as written, so
/// `007` stays `007`. `null` becomes the empty string.
fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// `global` section
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// SMTP relay as `host:port`
    #[serde(default, deserialize_with = "nullable_string")]
    pub smtp_smarthost: String,
    /// SMTP auth user
    #[serde(default, deserialize_with = "nullable_string")]
    pub smtp_auth_username: String,
    /// SMTP auth password
    #[serde(default, deserialize_with = "nullable_string")]
    pub smtp_auth_password: String,
}

impl fmt::Display for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "smtp_smarthost={} smtp_auth_username={} smtp_auth_password=[redacted]",
            self.smtp_smarthost, self.smtp_auth_username
        )
    }
}

/// One `pagerduty_configs` entry
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct PagerDutyConfig {
    /// Integration key for the Events API v1
    #[serde(default, deserialize_with = "nullable_string")]
    pub service_key: String,
}

/// One `webhook_configs` entry
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Endpoint notifications are posted to
    #[serde(default, deserialize_with = "nullable_string")]
    pub url: String,
}

/// One `email_configs` entry
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct EmailConfig {
    /// Recipient address list
    #[serde(default, deserialize_with = "nullable_string")]
    pub to: String,
}

// Integrations the audit never reads are only recorded as present.
#[derive(Deserialize)]
struct RawReceiver {
    #[serde(default, deserialize_with = "nullable_string")]
    name: String,
    #[serde(default)]
    pagerduty_configs: Option<Vec<PagerDutyConfig>>,
    #[serde(default)]
    webhook_configs: Option<Vec<WebhookConfig>>,
    #[serde(default)]
    email_configs: Option<Vec<EmailConfig>>,
    #[serde(default)]
    discord_configs: Option<IgnoredAny>,
    #[serde(default)]
    msteams_configs: Option<IgnoredAny>,
    #[serde(default)]
    opsgenie_configs: Option<IgnoredAny>,
    #[serde(default)]
    pushover_configs: Option<IgnoredAny>,
    #[serde(default)]
    slack_configs: Option<IgnoredAny>,
    #[serde(default)]
    sns_configs: Option<IgnoredAny>,
    #[serde(default)]
    telegram_configs: Option<IgnoredAny>,
    #[serde(default)]
    victorops_configs: Option<IgnoredAny>,
    #[serde(default)]
    webex_configs: Option<IgnoredAny>,
    #[serde(default)]
    wechat_configs: Option<IgnoredAny>,
}

impl RawReceiver {
    /// The `*_configs` keys present, sorted
    fn kinds(&self) -> Vec<String> {
        [
            ("discord_configs", self.discord_configs.is_some()),
            ("email_configs", self.email_configs.is_some()),
            ("msteams_configs", self.msteams_configs.is_some()),
            ("opsgenie_configs", self.opsgenie_configs.is_some()),
            ("pagerduty_configs", self.pagerduty_configs.is_some()),
            ("pushover_configs", self.pushover_configs.is_some()),
            ("slack_configs", self.slack_configs.is_some()),
            ("sns_configs", self.sns_configs.is_some()),
            ("telegram_configs", self.telegram_configs.is_some()),
            ("victorops_configs", self.victorops_configs.is_some()),
            ("webex_configs", self.webex_configs.is_some()),
            ("webhook_configs", self.webhook_configs.is_some()),
            ("wechat_configs", self.wechat_configs.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(kind, _)| kind.to_string())
        .collect()
    }
}

/// A receiver, discriminated by the integration it carries
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawReceiver")]
pub enum Receiver {
    /// Receiver with only `pagerduty_configs`
    PagerDuty {
        /// Receiver name
        name: String,
        /// Integration entries
        configs: Vec<PagerDutyConfig>,
    },
    /// Receiver with only `webhook_configs`
    Webhook {
        /// Receiver name
        name: String,
        /// Integration entries
        configs: Vec<WebhookConfig>,
    },
    /// Receiver with only `email_configs`
    Email {
        /// Receiver name
        name: String,
        /// Integration entries
        configs: Vec<EmailConfig>,
    },
    /// Receiver with no integrations (drops notifications)
    Null {
        /// Receiver name
        name: String,
    },
    /// Receiver with other or several integration kinds
    Other {
        /// Receiver name
        name: String,
        /// The `*_configs` keys present
        kinds: Vec<String>,
    },
}

impl TryFrom<RawReceiver> for Receiver {
    type Error = String;

    fn try_from(raw: RawReceiver) -> std::result::Result<Self, Self::Error> {
        if raw.name.is_empty() {
            return Err("receiver without a name".to_string());
        }

        let kinds = raw.kinds();
        let name = raw.name;
        Ok(match (kinds.len(), raw.pagerduty_configs, raw.webhook_configs, raw.email_configs) {
            (0, _, _, _) => Receiver::Null { name },
            (1, Some(configs), _, _) => Receiver::PagerDuty { name, configs },
            (1, _, Some(configs), _) => Receiver::Webhook { name, configs },
            (1, _, _, Some(configs)) => Receiver::Email { name, configs },
            _ => Receiver::Other { name, kinds },
        })
    }
}

impl Receiver {
    /// Receiver name
    pub fn name(&self) -> &str {
        match self {
            Receiver::PagerDuty { name, .. }
            | Receiver::Webhook { name, .. }
            | Receiver::Email { name, .. }
            | Receiver::Null { name }
            | Receiver::Other { name, .. } => name,
        }
    }

    /// Short name of the receiver's integration kind
    pub fn kind(&self) -> &'static str {
        match self {
            Receiver::PagerDuty { .. } => "pagerduty",
            Receiver::Webhook { .. } => "webhook",
            Receiver::Email { .. } => "email",
            Receiver::Null { .. } => "null",
            Receiver::Other { .. } => "other",
        }
    }
}

/// Parsed routing configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
    /// Receivers in file order
    #[serde(default)]
    pub receivers: Vec<Receiver>,
}

impl RoutingConfig {
    /// Parse an `alertmanager.yaml` document
    pub fn parse(yaml: &str) -> Result<Self> {
        parse_yaml_as(yaml, CONTEXT)
    }

    /// First receiver with the given name
    pub fn receiver(&self, name: &str) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.name() == name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Error;

    pub(crate) const ALERTMANAGER_YAML: &str = r#"
global:
  resolve_timeout: 5m
  smtp_smarthost: smtp.sendgrid.net:587
  smtp_from: noreply@example.com
  smtp_auth_username: apikey
  smtp_auth_password: s3cr3t
route:
  receiver: default
  routes:
    - match:
        severity: critical
      receiver: critical
    - match:
        alertname: DeadMansSwitch
      receiver: deadmansswitch
receivers:
  - name: default
    email_configs:
      - to: sre@example.com
  - name: critical
    pagerduty_configs:
      - service_key: 1234567890
  - name: deadmansswitch
    webhook_configs:
      - url: https://nosnch.in/abc123
  - name: blackhole
"#;

    /// Story: the RHMI routing file parses into typed receivers
    #[test]
    fn story_rhmi_config_parses_into_variants() {
        let config = RoutingConfig::parse(ALERTMANAGER_YAML).expect("valid config");

        assert_eq!(config.global.smtp_smarthost, "smtp.sendgrid.net:587");
        assert_eq!(config.global.smtp_auth_username, "apikey");
        assert_eq!(config.global.smtp_auth_password, "s3cr3t");
        assert_eq!(config.receivers.len(), 4);

        match config.receiver("critical") {
            Some(Receiver::PagerDuty { configs, .. }) => {
                // numeric-looking keys are compared as strings
                assert_eq!(configs[0].service_key, "1234567890");
            }
            other => panic!("expected pagerduty receiver, got {other:?}"),
        }
        match config.receiver("deadmansswitch") {
            Some(Receiver::Webhook { configs, .. }) => {
                assert_eq!(configs[0].url, "https://nosnch.in/abc123");
            }
            other => panic!("expected webhook receiver, got {other:?}"),
        }
        assert_eq!(config.receiver("default").map(Receiver::kind), Some("email"));
        assert_eq!(config.receiver("blackhole").map(Receiver::kind), Some("null"));
        assert!(config.receiver("missing").is_none());
    }

    #[test]
    fn quoted_numeric_key_is_kept_verbatim() {
        let config = RoutingConfig::parse(
            "receivers:\n  - name: critical\n    pagerduty_configs:\n      - service_key: '0123'\n",
        )
        .expect("valid");
        match &config.receivers[0] {
            Receiver::PagerDuty { configs, .. } => assert_eq!(configs[0].service_key, "0123"),
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Story: secrets that look like numbers are written unquoted
    ///
    /// The rendered file keeps whatever text the secret held. A password of
    /// `007` or `1.50` and an all-digit integration key must come back
    /// exactly as written, not as the number YAML would read them as.
    #[test]
    fn story_unquoted_numeric_scalars_keep_their_text() {
        let config = RoutingConfig::parse(
            r#"
global:
  smtp_smarthost: smtp.sendgrid.net:587
  smtp_auth_username: 0042
  smtp_auth_password: 1.50
receivers:
  - name: critical
    pagerduty_configs:
      - service_key: 12345678901234567890123456789012
  - name: deadmansswitch
    webhook_configs:
      - url: 007
"#,
        )
        .expect("valid");

        assert_eq!(config.global.smtp_auth_username, "0042");
        assert_eq!(config.global.smtp_auth_password, "1.50");
        match config.receiver("critical") {
            Some(Receiver::PagerDuty { configs, .. }) => {
                assert_eq!(configs[0].service_key, "12345678901234567890123456789012");
            }
            other => panic!("expected pagerduty receiver, got {other:?}"),
        }
        match config.receiver("deadmansswitch") {
            Some(Receiver::Webhook { configs, .. }) => assert_eq!(configs[0].url, "007"),
            other => panic!("expected webhook receiver, got {other:?}"),
        }
    }

    #[test]
    fn null_scalars_become_empty_strings() {
        let config = RoutingConfig::parse("global:\n  smtp_auth_password: ~\n  smtp_auth_username:\n")
            .expect("valid");
        assert_eq!(config.global.smtp_auth_password, "");
        assert_eq!(config.global.smtp_auth_username, "");
    }

    #[test]
    fn unread_integration_fields_do_not_fail_the_parse() {
        let config = RoutingConfig::parse(
            r#"
receivers:
  - name: critical
    pagerduty_configs:
      - service_key: abc
        routing_key: 123456
        send_resolved: yes
        details:
          severity: critical
"#,
        )
        .expect("valid");
        assert_eq!(config.receivers[0].kind(), "pagerduty");
    }

    #[test]
    fn mixed_integrations_are_other() {
        let config = RoutingConfig::parse(
            r#"
receivers:
  - name: critical
    pagerduty_configs:
      - service_key: abc
    slack_configs:
      - channel: '#alerts'
"#,
        )
        .expect("valid");
        assert_eq!(
            config.receivers[0],
            Receiver::Other {
                name: "critical".to_string(),
                kinds: vec!["pagerduty_configs".to_string(), "slack_configs".to_string()],
            }
        );
    }

    #[test]
    fn unknown_single_integration_is_other() {
        let config = RoutingConfig::parse(
            "receivers:\n  - name: chat\n    slack_configs:\n      - channel: ops\n",
        )
        .expect("valid");
        assert_eq!(
            config.receivers[0],
            Receiver::Other {
                name: "chat".to_string(),
                kinds: vec!["slack_configs".to_string()],
            }
        );
    }

    #[test]
    fn non_integration_keys_do_not_count_as_kinds() {
        let config = RoutingConfig::parse(
            "receivers:\n  - name: ops\n    webhook_configs:\n      - url: https://hooks.example.com\n    comment: primary\n",
        )
        .expect("valid");
        assert_eq!(config.receivers[0].kind(), "webhook");
    }

    #[test]
    fn unnamed_receiver_is_rejected() {
        let err = RoutingConfig::parse("receivers:\n  - webhook_configs: []\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("receiver without a name"));
    }

    #[test]
    fn malformed_integration_list_is_a_parse_error() {
        let err = RoutingConfig::parse(
            "receivers:\n  - name: critical\n    pagerduty_configs: not-a-list\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("alertmanager.yaml"));
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(RoutingConfig::parse("").is_err());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config = RoutingConfig::parse("route:\n  receiver: default\n").expect("valid");
        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.receivers.is_empty());
    }

    #[test]
    fn global_display_redacts_password() {
        let config = RoutingConfig::parse(ALERTMANAGER_YAML).expect("valid");
        let rendered = config.global.to_string();
        assert!(rendered.contains("smtp.sendgrid.net:587"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
