//! Run-level configuration shared by every workload profile

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters that apply to a load run independently of the profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for every random draw; unset means OS entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Window used for the current-throughput figure
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_throughput_window"
    )]
    pub throughput_window: Duration,

    /// Email domain of generated identities
    #[serde(default = "default_identity_domain")]
    pub identity_domain: String,

    /// Shared recipient of the external-bank journey
    #[serde(default)]
    pub external_bank: ExternalBankConfig,
}

/// Pre-provisioned recipient shared by all external-bank virtual users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalBankConfig {
    #[serde(default = "default_recipient_email")]
    pub recipient_email: String,

    #[serde(default = "default_recipient_alias")]
    pub recipient_alias: String,

    /// `source` field sent with every bank transfer
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            throughput_window: default_throughput_window(),
            identity_domain: default_identity_domain(),
            external_bank: ExternalBankConfig::default(),
        }
    }
}

impl Default for ExternalBankConfig {
    fn default() -> Self {
        Self {
            recipient_email: default_recipient_email(),
            recipient_alias: default_recipient_alias(),
            source: default_source(),
        }
    }
}

impl Validatable for RunConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.throughput_window.as_secs(),
            "throughput_window",
            self.domain_name(),
        )?;
        validate_required_string(&self.identity_domain, "identity_domain", self.domain_name())?;
        if self.identity_domain.contains('@') {
            return Err(self.validation_error("identity_domain must not contain '@'"));
        }
        self.external_bank.validate()
    }

    fn domain_name(&self) -> &'static str {
        "run"
    }
}

impl Validatable for ExternalBankConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.recipient_email, "recipient_email", self.domain_name())?;
        validate_required_string(&self.source, "source", self.domain_name())?;

        // Same rule the backend applies to aliases at registration
        let alias_ok = (3..=30).contains(&self.recipient_alias.len())
            && self
                .recipient_alias
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !alias_ok {
            return Err(self.validation_error(
                "recipient_alias must be 3-30 alphanumeric or underscore characters",
            ));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "run.external_bank"
    }
}

fn default_throughput_window() -> Duration {
    Duration::from_secs(10)
}

fn default_identity_domain() -> String {
    "example.com".to_string()
}

fn default_recipient_email() -> String {
    "bank.recipient.loadtest@example.com".to_string()
}

fn default_recipient_alias() -> String {
    "loadtest_bank_recipient".to_string()
}

fn default_source() -> String {
    "loadtest".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert!(config.seed.is_none());
        assert_eq!(config.throughput_window, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alias_rules() {
        let mut bank = ExternalBankConfig::default();
        bank.recipient_alias = "ab".to_string();
        assert!(bank.validate().is_err());

        bank.recipient_alias = "bad-alias".to_string();
        assert!(bank.validate().is_err());

        bank.recipient_alias = "good_alias_01".to_string();
        assert!(bank.validate().is_ok());
    }

    #[test]
    fn test_identity_domain_rejects_at_sign() {
        let config = RunConfig {
            identity_domain: "@example.com".to_string(),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
