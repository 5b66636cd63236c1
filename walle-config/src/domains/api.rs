//! Target API configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wallet backend and external bank simulator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the wallet backend under test
    #[serde(default = "default_host")]
    pub host: String,

    /// Base URL of the external bank simulator
    #[serde(default = "default_bank_host")]
    pub bank_host: String,

    /// Which top-up path the backend exposes
    #[serde(default)]
    pub deposit_endpoint: DepositEndpoint,

    /// Password used for every synthetic account
    #[serde(default = "default_password")]
    pub password: String,
}

/// Top-up endpoint variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DepositEndpoint {
    /// `POST /wallet/topup/manual`
    #[default]
    Manual,
    /// `POST /wallet/deposit`
    Deposit,
}

impl DepositEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            DepositEndpoint::Manual => "/wallet/topup/manual",
            DepositEndpoint::Deposit => "/wallet/deposit",
        }
    }
}

impl fmt::Display for DepositEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepositEndpoint::Manual => write!(f, "manual"),
            DepositEndpoint::Deposit => write!(f, "deposit"),
        }
    }
}

impl FromStr for DepositEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(DepositEndpoint::Manual),
            "deposit" => Ok(DepositEndpoint::Deposit),
            _ => Err(format!("Invalid deposit endpoint: {}", s)),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            bank_host: default_bank_host(),
            deposit_endpoint: DepositEndpoint::default(),
            password: default_password(),
        }
    }
}

impl Validatable for ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.host, "host", self.domain_name())?;
        validate_url(&self.bank_host, "bank_host", self.domain_name())?;
        validate_required_string(&self.password, "password", self.domain_name())?;

        // The backend rejects registrations with shorter passwords
        if self.password.len() < 8 {
            return Err(self.validation_error("password must be at least 8 characters long"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "api"
    }
}

fn default_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_bank_host() -> String {
    "http://localhost:3001".to_string()
}

fn default_password() -> String {
    "TestPassword123!".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "http://localhost:3000");
        assert_eq!(config.deposit_endpoint, DepositEndpoint::Manual);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deposit_endpoint_paths() {
        assert_eq!(DepositEndpoint::Manual.path(), "/wallet/topup/manual");
        assert_eq!(DepositEndpoint::Deposit.path(), "/wallet/deposit");
        assert_eq!("DEPOSIT".parse::<DepositEndpoint>().unwrap(), DepositEndpoint::Deposit);
        assert!("debin".parse::<DepositEndpoint>().is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        let config = ApiConfig {
            password: "short".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
