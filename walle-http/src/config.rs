//! HTTP client configuration

use crate::errors::HttpError;
use std::time::Duration;
use url::Url;
use walle_config::{ApiConfig, DepositEndpoint, HttpConfig};

/// Resolved settings for [`crate::HttpWalletClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Wallet backend base URL
    pub base_url: Url,

    /// External bank simulator base URL
    pub bank_url: Url,

    /// Top-up path variant exposed by the backend
    pub deposit_endpoint: DepositEndpoint,

    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Idle connections kept per host
    pub max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    pub fn from_domains(api: &ApiConfig, http: &HttpConfig) -> Result<Self, HttpError> {
        Ok(Self {
            base_url: Url::parse(&api.host)?,
            bank_url: Url::parse(&api.bank_host)?,
            deposit_endpoint: api.deposit_endpoint,
            timeout: http.timeout,
            connect_timeout: http.connect_timeout,
            max_idle_per_host: http.max_idle_per_host,
            user_agent: http.user_agent.clone(),
        })
    }

    /// Same defaults as the configuration domains, pointed at `host`
    pub fn for_host(host: &str) -> Result<Self, HttpError> {
        let api = ApiConfig {
            host: host.to_string(),
            bank_host: host.to_string(),
            ..ApiConfig::default()
        };
        Self::from_domains(&api, &HttpConfig::default())
    }
}
