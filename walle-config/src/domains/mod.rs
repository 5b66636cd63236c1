//! Domain-specific configuration modules

pub mod api;
pub mod database;
pub mod http;
pub mod logging;
pub mod run;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main harness configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WalleConfig {
    /// Wallet backend and external bank endpoints
    #[serde(default)]
    pub api: api::ApiConfig,

    /// HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Database used by the cleanup utility
    #[serde(default)]
    pub database: database::DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Run-level parameters shared by all profiles
    #[serde(default)]
    pub run: run::RunConfig,
}

impl WalleConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.api.validate()?;
        self.http.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.run.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = WalleConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
