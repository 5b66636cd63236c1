//! Configuration loading and environment variable handling

use crate::domains::utils::{normalize_host, parse_duration};
use crate::domains::WalleConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
///
/// The connection variables shared with the backend deployment (`API_HOST`,
/// `BANK_API_URL`, `DB_HOST`, ...) are read without a prefix; every other
/// override uses the loader prefix (`WALLE_` by default).
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "WALLE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<WalleConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: WalleConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<WalleConfig> {
        let mut config = WalleConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<WalleConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut WalleConfig) -> ConfigResult<()> {
        self.apply_api_overrides(&mut config.api)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_database_overrides(&mut config.database)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_run_overrides(&mut config.run)?;
        Ok(())
    }

    fn apply_api_overrides(&self, config: &mut crate::domains::api::ApiConfig) -> ConfigResult<()> {
        if let Ok(host) = std::env::var("API_HOST") {
            config.host = normalize_host(&host);
        }

        if let Ok(bank) = std::env::var("BANK_API_URL") {
            config.bank_host = normalize_host(&bank);
        }

        if let Ok(endpoint) = self.get_env_var("DEPOSIT_ENDPOINT") {
            config.deposit_endpoint = parse_var(&self.var_name("DEPOSIT_ENDPOINT"), &endpoint)?;
        }

        if let Ok(password) = self.get_env_var("USER_PASSWORD") {
            config.password = password;
        }

        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            config.timeout = parse_duration(&timeout).map_err(|message| ConfigError::Env {
                var: self.var_name("HTTP_TIMEOUT"),
                message,
            })?;
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(())
    }

    fn apply_database_overrides(
        &self,
        config: &mut crate::domains::database::DatabaseConfig,
    ) -> ConfigResult<()> {
        if let Ok(host) = std::env::var("DB_HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("DB_PORT") {
            config.port = parse_var("DB_PORT", &port)?;
        }

        if let Ok(name) = std::env::var("DB_NAME") {
            config.name = name;
        }

        if let Ok(user) = std::env::var("DB_USER") {
            config.user = user;
        }

        if let Ok(password) = std::env::var("DB_PASSWORD") {
            config.password = password;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(level) = self.get_env_var("LOG_LEVEL") {
            config.level = parse_var(&self.var_name("LOG_LEVEL"), &level)?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = parse_var(&self.var_name("LOG_FORMAT"), &format)?;
        }

        Ok(())
    }

    fn apply_run_overrides(&self, config: &mut crate::domains::run::RunConfig) -> ConfigResult<()> {
        if let Ok(seed) = self.get_env_var("RUN_SEED") {
            config.seed = Some(parse_var(&self.var_name("RUN_SEED"), &seed)?);
        }

        if let Ok(domain) = self.get_env_var("IDENTITY_DOMAIN") {
            config.identity_domain = domain;
        }

        Ok(())
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(self.var_name(name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T>(name: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Env {
            var: name.to_string(),
            message: e.to_string(),
        })
}
