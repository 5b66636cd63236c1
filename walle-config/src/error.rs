//! Configuration error types

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An override variable is set but unusable
    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },

    /// A domain rejected its own values
    #[error("Domain configuration error in {domain}: {message}")]
    Domain { domain: String, message: String },
}
