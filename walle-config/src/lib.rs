//! Domain-driven configuration for the Wall-E load harness
//!
//! Configuration is split by functional domain (target API, HTTP client,
//! database, logging, run parameters), with validation, defaults and
//! environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    api::{ApiConfig, DepositEndpoint},
    database::DatabaseConfig,
    http::HttpConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    run::{ExternalBankConfig, RunConfig},
    WalleConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
