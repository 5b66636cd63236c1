//! Structured logging setup for the Wall-E load harness
//!
//! Every crate logs through `tracing`; this crate only installs the global
//! subscriber in the format selected by [`walle_config::LoggingConfig`].

pub mod init;

pub use init::{build_env_filter, init_logging, init_simple_tracing};
