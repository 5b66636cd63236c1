//! Subcommand implementations

pub mod cleanup;
pub mod config;
pub mod profile;
pub mod run;
