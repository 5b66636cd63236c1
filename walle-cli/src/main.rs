use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use walle_config::{ConfigLoader, LogLevel, WalleConfig};

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands, ProfileCommands};
use commands::run::RunArgs;

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<WalleConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Load configuration and install the subscriber, `--log-level` taking precedence
fn prepare(config_path: Option<&PathBuf>, log_level: Option<&str>) -> Result<WalleConfig> {
    let mut config = load_config(config_path)?;
    if let Some(level) = log_level {
        config.logging.level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    walle_logging::init_logging(&config.logging)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let Cli {
        config: config_path,
        log_level,
        command,
    } = Cli::parse();

    match command {
        Commands::Run {
            profile,
            users,
            spawn_rate,
            run_time,
            host,
            seed,
            json,
        } => {
            let config = prepare(config_path.as_ref(), log_level.as_deref())?;
            let args = RunArgs {
                profile,
                users,
                spawn_rate,
                run_time,
                host,
                seed,
                json,
            };
            commands::run::execute(config, args).await
        }
        Commands::Profile { profile_cmd } => {
            let config = prepare(config_path.as_ref(), log_level.as_deref())?;
            match profile_cmd {
                ProfileCommands::List => commands::profile::list(),
                ProfileCommands::Show { name } => commands::profile::show(&name, &config),
            }
        }
        Commands::Cleanup {
            hours,
            days,
            reset_system_wallet,
            stats_only,
        } => {
            let config = prepare(config_path.as_ref(), log_level.as_deref())?;
            let options = walle_cleanup::CleanupOptions {
                hours,
                days,
                reset_system_wallet,
                stats_only,
            };
            commands::cleanup::execute(&config, &options).await
        }
        // Validation reports its own errors, so no config is loaded up front
        Commands::Config { config_cmd } => {
            walle_logging::init_simple_tracing(log_level.as_deref().unwrap_or("warn"))?;
            match config_cmd {
                ConfigCommands::Validate { config_file } => commands::config::validate(&config_file),
                ConfigCommands::Generate { output, force } => {
                    commands::config::generate(output.as_ref(), force)
                }
            }
        }
    }
}
