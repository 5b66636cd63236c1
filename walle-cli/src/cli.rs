//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Wall-E load test harness", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workload profile against the wallet backend
    Run {
        /// Profile: mixed, load, stress, external-bank
        #[arg(value_name = "PROFILE", default_value = "mixed")]
        profile: String,

        /// Number of concurrent virtual users
        #[arg(long, short = 'u')]
        users: Option<usize>,

        /// Users started per second
        #[arg(long, short = 'r')]
        spawn_rate: Option<f64>,

        /// Run duration (e.g. 30s, 5m, 1h)
        #[arg(long, short = 't', value_parser = humantime::parse_duration)]
        run_time: Option<Duration>,

        /// Wallet backend base URL
        #[arg(long)]
        host: Option<String>,

        /// Seed for reproducible user behaviour
        #[arg(long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the built-in profiles
    Profile {
        #[command(subcommand)]
        profile_cmd: ProfileCommands,
    },

    /// Remove load test data from the database
    Cleanup {
        /// Clean up users created in the last N hours
        #[arg(long, default_value_t = 1)]
        hours: u32,

        /// Clean up test transactions older than N days
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Reset the system wallet balance to 0
        #[arg(long)]
        reset_system_wallet: bool,

        /// Only show database statistics, no cleanup
        #[arg(long)]
        stats_only: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List the available profiles
    List,

    /// Show a profile's population, journeys and thresholds
    Show {
        #[arg(value_name = "PROFILE")]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Write a sample configuration with every default
    Generate {
        /// Output file; stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "walle", "run", "load", "--users", "20", "--run-time", "90s", "--seed", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                profile,
                users,
                run_time,
                seed,
                spawn_rate,
                ..
            } => {
                assert_eq!(profile, "load");
                assert_eq!(users, Some(20));
                assert_eq!(run_time, Some(Duration::from_secs(90)));
                assert_eq!(seed, Some(7));
                assert_eq!(spawn_rate, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cleanup_defaults() {
        let cli = Cli::try_parse_from(["walle", "cleanup"]).unwrap();
        match cli.command {
            Commands::Cleanup {
                hours,
                days,
                reset_system_wallet,
                stats_only,
            } => {
                assert_eq!(hours, 1);
                assert_eq!(days, 7);
                assert!(!reset_system_wallet);
                assert!(!stats_only);
            }
            _ => panic!("expected cleanup"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["walle", "cleanup", "--stats-only", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_bad_run_time_is_rejected() {
        assert!(Cli::try_parse_from(["walle", "run", "--run-time", "soon"]).is_err());
    }
}
