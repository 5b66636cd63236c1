//! `walle config`

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use walle_config::{ConfigLoader, WalleConfig};

pub fn validate(config_file: &Path) -> Result<ExitCode> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            error!("Configuration validation failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn generate(output: Option<&PathBuf>, force: bool) -> Result<ExitCode> {
    let content = WalleConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", content);
        return Ok(ExitCode::SUCCESS);
    };

    write_sample(output, &content, force)?;
    println!("✅ Configuration generated at: {:?}", output);
    println!(
        "🔧 Validate with: walle config validate --config-file {:?}",
        output
    );
    Ok(ExitCode::SUCCESS)
}

fn write_sample(output: &Path, content: &str, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, content).context("Failed to write configuration file")?;
    Ok(())
}
