//! `walle run`

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use walle_config::WalleConfig;
use walle_http::{ClientConfig, HttpWalletClient};
use walle_runtime::{LoadRunner, RunReport, RunnerConfig};
use walle_workload::WorkloadProfile;

pub struct RunArgs {
    pub profile: String,
    pub users: Option<usize>,
    pub spawn_rate: Option<f64>,
    pub run_time: Option<Duration>,
    pub host: Option<String>,
    pub seed: Option<u64>,
    pub json: bool,
}

/// Apply command-line overrides; `--host` beats the profile's host, which beats the config
fn resolve(mut config: WalleConfig, args: &RunArgs) -> Result<(WalleConfig, WorkloadProfile)> {
    let mut profile = WorkloadProfile::by_name(&args.profile)?;
    if let Some(users) = args.users {
        profile = profile.with_users(users);
    }
    if let Some(rate) = args.spawn_rate {
        profile = profile.with_spawn_rate(rate);
    }
    if let Some(run_time) = args.run_time {
        profile = profile.with_run_time(run_time);
    }
    if let Some(host) = &args.host {
        profile = profile.with_host(host.clone());
    }
    if let Some(host) = &profile.host {
        config.api.host = host.clone();
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }
    profile.validate()?;
    Ok((config, profile))
}

pub async fn execute(config: WalleConfig, args: RunArgs) -> Result<ExitCode> {
    let (config, profile) = resolve(config, &args)?;

    let client_config = ClientConfig::from_domains(&config.api, &config.http)
        .context("Invalid API configuration")?;
    let client = HttpWalletClient::new(client_config).context("Failed to build HTTP client")?;

    let runner = LoadRunner::new(Arc::new(client), profile, RunnerConfig::from_config(&config))
        .context("Failed to prepare load run")?;

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping virtual users");
            token.cancel();
        }
    });

    let report = runner.run().await.context("Load run failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", render(&report));
        print_verdict(&report);
    }

    info!("Run finished, passed: {}", report.passed());
    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render(report: &RunReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();

    out.push_str(&format!(
        "\n{:<40} {:>8} {:>8} {:>10} {:>10}\n",
        "Name", "# reqs", "# fails", "Avg (ms)", "p95 (ms)"
    ));
    for endpoint in &report.endpoints {
        out.push_str(&format!(
            "{:<40} {:>8} {:>8} {:>10.1} {:>10.1}\n",
            endpoint.name, endpoint.requests, endpoint.failures, endpoint.average_ms, endpoint.p95_ms
        ));
    }

    out.push_str(&format!(
        "\n=== Wall-E Load Test Completed ({}) ===\n",
        report.profile
    ));
    out.push_str(&format!("Host: {}\n", report.host));
    out.push_str(&format!("Total requests: {}\n", stats.total_requests));
    out.push_str(&format!("Total failures: {}\n", stats.total_failures));
    out.push_str(&format!(
        "Average response time: {:.2}ms\n",
        stats.average_response_ms
    ));
    if let Some(p95) = stats.p95_response_ms {
        out.push_str(&format!("95th percentile: {:.2}ms\n", p95));
    }
    out.push_str(&format!("Requests per second: {:.2}\n", stats.current_rps));
    out.push_str(&format!(
        "Skipped: {}  Tolerated: {}  Peak users: {}\n",
        stats.skipped, stats.tolerated, stats.peak_users
    ));

    if !report.failure_breakdown.is_empty() {
        out.push_str("\nFailures:\n");
        for (key, count) in &report.failure_breakdown {
            out.push_str(&format!("  {:>6}  {}\n", count, key));
        }
    }

    if let Some(analysis) = &report.analysis {
        out.push_str("\n=== Stress Analysis ===\n");
        out.push_str(&format!("Peak users: {}\n", analysis.peak_users));
        out.push_str(&format!(
            "Failure rate: {:.2}%\n",
            analysis.failure_rate * 100.0
        ));
        out.push_str(&format!(
            "Breaking point reached: {}\n",
            if analysis.breaking_point_reached { "yes" } else { "no" }
        ));
        for indicator in &analysis.indicators {
            out.push_str(&format!("  - {}\n", indicator));
        }
    }
    out
}

fn print_verdict(report: &RunReport) {
    if !report.gated {
        return;
    }
    if report.evaluation.passed() {
        println!("\n{}", "All performance thresholds passed".green().bold());
    } else {
        println!("\n{}", "Performance threshold failures:".red().bold());
        for message in report.evaluation.messages() {
            println!("  - {}", message.red());
        }
    }
}
