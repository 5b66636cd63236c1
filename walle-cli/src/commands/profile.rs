//! `walle profile`

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;
use walle_config::WalleConfig;
use walle_workload::{ProfileKind, ThresholdSet, WorkloadProfile};

pub fn list() -> Result<ExitCode> {
    for kind in ProfileKind::ALL {
        let profile = kind.build()?;
        println!(
            "{:<14} {:>5} users  {:>5}/s  {}",
            kind.name().bold(),
            profile.users,
            profile.spawn_rate,
            humantime::format_duration(profile.run_time)
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn show(name: &str, config: &WalleConfig) -> Result<ExitCode> {
    let profile = WorkloadProfile::by_name(name)?;
    print!("{}", render(&profile, config));
    Ok(ExitCode::SUCCESS)
}

fn title(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Mixed => "Mixed Load",
        ProfileKind::Load => "Load",
        ProfileKind::Stress => "Stress",
        ProfileKind::ExternalBank => "External Bank",
    }
}

fn render(profile: &WorkloadProfile, config: &WalleConfig) -> String {
    let mut out = String::new();
    let host = profile.host.as_deref().unwrap_or(&config.api.host);

    out.push_str(&format!(
        "=== Wall-E {} Test Configuration ===\n",
        title(profile.kind)
    ));
    out.push_str(&format!("Users: {}\n", profile.users));
    out.push_str(&format!("Spawn Rate: {}\n", profile.spawn_rate));
    out.push_str(&format!(
        "Run Time: {}\n",
        humantime::format_duration(profile.run_time)
    ));
    out.push_str(&format!("Host: {}\n", host));

    out.push_str("\nUser Archetypes:\n");
    for archetype in &profile.archetypes {
        let think = archetype.think_time();
        out.push_str(&format!(
            "  {} (weight {}, wait {:.1}-{:.1}s, journey {})\n",
            archetype.name(),
            archetype.weight(),
            think.min().as_secs_f64(),
            think.max().as_secs_f64(),
            archetype.journey().name()
        ));
        for step in archetype.journey().steps() {
            out.push_str(&format!("    - {} x{}\n", step.name, step.weight));
        }
    }

    if profile.gates_on_thresholds() {
        out.push_str("\nPerformance Thresholds:\n");
    } else {
        out.push_str("\nBreaking Point Indicators:\n");
    }
    out.push_str(&thresholds(&profile.thresholds));

    if profile.kind == ProfileKind::Stress {
        out.push_str("\nWarning: This test is designed to stress the system to its limits!\n");
        out.push_str("Monitor system resources closely during execution.\n");
    }
    out
}

fn thresholds(set: &ThresholdSet) -> String {
    format!(
        "  max_avg_response_time: {}ms\n  max_p95_response_time: {}ms\n  max_failure_rate: {}%\n  min_requests_per_second: {}\n",
        set.max_avg_response_ms,
        set.max_p95_response_ms,
        set.max_failure_rate * 100.0,
        set.min_requests_per_second
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_load_profile() {
        let profile = WorkloadProfile::load().unwrap();
        let text = render(&profile, &WalleConfig::default());

        assert!(text.starts_with("=== Wall-E Load Test Configuration ===\n"));
        assert!(text.contains("Users: 100\n"));
        assert!(text.contains("Run Time: 10m\n"));
        assert!(text.contains("Host: http://localhost:3000\n"));
        assert!(text.contains("load_new_user (weight 4, wait 2.0-5.0s"));
        assert!(text.contains("max_avg_response_time: 500ms"));
        assert!(text.contains("max_failure_rate: 1%"));
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn test_render_stress_profile_warns() {
        let profile = WorkloadProfile::stress()
            .unwrap()
            .with_host("http://staging:3000");
        let text = render(&profile, &WalleConfig::default());

        assert!(text.contains("Host: http://staging:3000\n"));
        assert!(text.contains("Breaking Point Indicators:"));
        assert!(text.contains("max_p95_response_time: 10000ms"));
        assert!(text.contains("Warning: This test is designed to stress the system"));
    }
}
