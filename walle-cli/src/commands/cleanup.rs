//! `walle cleanup`

use anyhow::Result;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use walle_cleanup::{
    CleanupOptions, CleanupService, CleanupSummary, DatabaseStats, PostgresStore,
};
use walle_config::WalleConfig;

pub async fn execute(config: &WalleConfig, options: &CleanupOptions) -> Result<ExitCode> {
    println!("=== Wall-E Load Test Data Cleanup ===");

    let store = match PostgresStore::connect(&config.database).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Error connecting to database: {}", e);
            println!("Failed to connect to database");
            return Ok(ExitCode::FAILURE);
        }
    };

    if !options.stats_only {
        println!("Cleaning up test data...");
    }

    let service = CleanupService::new(store.clone());
    let result = service.run(options).await;
    store.close().await;

    match result {
        Ok(summary) => {
            print!("{}", render(&summary, options));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Cleanup aborted: {}", e);
            println!("Lost connection to database: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn render(summary: &CleanupSummary, options: &CleanupOptions) -> String {
    let mut out = String::new();

    if !options.stats_only {
        match &summary.users {
            Some(purge) if purge.matched.is_empty() => {
                out.push_str("No test users found to clean up.\n");
            }
            Some(purge) => {
                out.push_str(&format!(
                    "Found {} test users to clean up:\n",
                    purge.matched.len()
                ));
                for email in purge.preview() {
                    out.push_str(&format!("  - {}\n", email));
                }
                if purge.hidden() > 0 {
                    out.push_str(&format!("  ... and {} more\n", purge.hidden()));
                }
                out.push_str(&format!("Deleted {} transactions\n", purge.transactions_deleted));
                out.push_str(&format!("Deleted {} wallets\n", purge.wallets_deleted));
                out.push_str(&format!("Deleted {} users\n", purge.users_deleted));
            }
            None => {}
        }
        if let Some(deleted) = summary.old_transactions_deleted {
            out.push_str(&format!("Deleted {} old test transactions\n", deleted));
        }
        if summary.system_wallet_reset == Some(true) {
            out.push_str("Reset system wallet balance to 0\n");
        }
        for message in &summary.errors {
            out.push_str(&format!("Error during cleanup: {}\n", message));
        }

        out.push_str("\nCleanup completed:\n");
        out.push_str(&format!("  - {} test users removed\n", summary.users_removed()));
        out.push_str(&format!(
            "  - {} old transactions removed\n",
            summary.transactions_removed()
        ));
    }

    if let Some(stats) = &summary.stats {
        out.push_str(&render_stats(stats));
    }
    out
}

fn render_stats(stats: &DatabaseStats) -> String {
    format!(
        "\n=== Database Statistics ===\nUsers: {}\nWallets: {}\nTransactions: {}\nTotal Balance: ${:.2}\n",
        stats.users, stats.wallets, stats.transactions, stats.total_balance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use walle_cleanup::UserPurge;

    #[test]
    fn test_render_truncates_matches() {
        let summary = CleanupSummary {
            users: Some(UserPurge {
                matched: (0..12).map(|i| format!("loadtest.{i}@example.com")).collect(),
                transactions_deleted: 30,
                wallets_deleted: 12,
                users_deleted: 12,
            }),
            old_transactions_deleted: Some(4),
            system_wallet_reset: Some(true),
            stats: Some(DatabaseStats {
                users: 3,
                wallets: 3,
                transactions: 9,
                total_balance: 1234.5,
            }),
            errors: Vec::new(),
        };

        let text = render(&summary, &CleanupOptions::default());

        assert!(text.starts_with("Found 12 test users to clean up:\n"));
        assert!(text.contains("  - loadtest.9@example.com\n"));
        assert!(!text.contains("loadtest.10@example.com"));
        assert!(text.contains("  ... and 2 more\n"));
        assert!(text.contains("Reset system wallet balance to 0\n"));
        assert!(text.contains("  - 12 test users removed\n"));
        assert!(text.contains("  - 4 old transactions removed\n"));
        assert!(text.contains("Total Balance: $1234.50\n"));
    }

    #[test]
    fn test_render_stats_only() {
        let options = CleanupOptions {
            stats_only: true,
            ..CleanupOptions::default()
        };
        let summary = CleanupSummary {
            stats: Some(DatabaseStats::default()),
            ..CleanupSummary::default()
        };

        let text = render(&summary, &options);

        assert!(!text.contains("Cleanup completed"));
        assert!(text.contains("=== Database Statistics ===\nUsers: 0\n"));
    }

    #[test]
    fn test_render_reports_failed_steps() {
        let summary = CleanupSummary {
            users: Some(UserPurge::default()),
            errors: vec!["Query failed: deadlock detected".to_string()],
            ..CleanupSummary::default()
        };

        let text = render(&summary, &CleanupOptions::default());

        assert!(text.contains("No test users found to clean up.\n"));
        assert!(text.contains("Error during cleanup: Query failed: deadlock detected\n"));
        assert!(text.contains("  - 0 old transactions removed\n"));
    }
}
