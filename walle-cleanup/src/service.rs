//! Cleanup operations, each in its own transaction

use crate::error::CleanupResult;
use crate::store::{CleanupStore, CleanupTransaction, DatabaseStats};
use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Email substrings of synthetic accounts
pub const USER_PATTERNS: [&str; 4] = ["%@example.%", "%test%", "%faker%", "%locust%"];

/// Description substrings of synthetic transactions
pub const TRANSACTION_PATTERNS: [&str; 4] = ["%test%", "%Test%", "%locust%", "%faker%"];

pub const SYSTEM_EMAIL: &str = "system@walle.internal";

/// Matched identities listed before eliding the rest
pub const PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    pub user_patterns: Vec<String>,
    pub transaction_patterns: Vec<String>,
    pub system_email: String,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            user_patterns: USER_PATTERNS.iter().map(|p| p.to_string()).collect(),
            transaction_patterns: TRANSACTION_PATTERNS.iter().map(|p| p.to_string()).collect(),
            system_email: SYSTEM_EMAIL.to_string(),
        }
    }
}

/// Outcome of a user purge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPurge {
    pub matched: Vec<String>,
    pub transactions_deleted: u64,
    pub wallets_deleted: u64,
    pub users_deleted: u64,
}

impl UserPurge {
    pub fn preview(&self) -> &[String] {
        &self.matched[..self.matched.len().min(PREVIEW_LIMIT)]
    }

    /// Matches not shown by [`UserPurge::preview`]
    pub fn hidden(&self) -> usize {
        self.matched.len().saturating_sub(PREVIEW_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Accounts created within this many hours are purged
    pub hours: u32,
    /// Synthetic transactions older than this many days are purged
    pub days: u32,
    pub reset_system_wallet: bool,
    pub stats_only: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            hours: 1,
            days: 7,
            reset_system_wallet: false,
            stats_only: false,
        }
    }
}

/// Everything a full cleanup run did
///
/// `None` means the operation was not requested or failed; failures are
/// listed in `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupSummary {
    pub users: Option<UserPurge>,
    pub old_transactions_deleted: Option<u64>,
    pub system_wallet_reset: Option<bool>,
    pub stats: Option<DatabaseStats>,
    pub errors: Vec<String>,
}

impl CleanupSummary {
    pub fn users_removed(&self) -> u64 {
        self.users.as_ref().map_or(0, |u| u.users_deleted)
    }

    pub fn transactions_removed(&self) -> u64 {
        self.old_transactions_deleted.unwrap_or(0)
    }
}

pub struct CleanupService {
    store: Arc<dyn CleanupStore>,
    policy: CleanupPolicy,
    now: Option<NaiveDateTime>,
}

impl CleanupService {
    pub fn new(store: Arc<dyn CleanupStore>) -> Self {
        Self {
            store,
            policy: CleanupPolicy::default(),
            now: None,
        }
    }

    pub fn with_policy(mut self, policy: CleanupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pin the clock the age cutoffs are computed from
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Utc::now().naive_utc())
    }

    /// Delete synthetic accounts with their wallets and transactions
    ///
    /// Selects by identity pattern or creation within the last `hours`, then
    /// deletes transactions, wallets and accounts in that order. Any failing
    /// step rolls the whole purge back.
    pub async fn purge_synthetic_users(&self, hours: u32) -> CleanupResult<UserPurge> {
        let cutoff = self.now() - Duration::hours(i64::from(hours));
        let mut tx = self.store.begin().await?;
        let result = self.purge_users_in(tx.as_mut(), cutoff).await;
        settle(tx, result, "user cleanup").await
    }

    async fn purge_users_in(
        &self,
        tx: &mut dyn CleanupTransaction,
        cutoff: NaiveDateTime,
    ) -> CleanupResult<UserPurge> {
        let accounts = tx
            .find_synthetic_users(&self.policy.user_patterns, cutoff)
            .await?;
        if accounts.is_empty() {
            info!("No test users found to clean up");
            return Ok(UserPurge::default());
        }
        info!("Found {} test users to clean up", accounts.len());

        let ids: Vec<String> = accounts.iter().map(|a| a.id.clone()).collect();

        let transactions_deleted = tx.delete_transactions_for_users(&ids).await?;
        info!("Deleted {} transactions", transactions_deleted);

        let wallets_deleted = tx.delete_wallets_for_users(&ids).await?;
        info!("Deleted {} wallets", wallets_deleted);

        let users_deleted = tx.delete_users(&ids).await?;
        info!("Deleted {} users", users_deleted);

        Ok(UserPurge {
            matched: accounts.into_iter().map(|a| a.email).collect(),
            transactions_deleted,
            wallets_deleted,
            users_deleted,
        })
    }

    /// Delete synthetic transactions older than `days`, whoever owns them
    pub async fn purge_old_test_transactions(&self, days: u32) -> CleanupResult<u64> {
        let cutoff = self.now() - Duration::days(i64::from(days));
        let mut tx = self.store.begin().await?;
        let result = tx
            .delete_old_transactions(&self.policy.transaction_patterns, cutoff)
            .await;
        let deleted = settle(tx, result, "transaction cleanup").await?;
        info!("Deleted {} old test transactions", deleted);
        Ok(deleted)
    }

    /// Zero the system account's balance; true when a wallet was updated
    pub async fn reset_system_wallet(&self) -> CleanupResult<bool> {
        let mut tx = self.store.begin().await?;
        let result = tx.reset_wallet_balance(&self.policy.system_email).await;
        let updated = settle(tx, result, "system wallet reset").await?;
        if updated > 0 {
            info!("Reset system wallet balance to 0");
        } else {
            warn!("System account {} has no wallet", self.policy.system_email);
        }
        Ok(updated > 0)
    }

    pub async fn database_stats(&self) -> CleanupResult<DatabaseStats> {
        self.store.stats().await
    }

    /// Full cleanup: users, old transactions, optional reset, then statistics
    ///
    /// A failed operation is recorded and the run moves on; losing the
    /// connection ends the run with an error.
    pub async fn run(&self, options: &CleanupOptions) -> CleanupResult<CleanupSummary> {
        let mut summary = CleanupSummary::default();

        if !options.stats_only {
            summary.users = absorb(
                self.purge_synthetic_users(options.hours).await,
                &mut summary.errors,
            )?;
            summary.old_transactions_deleted = absorb(
                self.purge_old_test_transactions(options.days).await,
                &mut summary.errors,
            )?;
            if options.reset_system_wallet {
                summary.system_wallet_reset = absorb(
                    self.reset_system_wallet().await,
                    &mut summary.errors,
                )?;
            }
        }

        summary.stats = absorb(self.database_stats().await, &mut summary.errors)?;
        Ok(summary)
    }
}

async fn settle<T>(
    tx: Box<dyn CleanupTransaction>,
    result: CleanupResult<T>,
    operation: &str,
) -> CleanupResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            error!("Error during {}: {}; rolling back", operation, e);
            if let Err(rollback) = tx.rollback().await {
                error!("Rollback of {} failed: {}", operation, rollback);
            }
            Err(e)
        }
    }
}

fn absorb<T>(result: CleanupResult<T>, errors: &mut Vec<String>) -> CleanupResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_connection_error() => Err(e),
        Err(e) => {
            errors.push(e.to_string());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CleanupOperation, MemoryStore, TransactionRow};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn transfer(id: &str, sender: &str, receiver: &str, created_at: NaiveDateTime) -> TransactionRow {
        TransactionRow {
            id: id.to_string(),
            sender_wallet_id: Some(sender.to_string()),
            receiver_wallet_id: Some(receiver.to_string()),
            effected_wallet_id: None,
            description: "P2P transfer".to_string(),
            created_at,
        }
    }

    /// One synthetic user with a wallet, sending to and receiving from a real user
    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_user("u-real", "ana@walle.com", at(1, 9));
        store.add_wallet("w-real", "u-real", 300.0);
        store.add_user("u-synth", "loadtest.17.1.00ab@example.com", at(1, 9));
        store.add_wallet("w-synth", "u-synth", 100.0);
        store.add_transaction(transfer("t1", "w-synth", "w-real", at(1, 10)));
        store.add_transaction(transfer("t2", "w-real", "w-synth", at(1, 11)));
        store
    }

    fn service(store: &MemoryStore) -> CleanupService {
        CleanupService::new(Arc::new(store.clone())).at(at(10, 12))
    }

    #[tokio::test]
    async fn test_user_purge_deletes_in_referential_order() {
        let store = seeded_store();

        let purge = service(&store).purge_synthetic_users(1).await.unwrap();

        assert_eq!(purge.matched, vec!["loadtest.17.1.00ab@example.com".to_string()]);
        assert_eq!(purge.transactions_deleted, 2);
        assert_eq!(purge.wallets_deleted, 1);
        assert_eq!(purge.users_deleted, 1);
        assert_eq!(
            store.operations(),
            vec![
                CleanupOperation::FindUsers,
                CleanupOperation::DeleteUserTransactions,
                CleanupOperation::DeleteWallets,
                CleanupOperation::DeleteUsers,
            ]
        );
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.wallets().len(), 1);
        assert!(store.transactions().is_empty());
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn test_failed_wallet_deletion_rolls_back_everything() {
        let store = seeded_store();
        store.fail_on(CleanupOperation::DeleteWallets);

        let result = service(&store).purge_synthetic_users(1).await;

        assert!(result.is_err());
        assert_eq!(store.users().len(), 2);
        assert_eq!(store.wallets().len(), 2);
        assert_eq!(store.transactions().len(), 2);
        assert_eq!(store.commits(), 0);
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_recently_created_accounts_match_without_pattern() {
        let store = seeded_store();
        store.add_user("u-new", "maria@walle.com", at(10, 11));

        let purge = service(&store).purge_synthetic_users(2).await.unwrap();

        assert_eq!(purge.users_deleted, 2);
        assert!(purge.matched.contains(&"maria@walle.com".to_string()));
        assert!(store.users().iter().all(|u| u.id == "u-real"));
    }

    #[tokio::test]
    async fn test_effected_wallet_role_is_purged() {
        let store = seeded_store();
        store.add_transaction(TransactionRow {
            id: "t3".to_string(),
            sender_wallet_id: Some("w-real".to_string()),
            receiver_wallet_id: None,
            effected_wallet_id: Some("w-synth".to_string()),
            description: "DEBIN".to_string(),
            created_at: at(2, 8),
        });

        let purge = service(&store).purge_synthetic_users(1).await.unwrap();

        assert_eq!(purge.transactions_deleted, 3);
    }

    #[tokio::test]
    async fn test_empty_purge_touches_nothing() {
        let store = MemoryStore::new();
        store.add_user("u-real", "ana@walle.com", at(1, 9));

        let purge = service(&store).purge_synthetic_users(1).await.unwrap();

        assert_eq!(purge, UserPurge::default());
        assert_eq!(store.operations(), vec![CleanupOperation::FindUsers]);
    }

    #[tokio::test]
    async fn test_old_transaction_purge_honours_age_and_pattern() {
        let store = MemoryStore::new();
        let mut old_test = transfer("old-test", "a", "b", at(1, 0));
        old_test.description = "locust transfer".to_string();
        let mut recent_test = transfer("recent-test", "a", "b", at(9, 0));
        recent_test.description = "Test payment".to_string();
        let old_real = transfer("old-real", "a", "b", at(1, 0));
        store.add_transaction(old_test);
        store.add_transaction(recent_test);
        store.add_transaction(old_real);

        let deleted = service(&store).purge_old_test_transactions(7).await.unwrap();

        assert_eq!(deleted, 1);
        let ids: Vec<String> = store.transactions().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["recent-test".to_string(), "old-real".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_system_wallet() {
        let store = MemoryStore::new();
        store.add_user("u-sys", SYSTEM_EMAIL, at(1, 0));
        store.add_wallet("w-sys", "u-sys", 12_500.0);

        assert!(service(&store).reset_system_wallet().await.unwrap());
        assert_eq!(store.wallets()[0].balance, 0.0);

        let empty = MemoryStore::new();
        assert!(!service(&empty).reset_system_wallet().await.unwrap());
    }

    #[test]
    fn test_preview_lists_first_ten() {
        let purge = UserPurge {
            matched: (0..13).map(|i| format!("user{i}@example.com")).collect(),
            ..UserPurge::default()
        };
        assert_eq!(purge.preview().len(), 10);
        assert_eq!(purge.hidden(), 3);
    }

    #[tokio::test]
    async fn test_run_continues_past_query_failures() {
        let store = seeded_store();
        store.fail_on(CleanupOperation::DeleteOldTransactions);

        let summary = service(&store)
            .run(&CleanupOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.users_removed(), 1);
        assert_eq!(summary.old_transactions_deleted, None);
        assert_eq!(summary.errors.len(), 1);
        let stats = summary.stats.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.wallets, 1);
        assert_eq!(stats.total_balance, 300.0);
    }

    #[tokio::test]
    async fn test_run_stops_on_connection_loss() {
        let store = seeded_store();
        store.disconnect();

        let err = service(&store)
            .run(&CleanupOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_stats_only_is_read_only() {
        let store = seeded_store();
        let options = CleanupOptions {
            stats_only: true,
            ..CleanupOptions::default()
        };

        let summary = service(&store).run(&options).await.unwrap();

        assert!(summary.users.is_none());
        assert_eq!(summary.stats.unwrap().transactions, 2);
        assert_eq!(store.operations(), vec![CleanupOperation::Stats]);
    }
}
