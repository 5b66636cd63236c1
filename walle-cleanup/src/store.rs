//! Storage seam of the cleanup utility

use crate::error::CleanupResult;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Account selected for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticAccount {
    pub id: String,
    pub email: String,
}

/// Read-only row counts and balance total
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub users: i64,
    pub wallets: i64,
    pub transactions: i64,
    pub total_balance: f64,
}

#[async_trait]
pub trait CleanupStore: Send + Sync {
    async fn begin(&self) -> CleanupResult<Box<dyn CleanupTransaction>>;

    async fn stats(&self) -> CleanupResult<DatabaseStats>;
}

/// One database transaction
///
/// Patterns use SQL `LIKE` syntax. Nothing is visible outside the transaction
/// until [`CleanupTransaction::commit`].
#[async_trait]
pub trait CleanupTransaction: Send {
    /// Accounts whose email matches any pattern or created after `created_after`
    async fn find_synthetic_users(
        &mut self,
        patterns: &[String],
        created_after: NaiveDateTime,
    ) -> CleanupResult<Vec<SyntheticAccount>>;

    /// Transactions touching the users' wallets as sender, receiver or effected wallet
    async fn delete_transactions_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64>;

    async fn delete_wallets_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64>;

    async fn delete_users(&mut self, user_ids: &[String]) -> CleanupResult<u64>;

    /// Transactions older than `created_before` whose description matches any pattern
    async fn delete_old_transactions(
        &mut self,
        patterns: &[String],
        created_before: NaiveDateTime,
    ) -> CleanupResult<u64>;

    /// Zero the balance of the wallet owned by `email`
    async fn reset_wallet_balance(&mut self, email: &str) -> CleanupResult<u64>;

    async fn commit(self: Box<Self>) -> CleanupResult<()>;

    async fn rollback(self: Box<Self>) -> CleanupResult<()>;
}
