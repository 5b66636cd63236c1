//! In-memory store for tests
//!
//! Mirrors the three tables the cleanup touches, enforces the foreign keys
//! between them and supports failure injection per operation.

use crate::error::{CleanupError, CleanupResult};
use crate::store::{CleanupStore, CleanupTransaction, DatabaseStats, SyntheticAccount};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupOperation {
    FindUsers,
    DeleteUserTransactions,
    DeleteWallets,
    DeleteUsers,
    DeleteOldTransactions,
    ResetWallet,
    Stats,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct WalletRow {
    pub id: String,
    pub user_id: String,
    pub balance: f64,
}

#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: String,
    pub sender_wallet_id: Option<String>,
    pub receiver_wallet_id: Option<String>,
    pub effected_wallet_id: Option<String>,
    pub description: String,
    pub created_at: NaiveDateTime,
}

impl TransactionRow {
    fn references(&self, wallet_ids: &HashSet<&str>) -> bool {
        [
            &self.sender_wallet_id,
            &self.receiver_wallet_id,
            &self.effected_wallet_id,
        ]
        .into_iter()
        .flatten()
        .any(|id| wallet_ids.contains(id.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<UserRow>,
    wallets: Vec<WalletRow>,
    transactions: Vec<TransactionRow>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    failures: HashSet<CleanupOperation>,
    disconnected: bool,
    log: Vec<CleanupOperation>,
    commits: usize,
    rollbacks: usize,
}

impl MemoryState {
    fn check(&mut self, operation: CleanupOperation) -> CleanupResult<()> {
        if self.disconnected {
            return Err(CleanupError::ConnectionFailed("connection reset".to_string()));
        }
        if self.failures.contains(&operation) {
            return Err(CleanupError::QueryFailed(format!(
                "injected failure on {operation:?}"
            )));
        }
        self.log.push(operation);
        Ok(())
    }
}

/// `CleanupStore` over shared in-memory tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: &str, email: &str, created_at: NaiveDateTime) {
        self.state.lock().tables.users.push(UserRow {
            id: id.to_string(),
            email: email.to_string(),
            created_at,
        });
    }

    pub fn add_wallet(&self, id: &str, user_id: &str, balance: f64) {
        self.state.lock().tables.wallets.push(WalletRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            balance,
        });
    }

    pub fn add_transaction(&self, row: TransactionRow) {
        self.state.lock().tables.transactions.push(row);
    }

    /// Make every later call of `operation` fail with a query error
    pub fn fail_on(&self, operation: CleanupOperation) {
        self.state.lock().failures.insert(operation);
    }

    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    pub fn users(&self) -> Vec<UserRow> {
        self.state.lock().tables.users.clone()
    }

    pub fn wallets(&self) -> Vec<WalletRow> {
        self.state.lock().tables.wallets.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRow> {
        self.state.lock().tables.transactions.clone()
    }

    /// Operations executed so far, including ones later rolled back
    pub fn operations(&self) -> Vec<CleanupOperation> {
        self.state.lock().log.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

#[async_trait]
impl CleanupStore for MemoryStore {
    async fn begin(&self) -> CleanupResult<Box<dyn CleanupTransaction>> {
        let working = {
            let state = self.state.lock();
            if state.disconnected {
                return Err(CleanupError::ConnectionFailed("connection refused".to_string()));
            }
            state.tables.clone()
        };
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            working,
        }))
    }

    async fn stats(&self) -> CleanupResult<DatabaseStats> {
        let mut state = self.state.lock();
        state.check(CleanupOperation::Stats)?;
        let tables = &state.tables;
        Ok(DatabaseStats {
            users: tables.users.len() as i64,
            wallets: tables.wallets.len() as i64,
            transactions: tables.transactions.len() as i64,
            total_balance: tables.wallets.iter().map(|w| w.balance).sum(),
        })
    }
}

/// Works on a private copy of the tables until commit
pub struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    working: Tables,
}

impl MemoryTransaction {
    fn check(&self, operation: CleanupOperation) -> CleanupResult<()> {
        self.state.lock().check(operation)
    }

    fn wallet_ids_of(&self, user_ids: &[String]) -> HashSet<String> {
        self.working
            .wallets
            .iter()
            .filter(|w| user_ids.contains(&w.user_id))
            .map(|w| w.id.clone())
            .collect()
    }
}

#[async_trait]
impl CleanupTransaction for MemoryTransaction {
    async fn find_synthetic_users(
        &mut self,
        patterns: &[String],
        created_after: NaiveDateTime,
    ) -> CleanupResult<Vec<SyntheticAccount>> {
        self.check(CleanupOperation::FindUsers)?;
        Ok(self
            .working
            .users
            .iter()
            .filter(|u| matches_any(patterns, &u.email) || u.created_at > created_after)
            .map(|u| SyntheticAccount {
                id: u.id.clone(),
                email: u.email.clone(),
            })
            .collect())
    }

    async fn delete_transactions_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        self.check(CleanupOperation::DeleteUserTransactions)?;
        let owned = self.wallet_ids_of(user_ids);
        let owned: HashSet<&str> = owned.iter().map(String::as_str).collect();
        let before = self.working.transactions.len();
        self.working.transactions.retain(|t| !t.references(&owned));
        Ok((before - self.working.transactions.len()) as u64)
    }

    async fn delete_wallets_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        self.check(CleanupOperation::DeleteWallets)?;
        let doomed = self.wallet_ids_of(user_ids);
        let doomed: HashSet<&str> = doomed.iter().map(String::as_str).collect();
        if self.working.transactions.iter().any(|t| t.references(&doomed)) {
            return Err(CleanupError::QueryFailed(
                "foreign key violation: \"Transaction\" references \"Wallet\"".to_string(),
            ));
        }
        let before = self.working.wallets.len();
        self.working.wallets.retain(|w| !user_ids.contains(&w.user_id));
        Ok((before - self.working.wallets.len()) as u64)
    }

    async fn delete_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        self.check(CleanupOperation::DeleteUsers)?;
        if self.working.wallets.iter().any(|w| user_ids.contains(&w.user_id)) {
            return Err(CleanupError::QueryFailed(
                "foreign key violation: \"Wallet\" references \"User\"".to_string(),
            ));
        }
        let before = self.working.users.len();
        self.working.users.retain(|u| !user_ids.contains(&u.id));
        Ok((before - self.working.users.len()) as u64)
    }

    async fn delete_old_transactions(
        &mut self,
        patterns: &[String],
        created_before: NaiveDateTime,
    ) -> CleanupResult<u64> {
        self.check(CleanupOperation::DeleteOldTransactions)?;
        let before = self.working.transactions.len();
        self.working
            .transactions
            .retain(|t| !(t.created_at < created_before && matches_any(patterns, &t.description)));
        Ok((before - self.working.transactions.len()) as u64)
    }

    async fn reset_wallet_balance(&mut self, email: &str) -> CleanupResult<u64> {
        self.check(CleanupOperation::ResetWallet)?;
        let Some(owner) = self.working.users.iter().find(|u| u.email == email) else {
            return Ok(0);
        };
        let owner = owner.id.clone();
        let mut updated = 0;
        for wallet in self.working.wallets.iter_mut().filter(|w| w.user_id == owner) {
            wallet.balance = 0.0;
            updated += 1;
        }
        Ok(updated)
    }

    async fn commit(self: Box<Self>) -> CleanupResult<()> {
        let MemoryTransaction { state, working } = *self;
        let mut state = state.lock();
        if state.disconnected {
            return Err(CleanupError::TransactionFailed("connection lost".to_string()));
        }
        state.tables = working;
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> CleanupResult<()> {
        self.state.lock().rollbacks += 1;
        Ok(())
    }
}

fn matches_any(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| like(p, text))
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one
pub fn like(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // matched[j]: pattern prefix consumed so far matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for &p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut any = false;
                for j in 0..=text.len() {
                    any |= matched[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && (p == '_' || p == text[j - 1]);
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}
