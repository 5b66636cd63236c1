//! PostgreSQL store over the wallet backend's schema

use crate::error::{CleanupError, CleanupResult};
use crate::store::{CleanupStore, CleanupTransaction, DatabaseStats, SyntheticAccount};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};
use walle_config::domains::database::DatabaseConfig;

const SELECT_SYNTHETIC_USERS: &str = r#"
    SELECT id, email FROM "User"
    WHERE email LIKE ANY($1) OR "createdAt" > $2
"#;

const DELETE_USER_TRANSACTIONS: &str = r#"
    DELETE FROM "Transaction"
    WHERE "senderWalletId" IN (SELECT id FROM "Wallet" WHERE "userId" = ANY($1))
       OR "receiverWalletId" IN (SELECT id FROM "Wallet" WHERE "userId" = ANY($1))
       OR "effectedWalletId" IN (SELECT id FROM "Wallet" WHERE "userId" = ANY($1))
"#;

const DELETE_USER_WALLETS: &str = r#"DELETE FROM "Wallet" WHERE "userId" = ANY($1)"#;

const DELETE_USERS: &str = r#"DELETE FROM "User" WHERE id = ANY($1)"#;

const DELETE_OLD_TRANSACTIONS: &str = r#"
    DELETE FROM "Transaction"
    WHERE "createdAt" < $1 AND description LIKE ANY($2)
"#;

const RESET_WALLET_BALANCE: &str = r#"
    UPDATE "Wallet" SET balance = 0
    WHERE "userId" = (SELECT id FROM "User" WHERE email = $1)
"#;

const DATABASE_STATS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM "User"),
        (SELECT COUNT(*) FROM "Wallet"),
        (SELECT COUNT(*) FROM "Transaction"),
        (SELECT COALESCE(SUM(balance), 0)::float8 FROM "Wallet")
"#;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a pool; any failure here is a connection failure
    pub async fn connect(config: &DatabaseConfig) -> CleanupResult<Self> {
        info!("Connecting to {}", config.redacted_url());

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .connect_with(options)
            .await
            .map_err(|e| CleanupError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CleanupStore for PostgresStore {
    async fn begin(&self) -> CleanupResult<Box<dyn CleanupTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn stats(&self) -> CleanupResult<DatabaseStats> {
        let (users, wallets, transactions, total_balance): (i64, i64, i64, f64) =
            sqlx::query_as(DATABASE_STATS).fetch_one(&self.pool).await?;

        Ok(DatabaseStats {
            users,
            wallets,
            transactions,
            total_balance,
        })
    }
}

pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CleanupTransaction for PostgresTransaction {
    async fn find_synthetic_users(
        &mut self,
        patterns: &[String],
        created_after: NaiveDateTime,
    ) -> CleanupResult<Vec<SyntheticAccount>> {
        let rows: Vec<(String, String)> = sqlx::query_as(SELECT_SYNTHETIC_USERS)
            .bind(patterns)
            .bind(created_after)
            .fetch_all(&mut *self.tx)
            .await?;

        debug!("Matched {} synthetic users", rows.len());
        Ok(rows
            .into_iter()
            .map(|(id, email)| SyntheticAccount { id, email })
            .collect())
    }

    async fn delete_transactions_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        let result = sqlx::query(DELETE_USER_TRANSACTIONS)
            .bind(user_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_wallets_for_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        let result = sqlx::query(DELETE_USER_WALLETS)
            .bind(user_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_users(&mut self, user_ids: &[String]) -> CleanupResult<u64> {
        let result = sqlx::query(DELETE_USERS)
            .bind(user_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_old_transactions(
        &mut self,
        patterns: &[String],
        created_before: NaiveDateTime,
    ) -> CleanupResult<u64> {
        let result = sqlx::query(DELETE_OLD_TRANSACTIONS)
            .bind(created_before)
            .bind(patterns)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reset_wallet_balance(&mut self, email: &str) -> CleanupResult<u64> {
        let result = sqlx::query(RESET_WALLET_BALANCE)
            .bind(email)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> CleanupResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| CleanupError::TransactionFailed(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> CleanupResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| CleanupError::TransactionFailed(e.to_string()))
    }
}
