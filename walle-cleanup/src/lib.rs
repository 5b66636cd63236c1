//! Removal of load-test data from the Wall-E database
//!
//! The cleanup runs out-of-band from load runs. It must not run concurrently
//! with a load run against the same accounts.

pub mod error;
pub mod postgres;
pub mod service;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use error::{CleanupError, CleanupResult};
pub use postgres::PostgresStore;
pub use service::{
    CleanupOptions, CleanupPolicy, CleanupService, CleanupSummary, UserPurge, PREVIEW_LIMIT,
    SYSTEM_EMAIL, TRANSACTION_PATTERNS, USER_PATTERNS,
};
pub use store::{CleanupStore, CleanupTransaction, DatabaseStats, SyntheticAccount};
