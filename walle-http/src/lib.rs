//! HTTP client for the Wall-E wallet backend
//!
//! [`WalletApi`] is the seam between the workload model and the network: one
//! method per consumed endpoint, each returning either the decoded payload or
//! an [`HttpError`] naming why the call failed. [`HttpWalletClient`] is the
//! `reqwest` implementation.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{HttpWalletClient, WalletApi};
pub use config::ClientConfig;
pub use errors::{FailureKind, HttpError};
pub use types::{
    AuthToken, BankTransferRequest, BankTransferResponse, Credentials, DepositRequest, Endpoint,
    P2pTransferRequest, PaymentMethod, RegisterOutcome,
};

#[cfg(any(test, feature = "mock"))]
pub use client::MockWalletApi;
