//! Wire types of the wallet backend and external bank APIs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Email/password pair used for registration and login
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Opaque value of the `access_token` cookie
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Cookie` header value carrying the token
    pub fn cookie_header(&self) -> String {
        format!("access_token={}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(***)")
    }
}

/// Result of `POST /auth/register`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    /// 409: the email or alias is already taken
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankAccount,
    CreditCard,
    DebitCard,
}

/// Body of the manual top-up / deposit endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub amount: f64,
    pub method: PaymentMethod,
    pub source_identifier: String,
}

impl DepositRequest {
    pub fn bank_account(amount: f64, source_identifier: impl Into<String>) -> Self {
        Self {
            amount,
            method: PaymentMethod::BankAccount,
            source_identifier: source_identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebinRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct P2pTransferRequest {
    pub recipient_identifier: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankTransferRequest {
    pub amount: f64,
    pub alias: String,
    pub source: String,
}

/// Response of the external bank simulator's transfer endpoint
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankTransferResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    pub error: Option<String>,
    pub transaction_id: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Endpoints consumed by the harness, with the status each must answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    Balance,
    ManualTopUp,
    Deposit,
    Debin,
    P2pTransfer,
    Transactions,
    BankTransfer,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Register => "/auth/register",
            Endpoint::Login => "/auth/login",
            Endpoint::Balance => "/wallet/balance",
            Endpoint::ManualTopUp => "/wallet/topup/manual",
            Endpoint::Deposit => "/wallet/deposit",
            Endpoint::Debin => "/wallet/topup/debin",
            Endpoint::P2pTransfer => "/transactions/p2p",
            Endpoint::Transactions => "/transactions",
            Endpoint::BankTransfer => "/api/transfer",
        }
    }

    pub fn expected_status(&self) -> u16 {
        match self {
            Endpoint::Register
            | Endpoint::ManualTopUp
            | Endpoint::Deposit
            | Endpoint::Debin
            | Endpoint::P2pTransfer => 201,
            Endpoint::Login | Endpoint::Balance | Endpoint::Transactions | Endpoint::BankTransfer => {
                200
            }
        }
    }
}

impl From<walle_config::DepositEndpoint> for Endpoint {
    fn from(endpoint: walle_config::DepositEndpoint) -> Self {
        match endpoint {
            walle_config::DepositEndpoint::Manual => Endpoint::ManualTopUp,
            walle_config::DepositEndpoint::Deposit => Endpoint::Deposit,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deposit_request_wire_format() {
        let request = DepositRequest::bank_account(100.0, "BANK_12345678");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"amount": 100.0, "method": "BANK_ACCOUNT", "sourceIdentifier": "BANK_12345678"})
        );
    }

    #[test]
    fn test_p2p_request_wire_format() {
        let request = P2pTransferRequest {
            recipient_identifier: "bob@example.com".to_string(),
            amount: 12.5,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"recipientIdentifier": "bob@example.com", "amount": 12.5})
        );
    }

    #[test]
    fn test_bank_response_defaults_to_success() {
        let response: BankTransferResponse =
            serde_json::from_value(json!({"transactionId": "tx-1"})).unwrap();
        assert!(response.success);
        assert_eq!(response.transaction_id.as_deref(), Some("tx-1"));

        let rejected: BankTransferResponse =
            serde_json::from_value(json!({"success": false, "error": "no funds"})).unwrap();
        assert!(!rejected.success);
    }

    #[test]
    fn test_secrets_hidden_from_debug() {
        let credentials = Credentials::new("a@example.com", "TestPassword123!");
        assert!(!format!("{:?}", credentials).contains("TestPassword"));
        assert_eq!(format!("{:?}", AuthToken::new("jwt")), "AuthToken(***)");
        assert_eq!(AuthToken::new("jwt").cookie_header(), "access_token=jwt");
    }

    #[test]
    fn test_expected_statuses() {
        assert_eq!(Endpoint::Register.expected_status(), 201);
        assert_eq!(Endpoint::Login.expected_status(), 200);
        assert_eq!(Endpoint::Debin.expected_status(), 201);
        assert_eq!(Endpoint::BankTransfer.expected_status(), 200);
        assert_eq!(
            Endpoint::from(walle_config::DepositEndpoint::Deposit).path(),
            "/wallet/deposit"
        );
    }
}
