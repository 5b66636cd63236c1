//! HTTP client implementation

use crate::config::ClientConfig;
use crate::errors::HttpError;
use crate::types::{
    AuthToken, BankTransferRequest, BankTransferResponse, Credentials, DebinRequest,
    DepositRequest, Endpoint, P2pTransferRequest, RegisterOutcome,
};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

/// Calls against the wallet backend and the external bank simulator
///
/// Every method resolves once the response has been fully read, so a caller
/// never has two requests of the same virtual user in flight.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait WalletApi: Send + Sync {
    /// `POST /auth/register`
    async fn register(&self, credentials: &Credentials) -> Result<RegisterOutcome, HttpError>;

    /// `POST /auth/register` with an explicit alias
    async fn register_with_alias(
        &self,
        credentials: &Credentials,
        alias: &str,
    ) -> Result<RegisterOutcome, HttpError>;

    /// `POST /auth/login`, returning the `access_token` cookie
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, HttpError>;

    /// `GET /wallet/balance`
    async fn balance(&self, token: &AuthToken) -> Result<f64, HttpError>;

    /// `POST /wallet/topup/manual` or `POST /wallet/deposit`
    async fn deposit(&self, token: &AuthToken, request: &DepositRequest) -> Result<(), HttpError>;

    /// `POST /wallet/topup/debin`
    async fn request_debin(&self, token: &AuthToken, amount: f64) -> Result<(), HttpError>;

    /// `POST /transactions/p2p`
    async fn p2p_transfer(
        &self,
        token: &AuthToken,
        request: &P2pTransferRequest,
    ) -> Result<(), HttpError>;

    /// `GET /transactions`
    async fn transactions(&self, token: &AuthToken) -> Result<(), HttpError>;

    /// `POST /api/transfer` on the external bank simulator
    async fn bank_transfer(
        &self,
        request: &BankTransferRequest,
    ) -> Result<BankTransferResponse, HttpError>;

    /// Endpoint used by [`WalletApi::deposit`]
    fn deposit_endpoint(&self) -> Endpoint;
}

/// `reqwest` implementation of [`WalletApi`]
///
/// One connection pool is shared by every virtual user. The client keeps no
/// cookie store: each call carries its user's token explicitly.
#[derive(Debug, Clone)]
pub struct HttpWalletClient {
    client: Client,
    config: ClientConfig,
}

impl HttpWalletClient {
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        debug!(
            "Creating wallet client for {} with {}s timeout",
            config.base_url,
            config.timeout.as_secs()
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url, HttpError> {
        let base = match endpoint {
            Endpoint::BankTransfer => &self.config.bank_url,
            _ => &self.config.base_url,
        };
        Ok(base.join(endpoint.path())?)
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        token: Option<&AuthToken>,
        body: &B,
    ) -> Result<RequestBuilder, HttpError> {
        let request = self.client.post(self.url(endpoint)?).json(body);
        Ok(with_token(request, token))
    }

    fn get(&self, endpoint: Endpoint, token: &AuthToken) -> Result<RequestBuilder, HttpError> {
        let request = self.client.get(self.url(endpoint)?);
        Ok(with_token(request, Some(token)))
    }

    /// Send and require the endpoint's success status
    async fn send(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<Response, HttpError> {
        debug!("Sending request to {}", endpoint);
        let response = request.send().await?;
        let status = response.status().as_u16();

        if status != endpoint.expected_status() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} answered {} (expected {})", endpoint, status, endpoint.expected_status());
            return Err(HttpError::unexpected_status(status, &body));
        }

        Ok(response)
    }

    /// Drain the body so the connection returns to the pool
    async fn send_and_discard(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<(), HttpError> {
        let response = self.send(endpoint, request).await?;
        response.bytes().await?;
        Ok(())
    }

    async fn register_body(&self, body: JsonValue) -> Result<RegisterOutcome, HttpError> {
        let request = self.post(Endpoint::Register, None, &body)?;
        match self.send(Endpoint::Register, request).await {
            Ok(response) => {
                response.bytes().await?;
                Ok(RegisterOutcome::Created)
            }
            Err(HttpError::UnexpectedStatus { status: 409, .. }) => Ok(RegisterOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }
}

fn with_token(request: RequestBuilder, token: Option<&AuthToken>) -> RequestBuilder {
    match token {
        Some(token) => request.header(header::COOKIE, token.cookie_header()),
        None => request,
    }
}

/// Read `balance` from `{ "balance": ... }`; decimal columns may arrive as strings
pub(crate) fn parse_balance(body: &str) -> Result<f64, HttpError> {
    let value: JsonValue = serde_json::from_str(body)?;
    let balance = value
        .get("balance")
        .ok_or_else(|| HttpError::PayloadParse("response has no balance field".to_string()))?;

    let amount = match balance {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        JsonValue::Null => Some(0.0),
        _ => None,
    };

    amount
        .filter(|v| v.is_finite())
        .ok_or_else(|| HttpError::PayloadParse(format!("balance is not a number: {}", balance)))
}

#[async_trait::async_trait]
impl WalletApi for HttpWalletClient {
    async fn register(&self, credentials: &Credentials) -> Result<RegisterOutcome, HttpError> {
        self.register_body(json!({
            "email": credentials.email,
            "password": credentials.password,
        }))
        .await
    }

    async fn register_with_alias(
        &self,
        credentials: &Credentials,
        alias: &str,
    ) -> Result<RegisterOutcome, HttpError> {
        self.register_body(json!({
            "email": credentials.email,
            "password": credentials.password,
            "alias": alias,
        }))
        .await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, HttpError> {
        let request = self.post(Endpoint::Login, None, credentials)?;
        let response = self.send(Endpoint::Login, request).await?;

        let token = response
            .cookies()
            .find(|cookie| cookie.name() == "access_token")
            .map(|cookie| AuthToken::new(cookie.value()));
        response.bytes().await?;

        token.ok_or_else(|| HttpError::PayloadParse("No auth token in response cookies".to_string()))
    }

    async fn balance(&self, token: &AuthToken) -> Result<f64, HttpError> {
        let request = self.get(Endpoint::Balance, token)?;
        let response = self.send(Endpoint::Balance, request).await?;
        let body = response.text().await?;
        parse_balance(&body)
    }

    async fn deposit(&self, token: &AuthToken, request: &DepositRequest) -> Result<(), HttpError> {
        let endpoint = self.deposit_endpoint();
        let builder = self.post(endpoint, Some(token), request)?;
        self.send_and_discard(endpoint, builder).await
    }

    async fn request_debin(&self, token: &AuthToken, amount: f64) -> Result<(), HttpError> {
        let builder = self.post(Endpoint::Debin, Some(token), &DebinRequest { amount })?;
        self.send_and_discard(Endpoint::Debin, builder).await
    }

    async fn p2p_transfer(
        &self,
        token: &AuthToken,
        request: &P2pTransferRequest,
    ) -> Result<(), HttpError> {
        let builder = self.post(Endpoint::P2pTransfer, Some(token), request)?;
        self.send_and_discard(Endpoint::P2pTransfer, builder).await
    }

    async fn transactions(&self, token: &AuthToken) -> Result<(), HttpError> {
        let builder = self.get(Endpoint::Transactions, token)?;
        self.send_and_discard(Endpoint::Transactions, builder).await
    }

    async fn bank_transfer(
        &self,
        request: &BankTransferRequest,
    ) -> Result<BankTransferResponse, HttpError> {
        let builder = self.post(Endpoint::BankTransfer, None, request)?;
        let response = self.send(Endpoint::BankTransfer, builder).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(BankTransferResponse {
                success: true,
                ..BankTransferResponse::default()
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn deposit_endpoint(&self) -> Endpoint {
        self.config.deposit_endpoint.into()
    }
}
