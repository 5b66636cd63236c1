//! Test doubles for the HTTP seam and the statistics sink
//!
//! Available under `cfg(test)` and with the `testing` feature, so the runtime
//! and the integration tests can drive journeys without a backend.

use crate::stats::{RecordedOutcome, RequestSample, SkipReason, StatsSink};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use walle_http::{
    AuthToken, BankTransferRequest, BankTransferResponse, Credentials, DepositRequest, Endpoint,
    HttpError, P2pTransferRequest, RegisterOutcome, WalletApi,
};

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<Endpoint>,
    failures: HashMap<Endpoint, HttpError>,
    accounts: HashSet<String>,
    balance: f64,
    bank_rejection: Option<String>,
    transfers: u64,
}

/// In-memory wallet backend with per-endpoint failure switches
///
/// Emails register once; a second registration answers `AlreadyExists`.
/// The balance is shared by every caller.
#[derive(Debug)]
pub struct ScriptedApi {
    deposit_endpoint: Endpoint,
    state: Mutex<ScriptState>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            deposit_endpoint: Endpoint::ManualTopUp,
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub fn with_deposit_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.deposit_endpoint = endpoint;
        self
    }

    /// Builder form of [`ScriptedApi::fail_with_status`]
    pub fn failing(self, endpoint: Endpoint, status: u16) -> Self {
        self.fail_with_status(endpoint, status);
        self
    }

    pub fn fail(&self, endpoint: Endpoint, error: HttpError) {
        self.state.lock().failures.insert(endpoint, error);
    }

    pub fn fail_with_status(&self, endpoint: Endpoint, status: u16) {
        self.fail(endpoint, HttpError::unexpected_status(status, "scripted failure"));
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state.lock().failures.remove(&endpoint);
    }

    pub fn set_balance(&self, balance: f64) {
        self.state.lock().balance = balance;
    }

    pub fn balance(&self) -> f64 {
        self.state.lock().balance
    }

    /// Answer bank transfers with `200 {success: false}`
    pub fn reject_bank_transfers(&self, reason: &str) {
        self.state.lock().bank_rejection = Some(reason.to_string());
    }

    /// Mark an email as already registered
    pub fn preregister(&self, email: &str) {
        self.state.lock().accounts.insert(email.to_string());
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == endpoint)
            .count()
    }

    pub fn is_registered(&self, email: &str) -> bool {
        self.state.lock().accounts.contains(email)
    }

    fn begin(&self, endpoint: Endpoint) -> Result<parking_lot::MutexGuard<'_, ScriptState>, HttpError> {
        let mut state = self.state.lock();
        state.calls.push(endpoint);
        if let Some(error) = state.failures.get(&endpoint).cloned() {
            return Err(error);
        }
        Ok(state)
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), HttpError> {
        self.begin(endpoint).map(drop)
    }

    fn register_email(&self, email: &str) -> Result<RegisterOutcome, HttpError> {
        let mut state = self.begin(Endpoint::Register)?;
        if state.accounts.insert(email.to_string()) {
            Ok(RegisterOutcome::Created)
        } else {
            Ok(RegisterOutcome::AlreadyExists)
        }
    }
}

#[async_trait::async_trait]
impl WalletApi for ScriptedApi {
    async fn register(&self, credentials: &Credentials) -> Result<RegisterOutcome, HttpError> {
        self.register_email(&credentials.email)
    }

    async fn register_with_alias(
        &self,
        credentials: &Credentials,
        _alias: &str,
    ) -> Result<RegisterOutcome, HttpError> {
        self.register_email(&credentials.email)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, HttpError> {
        self.check(Endpoint::Login)?;
        Ok(AuthToken::new(format!("token-{}", credentials.email)))
    }

    async fn balance(&self, _token: &AuthToken) -> Result<f64, HttpError> {
        Ok(self.begin(Endpoint::Balance)?.balance)
    }

    async fn deposit(&self, _token: &AuthToken, request: &DepositRequest) -> Result<(), HttpError> {
        self.begin(self.deposit_endpoint)?.balance += request.amount;
        Ok(())
    }

    async fn request_debin(&self, _token: &AuthToken, _amount: f64) -> Result<(), HttpError> {
        self.check(Endpoint::Debin)?;
        Ok(())
    }

    async fn p2p_transfer(
        &self,
        _token: &AuthToken,
        request: &P2pTransferRequest,
    ) -> Result<(), HttpError> {
        let mut state = self.begin(Endpoint::P2pTransfer)?;
        state.balance = (state.balance - request.amount).max(0.0);
        Ok(())
    }

    async fn transactions(&self, _token: &AuthToken) -> Result<(), HttpError> {
        self.check(Endpoint::Transactions)?;
        Ok(())
    }

    async fn bank_transfer(
        &self,
        _request: &BankTransferRequest,
    ) -> Result<BankTransferResponse, HttpError> {
        let mut state = self.begin(Endpoint::BankTransfer)?;
        if let Some(reason) = state.bank_rejection.clone() {
            return Ok(BankTransferResponse {
                success: false,
                error: Some(reason),
                transaction_id: None,
            });
        }
        state.transfers += 1;
        Ok(BankTransferResponse {
            success: true,
            error: None,
            transaction_id: Some(format!("tx-{}", state.transfers)),
        })
    }

    fn deposit_endpoint(&self) -> Endpoint {
        self.deposit_endpoint
    }
}

/// [`StatsSink`] that keeps every sample and skip in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    samples: Mutex<Vec<RequestSample>>,
    skips: Mutex<Vec<(Endpoint, SkipReason)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<RequestSample> {
        self.samples.lock().clone()
    }

    pub fn skips(&self) -> Vec<(Endpoint, SkipReason)> {
        self.skips.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn failure_count(&self) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.outcome.is_failure())
            .count()
    }

    pub fn tolerated_count(&self) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| matches!(s.outcome, RecordedOutcome::Tolerated { .. }))
            .count()
    }

    /// Samples recorded against `endpoint`
    pub fn for_endpoint(&self, endpoint: Endpoint) -> Vec<RequestSample> {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.endpoint == endpoint)
            .cloned()
            .collect()
    }
}

impl StatsSink for RecordingSink {
    fn record(&self, sample: RequestSample) {
        self.samples.lock().push(sample);
    }

    fn record_skip(&self, endpoint: Endpoint, reason: SkipReason) {
        self.skips.lock().push((endpoint, reason));
    }
}
