//! Synthetic user state and the HTTP step helpers acting on it

use crate::amount::{AmountRange, TransferPolicy};
use crate::identity::{Identity, IdentityGenerator};
use crate::stats::{RecordedOutcome, RequestSample, SkipReason, StatsSink};
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use walle_config::ExternalBankConfig;
use walle_http::{
    AuthToken, BankTransferRequest, Credentials, DepositRequest, Endpoint, FailureKind, HttpError,
    P2pTransferRequest, RegisterOutcome, WalletApi,
};

/// Collaborators shared by every virtual user of a run
pub struct WorkloadContext {
    pub api: Arc<dyn WalletApi>,
    pub sink: Arc<dyn StatsSink>,
    pub identities: Arc<IdentityGenerator>,
    /// Password used for every synthetic account
    pub password: String,
    /// Shared recipient of the external-bank journey
    pub bank: ExternalBankConfig,
}

impl WorkloadContext {
    pub fn new(
        api: Arc<dyn WalletApi>,
        sink: Arc<dyn StatsSink>,
        identities: Arc<IdentityGenerator>,
        password: impl Into<String>,
        bank: ExternalBankConfig,
    ) -> Self {
        Self {
            api,
            sink,
            identities,
            password: password.into(),
            bank,
        }
    }
}

/// Lifecycle state of a virtual user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Unauthenticated,
    /// Logged in, no step executed yet
    Authenticated,
    Active,
}

/// How DEBIN failures are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebinPolicy {
    /// Record failed DEBIN requests as successes (and as tolerated)
    pub tolerate_failures: bool,
    /// Credit the requested amount to the cached balance on success
    pub credit_balance: bool,
}

/// Per-virtual-user record
#[derive(Debug)]
pub struct SyntheticUser {
    identity: Identity,
    credentials: Credentials,
    token: Option<AuthToken>,
    cached_balance: f64,
    state: UserState,
    registered: bool,
    login_attempts_left: u8,
}

impl SyntheticUser {
    pub fn new(identity: Identity, password: &str) -> Self {
        let credentials = Credentials::new(identity.email.clone(), password);
        Self {
            identity,
            credentials,
            token: None,
            cached_balance: 0.0,
            state: UserState::Unauthenticated,
            registered: false,
            login_attempts_left: 0,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn email(&self) -> &str {
        &self.identity.email
    }

    pub fn state(&self) -> UserState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Client-side estimate; the balance endpoint is authoritative
    pub fn cached_balance(&self) -> f64 {
        self.cached_balance
    }

    fn authenticate(&mut self, token: AuthToken) {
        self.token = Some(token);
        if self.state == UserState::Unauthenticated {
            self.state = UserState::Authenticated;
        }
    }

    fn credit(&mut self, amount: f64) {
        self.cached_balance += amount;
    }

    fn debit(&mut self, amount: f64) {
        self.cached_balance = (self.cached_balance - amount).max(0.0);
    }
}

/// A virtual user bound to the run's collaborators and its own rng
///
/// Every helper completes one request before returning, and only touches
/// [`SyntheticUser`] after the response has been read. Dropping a helper's
/// future mid-request leaves the user as it was.
pub struct UserSession {
    ctx: Arc<WorkloadContext>,
    user: SyntheticUser,
    rng: StdRng,
}

impl UserSession {
    pub fn new(ctx: Arc<WorkloadContext>, mut rng: StdRng) -> Self {
        let identity = ctx.identities.next_identity(&mut rng);
        let user = SyntheticUser::new(identity, &ctx.password);
        Self { ctx, user, rng }
    }

    pub fn user(&self) -> &SyntheticUser {
        &self.user
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn context(&self) -> &WorkloadContext {
        &self.ctx
    }

    pub(crate) fn mark_active(&mut self) {
        if self.user.state == UserState::Authenticated {
            self.user.state = UserState::Active;
        }
    }

    /// Register, then log in if registration succeeded
    ///
    /// A failed registration leaves the user unauthenticated for the rest of
    /// the run. A failed login leaves exactly one more attempt to
    /// [`UserSession::ensure_authenticated`].
    pub async fn start(&mut self) {
        let (result, latency) = timed(self.ctx.api.register(&self.user.credentials)).await;
        self.user.registered = self.record_registration(latency, result, "Registration");

        if !self.user.registered {
            warn!(email = %self.user.email(), "Registration failed; user stays unauthenticated");
            return;
        }

        self.user.login_attempts_left = 1;
        if self.login().await {
            self.user.login_attempts_left = 0;
        }
    }

    /// Log in when no token is held and an attempt is left
    pub async fn ensure_authenticated(&mut self) -> bool {
        if self.user.is_authenticated() {
            return true;
        }
        if self.user.login_attempts_left == 0 {
            return false;
        }
        self.user.login_attempts_left -= 1;
        self.login().await
    }

    async fn login(&mut self) -> bool {
        let (result, latency) = timed(self.ctx.api.login(&self.user.credentials)).await;
        match result {
            Ok(token) => {
                self.success(Endpoint::Login, latency);
                self.user.authenticate(token);
                debug!(email = %self.user.email(), "Logged in");
                true
            }
            Err(e) => {
                self.failure(Endpoint::Login, latency, &e, "Login failed");
                false
            }
        }
    }

    /// Token for a gated step; records the skip when there is none
    async fn token_for(&mut self, endpoint: Endpoint) -> Option<AuthToken> {
        if self.ensure_authenticated().await {
            self.user.token.clone()
        } else {
            self.ctx.sink.record_skip(endpoint, SkipReason::Unauthenticated);
            None
        }
    }

    /// Authoritative balance fetch; the cached balance is kept on failure
    pub async fn refresh_balance(&mut self) -> Option<f64> {
        let token = self.token_for(Endpoint::Balance).await?;
        let (result, latency) = timed(self.ctx.api.balance(&token)).await;
        match result {
            Ok(balance) => {
                self.success(Endpoint::Balance, latency);
                self.user.cached_balance = balance.max(0.0);
                Some(self.user.cached_balance)
            }
            Err(e) => {
                self.failure(Endpoint::Balance, latency, &e, "Get balance failed");
                None
            }
        }
    }

    pub async fn deposit_funds(&mut self, amount: f64) -> bool {
        let endpoint = self.ctx.api.deposit_endpoint();
        let Some(token) = self.token_for(endpoint).await else {
            return false;
        };

        let source = self.ctx.identities.source_identifier(&mut self.rng);
        let request = DepositRequest::bank_account(amount, source);
        let (result, latency) = timed(self.ctx.api.deposit(&token, &request)).await;
        match result {
            Ok(()) => {
                self.success(endpoint, latency);
                self.user.credit(amount);
                true
            }
            Err(e) => {
                self.failure(endpoint, latency, &e, "Add money failed");
                false
            }
        }
    }

    pub async fn request_debin(&mut self, amount: f64, policy: DebinPolicy) -> bool {
        let Some(token) = self.token_for(Endpoint::Debin).await else {
            return false;
        };

        let (result, latency) = timed(self.ctx.api.request_debin(&token, amount)).await;
        match result {
            Ok(()) => {
                self.success(Endpoint::Debin, latency);
                if policy.credit_balance {
                    self.user.credit(amount);
                }
                true
            }
            Err(e) if policy.tolerate_failures => {
                warn!(
                    email = %self.user.email(),
                    reason = %e.reason(),
                    "DEBIN request failed; counted as success"
                );
                self.record(
                    Endpoint::Debin,
                    latency,
                    RecordedOutcome::Tolerated {
                        kind: e.kind(),
                        reason: format!("DEBIN request failed: {}", e.reason()),
                    },
                );
                false
            }
            Err(e) => {
                self.failure(Endpoint::Debin, latency, &e, "DEBIN request failed");
                false
            }
        }
    }

    /// Register a throwaway transfer target
    pub async fn spawn_recipient(&mut self) -> Option<String> {
        let identity = self.ctx.identities.next_identity(&mut self.rng);
        let credentials = Credentials::new(identity.email.clone(), self.ctx.password.clone());
        let (result, latency) = timed(self.ctx.api.register(&credentials)).await;

        self.record_registration(latency, result, "Recipient registration")
            .then_some(identity.email)
    }

    /// One P2P transfer sized by `policy`, topping up first when low
    pub async fn transfer(&mut self, policy: &TransferPolicy) -> bool {
        if self.token_for(Endpoint::P2pTransfer).await.is_none() {
            return false;
        }

        if policy.needs_top_up(self.user.cached_balance) {
            self.deposit_funds(policy.top_up_amount).await;
        }

        let Some(amount) = policy.draw(self.user.cached_balance, &mut self.rng) else {
            debug!(
                email = %self.user.email(),
                balance = self.user.cached_balance,
                "Balance too low for a transfer"
            );
            self.ctx
                .sink
                .record_skip(Endpoint::P2pTransfer, SkipReason::InsufficientBalance);
            return false;
        };

        let Some(recipient) = self.spawn_recipient().await else {
            self.ctx
                .sink
                .record_skip(Endpoint::P2pTransfer, SkipReason::NoRecipient);
            return false;
        };

        // Re-read: the top-up above may have been the last login chance
        let Some(token) = self.user.token.clone() else {
            return false;
        };
        let request = P2pTransferRequest {
            recipient_identifier: recipient,
            amount,
        };
        let (result, latency) = timed(self.ctx.api.p2p_transfer(&token, &request)).await;
        match result {
            Ok(()) => {
                self.success(Endpoint::P2pTransfer, latency);
                self.user.debit(amount);
                true
            }
            Err(e) => {
                self.failure(Endpoint::P2pTransfer, latency, &e, "P2P transfer failed");
                false
            }
        }
    }

    pub async fn fetch_history(&mut self) -> bool {
        let Some(token) = self.token_for(Endpoint::Transactions).await else {
            return false;
        };

        let (result, latency) = timed(self.ctx.api.transactions(&token)).await;
        match result {
            Ok(()) => {
                self.success(Endpoint::Transactions, latency);
                true
            }
            Err(e) => {
                self.failure(Endpoint::Transactions, latency, &e, "Get transactions failed");
                false
            }
        }
    }

    /// Transfer through the external bank simulator to the shared recipient
    pub async fn bank_transfer(&mut self, amount: &AmountRange) -> bool {
        if self.token_for(Endpoint::BankTransfer).await.is_none() {
            return false;
        }

        let request = BankTransferRequest {
            amount: amount.sample(&mut self.rng),
            alias: self.ctx.bank.recipient_alias.clone(),
            source: self.ctx.bank.source.clone(),
        };
        let (result, latency) = timed(self.ctx.api.bank_transfer(&request)).await;
        match result {
            Ok(response) if response.success => {
                self.success(Endpoint::BankTransfer, latency);
                true
            }
            Ok(response) => {
                let reason = format!(
                    "Bank transfer rejected: {}",
                    response.error.as_deref().unwrap_or("no reason given")
                );
                warn!(email = %self.user.email(), %reason, "Bank transfer failed");
                self.record(
                    Endpoint::BankTransfer,
                    latency,
                    RecordedOutcome::Failure {
                        kind: FailureKind::Rejected,
                        reason,
                    },
                );
                false
            }
            Err(e) => {
                self.failure(Endpoint::BankTransfer, latency, &e, "Bank transfer failed");
                false
            }
        }
    }

    /// Only `201 Created` counts as a successful registration
    fn record_registration(
        &self,
        latency: Duration,
        result: Result<RegisterOutcome, HttpError>,
        label: &str,
    ) -> bool {
        match result {
            Ok(RegisterOutcome::Created) => {
                self.success(Endpoint::Register, latency);
                true
            }
            Ok(RegisterOutcome::AlreadyExists) => {
                self.failure(
                    Endpoint::Register,
                    latency,
                    &HttpError::unexpected_status(409, "already exists"),
                    label,
                );
                false
            }
            Err(e) => {
                self.failure(Endpoint::Register, latency, &e, label);
                false
            }
        }
    }

    fn success(&self, endpoint: Endpoint, latency: Duration) {
        self.record(endpoint, latency, RecordedOutcome::Success);
    }

    fn failure(&self, endpoint: Endpoint, latency: Duration, error: &HttpError, label: &str) {
        warn!(
            email = %self.user.email(),
            endpoint = %endpoint,
            reason = %error.reason(),
            "{}", label
        );
        self.record(
            endpoint,
            latency,
            RecordedOutcome::Failure {
                kind: error.kind(),
                reason: format!("{}: {}", label, error.reason()),
            },
        );
    }

    fn record(&self, endpoint: Endpoint, latency: Duration, outcome: RecordedOutcome) {
        self.ctx.sink.record(RequestSample {
            endpoint,
            latency,
            outcome,
        });
    }
}

async fn timed<T>(
    request: impl Future<Output = Result<T, HttpError>>,
) -> (Result<T, HttpError>, Duration) {
    let started = Instant::now();
    let result = request.await;
    (result, started.elapsed())
}
