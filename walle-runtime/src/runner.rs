//! Virtual user scheduling

use crate::collector::StatsCollector;
use crate::error::{RuntimeError, RuntimeResult};
use crate::population::{apportion, spawn_order};
use crate::report::RunReport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walle_config::{ExternalBankConfig, WalleConfig};
use walle_http::WalletApi;
use walle_workload::journeys::provision_bank_recipient;
use walle_workload::{
    Behavior, IdentityGenerator, UserSession, WorkloadContext, WorkloadProfile,
};

/// Run parameters not owned by the profile
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base seed; user `i` is seeded with `seed + i`
    pub seed: Option<u64>,
    pub password: String,
    pub identity_domain: String,
    pub bank: ExternalBankConfig,
    pub throughput_window: Duration,
    /// Host shown in the banners
    pub host: String,
}

impl RunnerConfig {
    pub fn from_config(config: &WalleConfig) -> Self {
        Self {
            seed: config.run.seed,
            password: config.api.password.clone(),
            identity_domain: config.run.identity_domain.clone(),
            bank: config.run.external_bank.clone(),
            throughput_window: config.run.throughput_window,
            host: config.api.host.clone(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_config(&WalleConfig::default())
    }
}

/// Spawns a profile's population and drives it until the run stops
pub struct LoadRunner {
    api: Arc<dyn WalletApi>,
    profile: WorkloadProfile,
    config: RunnerConfig,
    collector: Arc<StatsCollector>,
    cancel: CancellationToken,
}

impl LoadRunner {
    pub fn new(
        api: Arc<dyn WalletApi>,
        profile: WorkloadProfile,
        config: RunnerConfig,
    ) -> RuntimeResult<Self> {
        profile.validate()?;
        let collector = Arc::new(StatsCollector::new(config.throughput_window)?);
        Ok(Self {
            api,
            profile,
            config,
            collector,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn collector(&self) -> Arc<StatsCollector> {
        Arc::clone(&self.collector)
    }

    pub fn profile(&self) -> &WorkloadProfile {
        &self.profile
    }

    fn user_rng(&self, index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    pub async fn run(&self) -> RuntimeResult<RunReport> {
        let profile = &self.profile;
        let spawn_interval = profile.spawn_interval()?;

        if profile.needs_bank_recipient() {
            provision_bank_recipient(self.api.as_ref(), &self.config.bank, &self.config.password)
                .await?;
        }

        info!("=== Wall-E Load Test Started ===");
        info!("Host: {}", self.config.host);
        info!("Users: {}", profile.users);
        info!(
            "Profile: {} (spawn rate {}/s, run time {}s)",
            profile.name(),
            profile.spawn_rate,
            profile.run_time.as_secs()
        );

        let ctx = Arc::new(WorkloadContext::new(
            Arc::clone(&self.api),
            self.collector.clone(),
            Arc::new(IdentityGenerator::new(self.config.identity_domain.clone())),
            self.config.password.clone(),
            self.config.bank.clone(),
        ));

        let weights: Vec<f64> = profile.archetypes.iter().map(|a| a.weight()).collect();
        let counts = apportion(profile.users, &weights);
        for (archetype, count) in profile.archetypes.iter().zip(&counts) {
            debug!("{} x {}", archetype.name(), count);
        }
        let behaviors: Vec<Arc<dyn Behavior>> = profile
            .archetypes
            .iter()
            .map(|a| Arc::new(a.clone()) as Arc<dyn Behavior>)
            .collect();

        let deadline = {
            let cancel = self.cancel.clone();
            let run_time = profile.run_time;
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(run_time) => {
                        info!("Run time elapsed, stopping users");
                        cancel.cancel();
                    }
                }
            })
        };

        let mut users = JoinSet::new();

        for (index, archetype) in spawn_order(&counts).into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            if index > 0 {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(spawn_interval) => {}
                }
            }

            users.spawn(virtual_user(
                Arc::clone(&behaviors[archetype]),
                UserSession::new(Arc::clone(&ctx), self.user_rng(index)),
                self.collector.clone(),
                self.cancel.clone(),
            ));
        }
        info!("Spawned {} users", users.len());

        self.cancel.cancelled().await;
        let mut task_errors = 0usize;
        while let Some(result) = users.join_next().await {
            if let Err(e) = result {
                task_errors += 1;
                warn!("Virtual user task ended abnormally: {}", e);
            }
        }
        self.collector.finish();
        deadline
            .await
            .map_err(|e| RuntimeError::Task(e.to_string()))?;

        let statistics = self.collector.snapshot();
        info!("=== Wall-E Load Test Finished ===");
        info!("Total requests: {}", statistics.total_requests);
        info!("Total failures: {}", statistics.total_failures);
        info!("Average response time: {:.2}ms", statistics.average_response_ms);
        info!("Requests per second: {:.2}", statistics.current_rps);
        if task_errors > 0 {
            warn!("{} virtual users ended abnormally", task_errors);
        }

        let gated = profile.gates_on_thresholds();
        Ok(RunReport {
            profile: profile.name().to_string(),
            host: self.config.host.clone(),
            endpoints: self.collector.endpoint_reports(),
            failure_breakdown: self.collector.failure_breakdown(),
            evaluation: profile.evaluate(&statistics),
            analysis: (!gated).then(|| profile.analyze(&statistics)),
            gated,
            statistics,
        })
    }
}

/// One virtual user: start, then think and act until cancelled
async fn virtual_user(
    behavior: Arc<dyn Behavior>,
    mut session: UserSession,
    collector: Arc<StatsCollector>,
    cancel: CancellationToken,
) {
    collector.user_started();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = behavior.on_start(&mut session) => {}
    }

    while !cancel.is_cancelled() {
        let pause = behavior.think(session.rng());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }

        let step = behavior.select_step(session.rng());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = behavior.run_step(step, &mut session) => {}
        }
    }

    debug!(email = %session.user().email(), "Virtual user stopped");
    collector.user_stopped();
}
