//! Journey model: weighted steps and an optional per-user setup

use crate::amount::{AmountRange, TransferPolicy};
use crate::error::WorkloadResult;
use crate::sampler::WeightedSampler;
use crate::user::{DebinPolicy, UserSession};
use rand::Rng;
use std::time::Duration;

/// Number of transfers made by one invocation of a transfer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstSize {
    Fixed(u32),
    /// Uniform in `[min, max]`
    Between(u32, u32),
}

impl BurstSize {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match *self {
            BurstSize::Fixed(n) => n,
            BurstSize::Between(min, max) if min >= max => min,
            BurstSize::Between(min, max) => rng.random_range(min..=max),
        }
    }
}

/// What a step does when selected
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    CheckBalance,
    Deposit(AmountRange),
    Transfer {
        policy: TransferPolicy,
        burst: BurstSize,
    },
    FetchHistory,
    /// `calls` DEBIN requests separated by `pause`
    RequestDebin {
        amount: AmountRange,
        policy: DebinPolicy,
        calls: u32,
        pause: Duration,
    },
    BankTransfer(AmountRange),
    /// Read-heavy sweep: balance checks, then history reads
    DatabaseSweep {
        balance_checks: u32,
        history_reads: u32,
    },
}

impl StepAction {
    pub async fn execute(&self, session: &mut UserSession) {
        match self {
            StepAction::CheckBalance => {
                session.refresh_balance().await;
            }
            StepAction::Deposit(range) => {
                let amount = range.sample(session.rng());
                session.deposit_funds(amount).await;
            }
            StepAction::Transfer { policy, burst } => {
                let transfers = burst.sample(session.rng());
                for _ in 0..transfers {
                    session.transfer(policy).await;
                    if !session.user().is_authenticated() {
                        break;
                    }
                }
            }
            StepAction::FetchHistory => {
                session.fetch_history().await;
            }
            StepAction::RequestDebin {
                amount,
                policy,
                calls,
                pause,
            } => {
                for call in 0..*calls {
                    if call > 0 && !pause.is_zero() {
                        tokio::time::sleep(*pause).await;
                    }
                    let amount = amount.sample(session.rng());
                    session.request_debin(amount, *policy).await;
                    if !session.user().is_authenticated() {
                        break;
                    }
                }
            }
            StepAction::BankTransfer(range) => {
                session.bank_transfer(range).await;
            }
            StepAction::DatabaseSweep {
                balance_checks,
                history_reads,
            } => {
                for _ in 0..*balance_checks {
                    session.refresh_balance().await;
                }
                for _ in 0..*history_reads {
                    session.fetch_history().await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JourneyStep {
    pub name: &'static str,
    pub weight: f64,
    pub action: StepAction,
}

impl JourneyStep {
    pub fn new(name: &'static str, weight: f64, action: StepAction) -> Self {
        Self {
            name,
            weight,
            action,
        }
    }
}

/// Runs once per virtual user before step selection starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetupStep {
    SeedFunds(f64),
}

#[derive(Debug, Clone)]
pub struct Journey {
    name: &'static str,
    setup: Option<SetupStep>,
    steps: WeightedSampler<JourneyStep>,
    needs_bank_recipient: bool,
}

impl Journey {
    pub fn new(
        name: &'static str,
        setup: Option<SetupStep>,
        steps: Vec<JourneyStep>,
    ) -> WorkloadResult<Self> {
        let entries = steps
            .into_iter()
            .map(|step| {
                let weight = step.weight;
                (step, weight)
            })
            .collect();

        Ok(Self {
            name,
            setup,
            steps: WeightedSampler::new(entries)?,
            needs_bank_recipient: false,
        })
    }

    /// Mark the journey as depending on the shared bank recipient
    pub fn with_bank_recipient(mut self) -> Self {
        self.needs_bank_recipient = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn setup(&self) -> Option<SetupStep> {
        self.setup
    }

    pub fn needs_bank_recipient(&self) -> bool {
        self.needs_bank_recipient
    }

    pub fn steps(&self) -> impl Iterator<Item = &JourneyStep> {
        self.steps.iter().map(|(step, _)| step)
    }

    pub fn step(&self, name: &str) -> Option<&JourneyStep> {
        self.steps().find(|step| step.name == name)
    }

    pub fn select_step<R: Rng + ?Sized>(&self, rng: &mut R) -> &JourneyStep {
        self.steps.sample(rng)
    }

    pub async fn run_setup(&self, session: &mut UserSession) {
        match self.setup {
            Some(SetupStep::SeedFunds(amount)) => {
                session.deposit_funds(amount).await;
            }
            None => {}
        }
    }

    /// Execute one step; the user becomes active on its first authenticated step
    pub async fn run_step(&self, step: &JourneyStep, session: &mut UserSession) {
        if session.user().is_authenticated() {
            session.mark_active();
        }
        step.action.execute(session).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_burst() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(BurstSize::Fixed(3).sample(&mut rng), 3);
        assert_eq!(BurstSize::Fixed(0).sample(&mut rng), 0);
    }

    #[test]
    fn test_between_burst_covers_inclusive_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let draws: Vec<u32> = (0..200)
            .map(|_| BurstSize::Between(1, 3).sample(&mut rng))
            .collect();

        assert!(draws.iter().all(|n| (1..=3).contains(n)));
        assert!(draws.contains(&1));
        assert!(draws.contains(&3));
    }

    #[test]
    fn test_degenerate_between_burst_uses_min() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(BurstSize::Between(2, 2).sample(&mut rng), 2);
        assert_eq!(BurstSize::Between(4, 1).sample(&mut rng), 4);
    }
}
