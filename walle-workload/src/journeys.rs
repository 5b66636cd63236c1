//! The fixed journey catalogue of the Wall-E harness

use crate::amount::{AmountRange, TransferPolicy};
use crate::error::{WorkloadError, WorkloadResult};
use crate::journey::{BurstSize, Journey, JourneyStep, SetupStep, StepAction};
use crate::user::DebinPolicy;
use std::time::Duration;
use tracing::info;
use walle_config::ExternalBankConfig;
use walle_http::{Credentials, RegisterOutcome, WalletApi};

/// Failed DEBIN calls count as successes; approved amounts are credited
pub const TOLERANT_CREDITED: DebinPolicy = DebinPolicy {
    tolerate_failures: true,
    credit_balance: true,
};

/// Failed DEBIN calls are failures; approved amounts are credited
pub const STRICT_CREDITED: DebinPolicy = DebinPolicy {
    tolerate_failures: false,
    credit_balance: true,
};

/// Failed DEBIN calls count as successes; nothing is credited
pub const TOLERANT_UNCREDITED: DebinPolicy = DebinPolicy {
    tolerate_failures: true,
    credit_balance: false,
};

pub const EXISTING_USER_TRANSFERS: TransferPolicy = TransferPolicy {
    minimum: 5.0,
    cap: 50.0,
    balance_fraction: 0.1,
    top_up_below: 10.0,
    top_up_amount: 100.0,
};

pub const FREQUENT_USER_TRANSFERS: TransferPolicy = TransferPolicy {
    minimum: 1.0,
    cap: 10.0,
    balance_fraction: 0.1,
    top_up_below: 5.0,
    top_up_amount: 100.0,
};

pub const AGGRESSIVE_TRANSFERS: TransferPolicy = TransferPolicy {
    minimum: 5.0,
    cap: 10.0,
    balance_fraction: 0.1,
    top_up_below: 10.0,
    top_up_amount: 500.0,
};

/// Delay between the calls of one DEBIN-massive invocation
pub const DEBIN_MASSIVE_PAUSE: Duration = Duration::from_millis(500);

/// Balance checks and deposits with light history reads; never transfers
pub fn new_user() -> WorkloadResult<Journey> {
    Journey::new(
        "new_user",
        None,
        vec![
            JourneyStep::new("check_balance", 3.0, StepAction::CheckBalance),
            JourneyStep::new(
                "add_money",
                2.0,
                StepAction::Deposit(AmountRange::new(50.0, 500.0)?),
            ),
            JourneyStep::new("get_transactions", 1.0, StepAction::FetchHistory),
        ],
    )
}

pub fn existing_user() -> WorkloadResult<Journey> {
    Journey::new(
        "existing_user",
        Some(SetupStep::SeedFunds(1000.0)),
        vec![
            JourneyStep::new("check_balance", 4.0, StepAction::CheckBalance),
            JourneyStep::new(
                "p2p_transfer",
                2.0,
                StepAction::Transfer {
                    policy: EXISTING_USER_TRANSFERS,
                    burst: BurstSize::Fixed(1),
                },
            ),
            JourneyStep::new("get_transactions", 1.0, StepAction::FetchHistory),
        ],
    )
}

pub fn frequent_user() -> WorkloadResult<Journey> {
    Journey::new(
        "frequent_user",
        Some(SetupStep::SeedFunds(2000.0)),
        vec![
            JourneyStep::new("check_balance", 5.0, StepAction::CheckBalance),
            JourneyStep::new(
                "multiple_small_transfers",
                3.0,
                StepAction::Transfer {
                    policy: FREQUENT_USER_TRANSFERS,
                    burst: BurstSize::Between(1, 3),
                },
            ),
            JourneyStep::new("get_transactions", 2.0, StepAction::FetchHistory),
            JourneyStep::new(
                "request_debin",
                1.0,
                StepAction::RequestDebin {
                    amount: AmountRange::new(100.0, 1000.0)?,
                    policy: TOLERANT_CREDITED,
                    calls: 1,
                    pause: Duration::ZERO,
                },
            ),
        ],
    )
}

/// Throttled DEBIN requests only
pub fn debin_massive() -> WorkloadResult<Journey> {
    Journey::new(
        "debin_massive",
        None,
        vec![JourneyStep::new(
            "massive_debin_requests",
            1.0,
            StepAction::RequestDebin {
                amount: AmountRange::new(50.0, 500.0)?,
                policy: TOLERANT_UNCREDITED,
                calls: 3,
                pause: DEBIN_MASSIVE_PAUSE,
            },
        )],
    )
}

/// Transfers through the bank simulator to the shared recipient
pub fn external_bank_transfer() -> WorkloadResult<Journey> {
    Ok(Journey::new(
        "external_bank_transfer",
        None,
        vec![
            JourneyStep::new(
                "bank_transfer",
                3.0,
                StepAction::BankTransfer(AmountRange::new(10.0, 100.0)?),
            ),
            JourneyStep::new("check_balance", 1.0, StepAction::CheckBalance),
        ],
    )?
    .with_bank_recipient())
}

pub fn aggressive() -> WorkloadResult<Journey> {
    Journey::new(
        "aggressive",
        Some(SetupStep::SeedFunds(5000.0)),
        vec![
            JourneyStep::new("rapid_balance_checks", 10.0, StepAction::CheckBalance),
            JourneyStep::new(
                "concurrent_transfers",
                8.0,
                StepAction::Transfer {
                    policy: AGGRESSIVE_TRANSFERS,
                    burst: BurstSize::Fixed(3),
                },
            ),
            JourneyStep::new(
                "rapid_debin_requests",
                6.0,
                StepAction::RequestDebin {
                    amount: AmountRange::fixed(100.0)?,
                    policy: STRICT_CREDITED,
                    calls: 1,
                    pause: Duration::ZERO,
                },
            ),
            JourneyStep::new("transaction_history_spam", 4.0, StepAction::FetchHistory),
            JourneyStep::new(
                "rapid_money_adding",
                2.0,
                StepAction::Deposit(AmountRange::fixed(50.0)?),
            ),
        ],
    )
}

pub fn database_stress() -> WorkloadResult<Journey> {
    Journey::new(
        "database_stress",
        None,
        vec![JourneyStep::new(
            "database_heavy_operations",
            5.0,
            StepAction::DatabaseSweep {
                balance_checks: 5,
                history_reads: 3,
            },
        )],
    )
}

/// Register the shared bank recipient, accepting an existing account
pub async fn provision_bank_recipient(
    api: &dyn WalletApi,
    bank: &ExternalBankConfig,
    password: &str,
) -> WorkloadResult<RegisterOutcome> {
    let credentials = Credentials::new(bank.recipient_email.clone(), password);
    let outcome = api
        .register_with_alias(&credentials, &bank.recipient_alias)
        .await
        .map_err(|source| WorkloadError::Provisioning {
            identity: bank.recipient_alias.clone(),
            source,
        })?;

    match outcome {
        RegisterOutcome::Created => info!("Provisioned bank recipient '{}'", bank.recipient_alias),
        RegisterOutcome::AlreadyExists => {
            info!("Bank recipient '{}' already exists", bank.recipient_alias)
        }
    }
    Ok(outcome)
}
