//! Statistics contract between the workload model and the runtime

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use walle_http::{Endpoint, FailureKind};

/// How one completed request is counted
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOutcome {
    Success,
    Failure { kind: FailureKind, reason: String },
    /// Failed, but counted as a success under the tolerant DEBIN policy
    Tolerated { kind: FailureKind, reason: String },
}

impl RecordedOutcome {
    /// Whether the request counts towards the failure total
    pub fn is_failure(&self) -> bool {
        matches!(self, RecordedOutcome::Failure { .. })
    }
}

/// One request as seen by the statistics sink
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSample {
    pub endpoint: Endpoint,
    pub latency: Duration,
    pub outcome: RecordedOutcome,
}

/// Why a step was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No auth token and no login attempt left
    Unauthenticated,
    /// Transfer range collapsed for the cached balance
    InsufficientBalance,
    /// The throwaway recipient could not be registered
    NoRecipient,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unauthenticated => write!(f, "unauthenticated"),
            SkipReason::InsufficientBalance => write!(f, "insufficient_balance"),
            SkipReason::NoRecipient => write!(f, "no_recipient"),
        }
    }
}

/// Receives every request outcome and skipped step of a run
pub trait StatsSink: Send + Sync {
    fn record(&self, sample: RequestSample);

    /// Skips are policy no-ops and never count as requests or failures
    fn record_skip(&self, endpoint: Endpoint, reason: SkipReason);
}

/// Aggregate view of a run, read by the evaluator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total_requests: u64,
    pub total_failures: u64,
    pub average_response_ms: f64,
    /// `None` when the runtime keeps no latency distribution
    pub p95_response_ms: Option<f64>,
    pub current_rps: f64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub skipped: u64,
    pub tolerated: u64,
    pub peak_users: usize,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
