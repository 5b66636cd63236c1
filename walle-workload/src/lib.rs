//! Synthetic workload model of the Wall-E load harness
//!
//! A [`WorkloadProfile`] selects a population of [`Archetype`]s. Each virtual
//! user runs a [`UserSession`] that repeatedly picks a [`JourneyStep`] by
//! weight and executes it against the [`walle_http::WalletApi`] seam,
//! reporting every request to a [`StatsSink`]. The [`evaluator`] judges the
//! aggregated [`RunStatistics`] against the profile's [`ThresholdSet`].
//!
//! Nothing here schedules users; that is the runtime's job.

pub mod amount;
pub mod archetype;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod journey;
pub mod journeys;
pub mod profile;
pub mod sampler;
pub mod stats;
pub mod user;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use amount::{AmountRange, ThinkTime, TransferPolicy};
pub use archetype::{Archetype, Behavior};
pub use error::{WorkloadError, WorkloadResult};
pub use evaluator::{
    evaluate, failure_rate, EvaluationResult, Metric, StressAnalysis, ThresholdSet, Violation,
};
pub use identity::{Identity, IdentityGenerator};
pub use journey::{BurstSize, Journey, JourneyStep, SetupStep, StepAction};
pub use profile::{ProfileKind, WorkloadProfile};
pub use sampler::WeightedSampler;
pub use stats::{RecordedOutcome, RequestSample, RunStatistics, SkipReason, StatsSink};
pub use user::{DebinPolicy, SyntheticUser, UserSession, UserState, WorkloadContext};
