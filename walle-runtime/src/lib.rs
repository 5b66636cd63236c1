//! Load-generation runtime for the Wall-E harness
//!
//! [`LoadRunner`] apportions a profile's users across its archetypes, spawns
//! them as tokio tasks at the profile's spawn rate and stops them on the
//! run-time deadline or an external cancellation. Every request lands in the
//! shared [`StatsCollector`].

pub mod collector;
pub mod error;
pub mod population;
pub mod report;
pub mod runner;

pub use collector::{EndpointReport, StatsCollector};
pub use error::{RuntimeError, RuntimeResult};
pub use population::{apportion, spawn_order};
pub use report::RunReport;
pub use runner::{LoadRunner, RunnerConfig};
