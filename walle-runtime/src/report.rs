//! End-of-run report

use crate::collector::EndpointReport;
use serde::Serialize;
use std::collections::BTreeMap;
use walle_workload::{EvaluationResult, RunStatistics, StressAnalysis};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub profile: String,
    pub host: String,
    pub statistics: RunStatistics,
    pub endpoints: Vec<EndpointReport>,
    pub failure_breakdown: BTreeMap<String, u64>,
    pub evaluation: EvaluationResult,
    /// Present for profiles that report rather than gate on thresholds
    pub analysis: Option<StressAnalysis>,
    pub gated: bool,
}

impl RunReport {
    /// Whether the run should be considered successful
    pub fn passed(&self) -> bool {
        !self.gated || self.evaluation.passed()
    }
}
