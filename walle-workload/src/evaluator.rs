//! Threshold evaluation of run statistics

use crate::stats::RunStatistics;
use serde::Serialize;
use std::fmt;

/// Bounds a run is judged against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    pub name: &'static str,
    pub max_avg_response_ms: f64,
    pub max_p95_response_ms: f64,
    pub max_failure_rate: f64,
    pub min_requests_per_second: f64,
}

impl ThresholdSet {
    /// Acceptance thresholds of the load profile
    pub fn load() -> Self {
        Self {
            name: "load",
            max_avg_response_ms: 500.0,
            max_p95_response_ms: 1000.0,
            max_failure_rate: 0.01,
            min_requests_per_second: 50.0,
        }
    }

    /// Degraded-service indicators of the stress profile
    pub fn breaking_point() -> Self {
        Self {
            name: "breaking-point",
            max_avg_response_ms: 5000.0,
            max_p95_response_ms: 10000.0,
            max_failure_rate: 0.10,
            min_requests_per_second: 10.0,
        }
    }

    /// Never violated
    pub fn unbounded() -> Self {
        Self {
            name: "unbounded",
            max_avg_response_ms: f64::INFINITY,
            max_p95_response_ms: f64::INFINITY,
            max_failure_rate: f64::INFINITY,
            min_requests_per_second: f64::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    AverageResponseTime,
    P95ResponseTime,
    FailureRate,
    Throughput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub metric: Metric,
    pub measured: f64,
    pub threshold: f64,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Violations in evaluation order; empty means the run passed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub violations: Vec<Violation>,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// `failures / max(requests, 1)`
pub fn failure_rate(stats: &RunStatistics) -> f64 {
    stats.total_failures as f64 / stats.total_requests.max(1) as f64
}

/// Compare a run against `thresholds`
///
/// Checked in order: average latency, 95th percentile (when the runtime
/// reports one), failure rate, throughput.
pub fn evaluate(stats: &RunStatistics, thresholds: &ThresholdSet) -> EvaluationResult {
    let mut violations = Vec::new();

    if stats.average_response_ms > thresholds.max_avg_response_ms {
        violations.push(Violation {
            metric: Metric::AverageResponseTime,
            measured: stats.average_response_ms,
            threshold: thresholds.max_avg_response_ms,
            message: format!(
                "Average response time {:.2}ms exceeds threshold {}ms",
                stats.average_response_ms, thresholds.max_avg_response_ms
            ),
        });
    }

    if let Some(p95) = stats.p95_response_ms {
        if p95 > thresholds.max_p95_response_ms {
            violations.push(Violation {
                metric: Metric::P95ResponseTime,
                measured: p95,
                threshold: thresholds.max_p95_response_ms,
                message: format!(
                    "95th percentile response time {:.2}ms exceeds threshold {}ms",
                    p95, thresholds.max_p95_response_ms
                ),
            });
        }
    }

    let rate = failure_rate(stats);
    if rate > thresholds.max_failure_rate {
        violations.push(Violation {
            metric: Metric::FailureRate,
            measured: rate,
            threshold: thresholds.max_failure_rate,
            message: format!(
                "Failure rate {:.2}% exceeds threshold {:.2}%",
                rate * 100.0,
                thresholds.max_failure_rate * 100.0
            ),
        });
    }

    if stats.current_rps < thresholds.min_requests_per_second {
        violations.push(Violation {
            metric: Metric::Throughput,
            measured: stats.current_rps,
            threshold: thresholds.min_requests_per_second,
            message: format!(
                "Requests per second {:.2} below threshold {}",
                stats.current_rps, thresholds.min_requests_per_second
            ),
        });
    }

    EvaluationResult { violations }
}

/// Summary of a stress run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressAnalysis {
    pub peak_users: usize,
    pub requests_per_second: f64,
    pub average_response_ms: f64,
    pub failure_rate: f64,
    pub total_requests: u64,
    pub breaking_point_reached: bool,
    pub indicators: Vec<String>,
}

impl StressAnalysis {
    pub fn from_stats(stats: &RunStatistics, thresholds: &ThresholdSet) -> Self {
        let evaluation = evaluate(stats, thresholds);
        Self {
            peak_users: stats.peak_users,
            requests_per_second: stats.current_rps,
            average_response_ms: stats.average_response_ms,
            failure_rate: failure_rate(stats),
            total_requests: stats.total_requests,
            breaking_point_reached: !evaluation.passed(),
            indicators: evaluation.messages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn healthy() -> RunStatistics {
        RunStatistics {
            total_requests: 10_000,
            total_failures: 10,
            average_response_ms: 120.0,
            p95_response_ms: Some(400.0),
            current_rps: 80.0,
            ..RunStatistics::default()
        }
    }

    #[test]
    fn test_healthy_run_passes_load() {
        assert!(evaluate(&healthy(), &ThresholdSet::load()).passed());
    }

    #[test]
    fn test_violations_keep_order() {
        let stats = RunStatistics {
            total_requests: 100,
            total_failures: 5,
            average_response_ms: 612.0,
            p95_response_ms: Some(1500.0),
            current_rps: 12.0,
            ..RunStatistics::default()
        };

        let result = evaluate(&stats, &ThresholdSet::load());
        let metrics: Vec<_> = result.violations.iter().map(|v| v.metric).collect();
        assert_eq!(
            metrics,
            vec![
                Metric::AverageResponseTime,
                Metric::P95ResponseTime,
                Metric::FailureRate,
                Metric::Throughput
            ]
        );
        assert_eq!(
            result.messages()[0],
            "Average response time 612.00ms exceeds threshold 500ms"
        );
        assert_eq!(result.messages()[2], "Failure rate 5.00% exceeds threshold 1.00%");
        assert_eq!(result.messages()[3], "Requests per second 12.00 below threshold 50");
    }

    #[test]
    fn test_missing_p95_is_not_judged() {
        let stats = RunStatistics {
            p95_response_ms: None,
            ..healthy()
        };
        assert!(evaluate(&stats, &ThresholdSet::load()).passed());
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let stats = RunStatistics {
            total_requests: 100,
            total_failures: 1,
            average_response_ms: 500.0,
            p95_response_ms: Some(1000.0),
            current_rps: 50.0,
            ..RunStatistics::default()
        };
        assert!(evaluate(&stats, &ThresholdSet::load()).passed());
    }

    #[test]
    fn test_stress_analysis() {
        let stats = RunStatistics {
            total_requests: 1_000,
            total_failures: 200,
            average_response_ms: 800.0,
            current_rps: 40.0,
            peak_users: 1000,
            ..RunStatistics::default()
        };
        let analysis = StressAnalysis::from_stats(&stats, &ThresholdSet::breaking_point());
        assert!(analysis.breaking_point_reached);
        assert_eq!(analysis.failure_rate, 0.2);
        assert_eq!(analysis.peak_users, 1000);
        assert_eq!(analysis.indicators.len(), 1);

        let calm = StressAnalysis::from_stats(&healthy(), &ThresholdSet::breaking_point());
        assert!(!calm.breaking_point_reached);
    }

    #[test]
    fn test_empty_run_rate_is_zero() {
        let rate = failure_rate(&RunStatistics::default());
        assert!(rate.is_finite());
        assert_eq!(rate, 0.0);
    }

    fn any_stats() -> impl Strategy<Value = RunStatistics> {
        (
            0u64..1_000_000,
            0u64..1_000_000,
            0.0f64..1e7,
            proptest::option::of(0.0f64..1e7),
            0.0f64..1e6,
        )
            .prop_map(|(requests, failures, avg, p95, rps)| RunStatistics {
                total_requests: requests,
                total_failures: failures.min(requests),
                average_response_ms: avg,
                p95_response_ms: p95,
                current_rps: rps,
                ..RunStatistics::default()
            })
    }

    proptest! {
        #[test]
        fn prop_no_failures_means_zero_rate(requests in 1u64..u64::MAX / 2) {
            let stats = RunStatistics { total_requests: requests, ..RunStatistics::default() };
            prop_assert_eq!(failure_rate(&stats), 0.0);
        }

        #[test]
        fn prop_unbounded_never_violated(stats in any_stats()) {
            prop_assert!(evaluate(&stats, &ThresholdSet::unbounded()).passed());
        }

        #[test]
        fn prop_rate_within_unit_interval(stats in any_stats()) {
            let rate = failure_rate(&stats);
            prop_assert!((0.0..=1.0).contains(&rate));
        }
    }
}
