//! Run-wide statistics collection

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use walle_http::Endpoint;
use crate::error::RuntimeResult;
use walle_workload::{RecordedOutcome, RequestSample, RunStatistics, SkipReason, StatsSink};

/// Highest latency tracked by the histograms, in microseconds
const MAX_TRACKED_MICROS: u64 = 60 * 60 * 1_000_000;

fn micros(latency: Duration) -> u64 {
    (latency.as_micros() as u64).max(1)
}

#[derive(Debug)]
struct LatencyStats {
    histogram: Histogram<u64>,
    total_ms: f64,
    count: u64,
}

impl LatencyStats {
    fn new(histogram: Histogram<u64>) -> Self {
        Self {
            histogram,
            total_ms: 0.0,
            count: 0,
        }
    }

    fn record(&mut self, latency: Duration) {
        self.histogram.saturating_record(micros(latency));
        self.total_ms += latency.as_secs_f64() * 1000.0;
        self.count += 1;
    }

    fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    fn p95_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.histogram.value_at_quantile(0.95) as f64 / 1000.0
        }
    }
}

#[derive(Debug)]
struct EndpointStats {
    latency: LatencyStats,
    failures: u64,
    tolerated: u64,
    skipped: u64,
}

impl EndpointStats {
    fn new(histogram: Histogram<u64>) -> Self {
        Self {
            latency: LatencyStats::new(histogram),
            failures: 0,
            tolerated: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug)]
struct CollectorState {
    total: LatencyStats,
    failures: u64,
    tolerated: u64,
    skipped: u64,
    endpoints: HashMap<Endpoint, EndpointStats>,
    failure_kinds: BTreeMap<String, u64>,
    /// Completed requests per elapsed second
    window: VecDeque<(u64, u64)>,
    finished_at: Option<Duration>,
}

/// Per-endpoint row of the end-of-run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointReport {
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub tolerated: u64,
    pub skipped: u64,
    pub average_ms: f64,
    pub p95_ms: f64,
}

/// [`StatsSink`] shared by every virtual user of a run
///
/// Latencies feed HDR histograms (microsecond resolution); current throughput
/// is measured over a sliding window of completed seconds.
#[derive(Debug)]
pub struct StatsCollector {
    started: Instant,
    template: Histogram<u64>,
    window: Duration,
    state: Mutex<CollectorState>,
    active_users: AtomicUsize,
    peak_users: AtomicUsize,
}

impl StatsCollector {
    pub fn new(window: Duration) -> RuntimeResult<Self> {
        let template = Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)?;
        Ok(Self {
            started: Instant::now(),
            window: window.max(Duration::from_secs(1)),
            state: Mutex::new(CollectorState {
                total: LatencyStats::new(template.clone()),
                failures: 0,
                tolerated: 0,
                skipped: 0,
                endpoints: HashMap::new(),
                failure_kinds: BTreeMap::new(),
                window: VecDeque::new(),
                finished_at: None,
            }),
            template,
            active_users: AtomicUsize::new(0),
            peak_users: AtomicUsize::new(0),
        })
    }

    pub fn user_started(&self) {
        let active = self.active_users.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_users.fetch_max(active, Ordering::SeqCst);
    }

    pub fn user_stopped(&self) {
        self.active_users.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_users(&self) -> usize {
        self.active_users.load(Ordering::SeqCst)
    }

    /// Freeze elapsed time; later snapshots report the run as it ended
    pub fn finish(&self) {
        let elapsed = self.started.elapsed();
        self.state.lock().finished_at.get_or_insert(elapsed);
    }

    fn elapsed(&self, state: &CollectorState) -> Duration {
        state.finished_at.unwrap_or_else(|| self.started.elapsed())
    }

    pub(crate) fn record_at(&self, sample: RequestSample, at: Duration) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let second = at.as_secs();

        if state.window.back().is_some_and(|(last, _)| *last == second) {
            if let Some((_, count)) = state.window.back_mut() {
                *count += 1;
            }
        } else {
            state.window.push_back((second, 1));
        }
        let horizon = second.saturating_sub(self.window.as_secs() + 1);
        while state.window.front().is_some_and(|(s, _)| *s < horizon) {
            state.window.pop_front();
        }

        state.total.record(sample.latency);
        let endpoint = state
            .endpoints
            .entry(sample.endpoint)
            .or_insert_with(|| EndpointStats::new(self.template.clone()));
        endpoint.latency.record(sample.latency);

        match &sample.outcome {
            RecordedOutcome::Success => {}
            RecordedOutcome::Failure { kind, .. } => {
                endpoint.failures += 1;
                state.failures += 1;
                *state
                    .failure_kinds
                    .entry(format!("{} {}", sample.endpoint, kind))
                    .or_insert(0) += 1;
            }
            RecordedOutcome::Tolerated { .. } => {
                endpoint.tolerated += 1;
                state.tolerated += 1;
            }
        }
    }

    /// Requests per second over the last window of completed seconds
    fn current_rps(&self, state: &CollectorState, elapsed: Duration) -> f64 {
        let now = elapsed.as_secs();
        let from = now.saturating_sub(self.window.as_secs());
        let seconds = now - from;

        if seconds == 0 {
            let secs = elapsed.as_secs_f64();
            return if secs > 0.0 {
                state.total.count as f64 / secs
            } else {
                0.0
            };
        }

        let count: u64 = state
            .window
            .iter()
            .filter(|(second, _)| *second >= from && *second < now)
            .map(|(_, count)| count)
            .sum();
        count as f64 / seconds as f64
    }

    pub(crate) fn snapshot_at(&self, elapsed: Duration) -> RunStatistics {
        let state = self.state.lock();
        RunStatistics {
            total_requests: state.total.count,
            total_failures: state.failures,
            average_response_ms: state.total.average_ms(),
            p95_response_ms: Some(state.total.p95_ms()),
            current_rps: self.current_rps(&state, elapsed),
            elapsed,
            skipped: state.skipped,
            tolerated: state.tolerated,
            peak_users: self.peak_users.load(Ordering::SeqCst),
        }
    }

    pub fn snapshot(&self) -> RunStatistics {
        let elapsed = self.elapsed(&self.state.lock());
        self.snapshot_at(elapsed)
    }

    /// Rows ordered by endpoint path
    pub fn endpoint_reports(&self) -> Vec<EndpointReport> {
        let state = self.state.lock();
        let mut rows: Vec<EndpointReport> = state
            .endpoints
            .iter()
            .map(|(endpoint, stats)| EndpointReport {
                name: endpoint.to_string(),
                requests: stats.latency.count,
                failures: stats.failures,
                tolerated: stats.tolerated,
                skipped: stats.skipped,
                average_ms: stats.latency.average_ms(),
                p95_ms: stats.latency.p95_ms(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Failure counts keyed by `"{endpoint} {kind}"`
    pub fn failure_breakdown(&self) -> BTreeMap<String, u64> {
        self.state.lock().failure_kinds.clone()
    }
}

impl StatsSink for StatsCollector {
    fn record(&self, sample: RequestSample) {
        self.record_at(sample, self.started.elapsed());
    }

    fn record_skip(&self, endpoint: Endpoint, reason: SkipReason) {
        debug!("Skipped {} ({})", endpoint, reason);
        let mut state = self.state.lock();
        state.skipped += 1;
        state
            .endpoints
            .entry(endpoint)
            .or_insert_with(|| EndpointStats::new(self.template.clone()))
            .skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walle_http::FailureKind;

    fn sample(endpoint: Endpoint, millis: u64, outcome: RecordedOutcome) -> RequestSample {
        RequestSample {
            endpoint,
            latency: Duration::from_millis(millis),
            outcome,
        }
    }

    fn failure() -> RecordedOutcome {
        RecordedOutcome::Failure {
            kind: FailureKind::UnexpectedStatus,
            reason: "500".to_string(),
        }
    }

    #[test]
    fn test_counts_and_latency() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        for millis in 1..=100 {
            collector.record_at(
                sample(Endpoint::Balance, millis, RecordedOutcome::Success),
                Duration::from_millis(millis * 10),
            );
        }
        collector.record_at(sample(Endpoint::Debin, 50, failure()), Duration::from_secs(1));

        let stats = collector.snapshot_at(Duration::from_secs(2));
        assert_eq!(stats.total_requests, 101);
        assert_eq!(stats.total_failures, 1);
        assert!((stats.average_response_ms - 50.49).abs() < 0.01);
        let p95 = stats.p95_response_ms.unwrap();
        assert!((94.0..=96.5).contains(&p95), "p95 {p95}");
    }

    #[test]
    fn test_tolerated_and_skipped_are_not_failures() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        collector.record_at(
            sample(
                Endpoint::Debin,
                10,
                RecordedOutcome::Tolerated {
                    kind: FailureKind::Transport,
                    reason: "reset".to_string(),
                },
            ),
            Duration::ZERO,
        );
        collector.record_skip(Endpoint::Balance, SkipReason::Unauthenticated);

        let stats = collector.snapshot_at(Duration::from_secs(1));
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_failures, 0);
        assert_eq!(stats.tolerated, 1);
        assert_eq!(stats.skipped, 1);

        let rows = collector.endpoint_reports();
        let balance = rows.iter().find(|r| r.name == "/wallet/balance").unwrap();
        assert_eq!((balance.requests, balance.skipped), (0, 1));
    }

    #[test]
    fn test_current_rps_uses_sliding_window() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        // 100 req/s for the first 20 seconds, then 10 req/s for 10 seconds
        for second in 0..30u64 {
            let per_second = if second < 20 { 100 } else { 10 };
            for i in 0..per_second {
                let at = Duration::from_secs(second) + Duration::from_millis(i * 1000 / per_second);
                collector.record_at(sample(Endpoint::Balance, 5, RecordedOutcome::Success), at);
            }
        }

        let stats = collector.snapshot_at(Duration::from_secs(30));
        assert_eq!(stats.total_requests, 2100);
        assert_eq!(stats.current_rps, 10.0);

        let early = StatsCollector::new(Duration::from_secs(10)).unwrap();
        for i in 0..20 {
            early.record_at(
                sample(Endpoint::Balance, 5, RecordedOutcome::Success),
                Duration::from_millis(i * 100),
            );
        }
        // Two completed seconds so far
        assert_eq!(early.snapshot_at(Duration::from_millis(2500)).current_rps, 10.0);
    }

    #[test]
    fn test_empty_collector() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        let stats = collector.snapshot_at(Duration::ZERO);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.average_response_ms, 0.0);
        assert_eq!(stats.current_rps, 0.0);
    }

    #[test]
    fn test_peak_users() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        collector.user_started();
        collector.user_started();
        collector.user_stopped();
        collector.user_started();
        assert_eq!(collector.active_users(), 2);
        assert_eq!(collector.snapshot_at(Duration::ZERO).peak_users, 2);
    }

    #[test]
    fn test_failure_breakdown() {
        let collector = StatsCollector::new(Duration::from_secs(10)).unwrap();
        collector.record_at(sample(Endpoint::P2pTransfer, 5, failure()), Duration::ZERO);
        collector.record_at(sample(Endpoint::P2pTransfer, 5, failure()), Duration::ZERO);
        assert_eq!(
            collector.failure_breakdown().get("/transactions/p2p unexpected_status"),
            Some(&2)
        );
    }
}
