//! Request statistics and Prometheus instrumentation.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

use crate::error::{GeneratorError, GeneratorResult};

/// What happened to one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The target answered, with any status code.
    Status {
        code: u16,
        latency: Duration,
        bytes: usize,
    },
    /// Connection failure, timeout, or body read failure.
    Error { message: String, latency: Duration },
}

/// Tallies for a set of requests. Each worker owns one; the cycle merges
/// them after every worker has finished.
#[derive(Debug, Clone)]
pub struct RequestStats {
    histogram: Histogram<u64>,
    attempted: u64,
    status_counts: BTreeMap<u16, u64>,
    errors: u64,
    bytes_total: u64,
}

impl RequestStats {
    pub fn new() -> GeneratorResult<Self> {
        Ok(Self {
            histogram: Histogram::new(3)?,
            attempted: 0,
            status_counts: BTreeMap::new(),
            errors: 0,
            bytes_total: 0,
        })
    }

    /// Record one attempted request.
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.attempted += 1;
        match outcome {
            RequestOutcome::Status {
                code,
                latency,
                bytes,
            } => {
                *self.status_counts.entry(*code).or_insert(0) += 1;
                self.bytes_total += *bytes as u64;
                self.histogram.record(latency.as_micros() as u64).ok();
            }
            RequestOutcome::Error { .. } => {
                self.errors += 1;
            }
        }
    }

    /// Stats whose histogram cannot grow past `highest_us` microseconds.
    #[cfg(test)]
    pub(crate) fn bounded(highest_us: u64) -> GeneratorResult<Self> {
        Ok(Self {
            histogram: Histogram::new_with_bounds(1, highest_us, 3)?,
            ..Self::new()?
        })
    }

    pub fn merge(&mut self, other: &RequestStats) -> GeneratorResult<()> {
        self.histogram.add(&other.histogram)?;
        self.attempted += other.attempted;
        for (code, count) in &other.status_counts {
            *self.status_counts.entry(*code).or_insert(0) += count;
        }
        self.errors += other.errors;
        self.bytes_total += other.bytes_total;
        Ok(())
    }

    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn status_counts(&self) -> &BTreeMap<u16, u64> {
        &self.status_counts
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    /// Latency percentiles in milliseconds over requests that got a response.
    pub fn latency(&self) -> LatencySummary {
        if self.histogram.len() == 0 {
            return LatencySummary::default();
        }
        let ms = |us: u64| us as f64 / 1000.0;
        LatencySummary {
            min_ms: ms(self.histogram.min()),
            p50_ms: ms(self.histogram.value_at_percentile(50.0)),
            p90_ms: ms(self.histogram.value_at_percentile(90.0)),
            p99_ms: ms(self.histogram.value_at_percentile(99.0)),
            max_ms: ms(self.histogram.max()),
            avg_ms: self.histogram.mean() / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
}

/// Result of one worker's quota.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub stats: RequestStats,
}

/// Result of one dispatch-and-join round.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub workers: usize,
    pub workers_completed: usize,
    pub requests_attempted: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub errors: u64,
    pub bytes_total: u64,
    pub latency: LatencySummary,
}

impl CycleReport {
    pub fn new(
        cycle: u64,
        profile: &str,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        workers: usize,
        workers_completed: usize,
        stats: &RequestStats,
    ) -> Self {
        Self {
            cycle,
            profile: profile.to_string(),
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            workers,
            workers_completed,
            requests_attempted: stats.attempted(),
            status_counts: stats.status_counts().clone(),
            errors: stats.errors(),
            bytes_total: stats.bytes_total(),
            latency: stats.latency(),
        }
    }

    /// Requests that received any HTTP response.
    pub fn responses(&self) -> u64 {
        self.status_counts.values().sum()
    }
}

/// Running totals across cycles. Per-cycle reports are not retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveSummary {
    pub cycles_completed: u64,
    pub requests_attempted: u64,
    pub errors: u64,
}

impl DriveSummary {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles_completed += 1;
        self.requests_attempted += report.requests_attempted;
        self.errors += report.errors;
    }
}

/// Start the Prometheus scrape listener on `0.0.0.0:port`.
pub fn install_exporter(port: u16) -> GeneratorResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| GeneratorError::MetricsExporter(e.to_string()))
}

pub fn record_request(outcome: &RequestOutcome) {
    match outcome {
        RequestOutcome::Status { code, latency, .. } => {
            counter!("loadgen_requests_total", "status" => code.to_string()).increment(1);
            histogram!("loadgen_request_duration_ms").record(latency.as_secs_f64() * 1000.0);
        }
        RequestOutcome::Error { .. } => {
            counter!("loadgen_request_errors_total").increment(1);
        }
    }
}

/// Holds one slot of `loadgen_active_workers` until dropped, including when
/// the worker's task is aborted.
#[must_use]
pub struct ActiveWorker(());

impl ActiveWorker {
    pub fn start() -> Self {
        gauge!("loadgen_active_workers").increment(1.0);
        Self(())
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        gauge!("loadgen_active_workers").decrement(1.0);
    }
}

pub fn record_cycle(report: &CycleReport) {
    counter!("loadgen_cycles_total").increment(1);
    histogram!("loadgen_cycle_duration_secs").record(report.elapsed_secs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusHandle;

    fn status(code: u16, ms: u64) -> RequestOutcome {
        RequestOutcome::Status {
            code,
            latency: Duration::from_millis(ms),
            bytes: 100,
        }
    }

    fn error() -> RequestOutcome {
        RequestOutcome::Error {
            message: "connection refused".to_string(),
            latency: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_record_counts_every_attempt() {
        let mut stats = RequestStats::new().unwrap();
        stats.record(&status(200, 10));
        stats.record(&status(404, 20));
        stats.record(&status(200, 30));
        stats.record(&error());

        assert_eq!(stats.attempted(), 4);
        assert_eq!(stats.errors(), 1);
        assert_eq!(stats.status_counts().get(&200), Some(&2));
        assert_eq!(stats.status_counts().get(&404), Some(&1));
        assert_eq!(stats.bytes_total(), 300);
    }

    #[test]
    fn test_merge_combines_workers() {
        let mut a = RequestStats::new().unwrap();
        a.record(&status(200, 5));
        a.record(&error());
        let mut b = RequestStats::new().unwrap();
        b.record(&status(200, 50));
        b.record(&status(500, 7));

        a.merge(&b).unwrap();
        assert_eq!(a.attempted(), 4);
        assert_eq!(a.errors(), 1);
        assert_eq!(a.status_counts().get(&200), Some(&2));
        assert_eq!(a.status_counts().get(&500), Some(&1));

        let latency = a.latency();
        assert!(latency.min_ms >= 4.9 && latency.min_ms <= 5.1);
        assert!(latency.max_ms >= 49.0 && latency.max_ms <= 51.0);
    }

    #[test]
    fn test_latency_empty_when_only_errors() {
        let mut stats = RequestStats::new().unwrap();
        stats.record(&error());
        assert_eq!(stats.latency(), LatencySummary::default());
    }

    #[test]
    fn test_merge_fails_past_bounded_range() {
        let mut bounded = RequestStats::bounded(1_000).unwrap();
        let mut slow = RequestStats::new().unwrap();
        slow.record(&status(200, 10_000));

        assert!(matches!(
            bounded.merge(&slow),
            Err(GeneratorError::HistogramMerge(_))
        ));
        assert_eq!(bounded.attempted(), 0);
    }

    fn active_workers(handle: &PrometheusHandle) -> f64 {
        handle
            .render()
            .lines()
            .find_map(|line| line.strip_prefix("loadgen_active_workers "))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0.0)
    }

    #[test]
    fn test_active_worker_released_when_task_aborted() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (started_tx, started_rx) = tokio::sync::oneshot::channel();
                let mut tasks = tokio::task::JoinSet::new();
                tasks.spawn(async move {
                    let _active = ActiveWorker::start();
                    started_tx.send(()).ok();
                    std::future::pending::<()>().await;
                });

                started_rx.await.unwrap();
                assert_eq!(active_workers(&handle), 1.0);

                tasks.abort_all();
                let joined = tasks.join_next().await.unwrap();
                assert!(joined.unwrap_err().is_cancelled());
                assert_eq!(active_workers(&handle), 0.0);
            });
        });
    }

    #[test]
    fn test_drive_summary_accumulates() {
        let mut stats = RequestStats::new().unwrap();
        for _ in 0..6 {
            stats.record(&status(200, 1));
        }
        stats.record(&error());
        let report = CycleReport::new(1, "low", Utc::now(), Duration::from_secs(1), 2, 2, &stats);
        assert_eq!(report.responses(), 6);

        let mut summary = DriveSummary::default();
        summary.record(&report);
        summary.record(&report);
        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.requests_attempted, 14);
        assert_eq!(summary.errors, 2);
    }
}
