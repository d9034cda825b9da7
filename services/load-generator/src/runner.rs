//! Cycle orchestration: dispatch a bounded worker pool, join it, pause, repeat.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info};

use crate::config::{GeneratorConfig, SummaryFormat};
use crate::error::GeneratorResult;
use crate::metrics::{
    self, ActiveWorker, CycleReport, DriveSummary, RequestStats, WorkerReport,
};
use crate::profile::StressProfile;
use crate::report;
use crate::worker::run_worker;

/// Drives a single profile against a single target.
pub struct LoadRunner {
    client: reqwest::Client,
    target_url: String,
    profile: Arc<StressProfile>,
    seed: Option<u64>,
    cycle_pause: Duration,
    max_cycles: Option<u64>,
    summary: SummaryFormat,
}

impl LoadRunner {
    /// Create a runner with one shared connection pool sized to the worker count.
    pub fn new(config: &GeneratorConfig) -> GeneratorResult<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.profile.worker_count)
            .build()?;

        Ok(Self {
            client,
            target_url: config.target_url.clone(),
            profile: Arc::new(config.profile.clone()),
            seed: config.seed,
            cycle_pause: config.cycle_pause,
            max_cycles: config.max_cycles,
            summary: config.summary,
        })
    }

    pub fn profile(&self) -> &StressProfile {
        &self.profile
    }

    /// Run one cycle: start every worker at once and wait for all of them.
    ///
    /// Returns only after each worker has issued its full quota. A worker
    /// that fails or panics is logged and left out of the report.
    pub async fn run_cycle(&self, cycle: u64) -> GeneratorResult<CycleReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let workers = self.profile.worker_count;
        let mut stats = RequestStats::new()?;
        let mut tasks = JoinSet::new();

        for worker_id in 0..workers {
            let client = self.client.clone();
            let profile = self.profile.clone();
            let target_url = self.target_url.clone();
            let seed = self.seed;

            tasks.spawn(async move {
                let _active = ActiveWorker::start();
                let result = run_worker(&client, worker_id, &profile, &target_url, seed).await;
                (worker_id, result)
            });
        }

        let mut workers_completed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => {
                    if absorb(&mut stats, cycle, &report) {
                        workers_completed += 1;
                    }
                }
                Ok((worker_id, Err(e))) => {
                    error!(cycle, worker = worker_id, error = %e, "Worker failed");
                }
                Err(e) => {
                    error!(cycle, error = %e, "Worker task aborted");
                }
            }
        }

        Ok(CycleReport::new(
            cycle,
            &self.profile.name,
            started_at,
            start.elapsed(),
            workers,
            workers_completed,
            &stats,
        ))
    }

    /// Run cycles back to back with a fixed pause in between.
    ///
    /// There is no termination condition of its own: the loop only ends when
    /// `shutdown` fires (or its sender is dropped) or `max_cycles` is reached.
    /// Shutdown during a cycle aborts the in-flight workers.
    pub async fn drive_forever(&self, mut shutdown: broadcast::Receiver<()>) -> DriveSummary {
        let mut summary = DriveSummary::default();
        let mut cycle = 0u64;

        loop {
            cycle += 1;
            info!(
                cycle,
                profile = %self.profile.name,
                workers = self.profile.worker_count,
                requests = self.profile.requests_per_cycle(),
                "Starting cycle"
            );

            tokio::select! {
                result = self.run_cycle(cycle) => match result {
                    Ok(cycle_report) => {
                        summary.record(&cycle_report);
                        metrics::record_cycle(&cycle_report);
                        report::emit(&cycle_report, self.summary);
                    }
                    Err(e) => error!(cycle, error = %e, "Cycle failed"),
                },
                _ = shutdown.recv() => {
                    info!(cycle, "Shutdown requested, abandoning in-flight cycle");
                    break;
                }
            }

            if self.max_cycles.is_some_and(|max| cycle >= max) {
                info!(cycles = cycle, "Reached cycle limit");
                break;
            }

            info!(
                pause_secs = self.cycle_pause.as_secs_f64(),
                "Completed cycle. Waiting {:.0} seconds before next cycle...",
                self.cycle_pause.as_secs_f64()
            );
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down load generator");
                    break;
                }
                _ = sleep(self.cycle_pause) => {}
            }
        }

        summary
    }
}

/// Fold one worker's tallies into the cycle totals. A worker whose stats
/// cannot be merged is logged and left out of the report.
fn absorb(stats: &mut RequestStats, cycle: u64, report: &WorkerReport) -> bool {
    match stats.merge(&report.stats) {
        Ok(()) => true,
        Err(e) => {
            error!(
                cycle,
                worker = report.worker_id,
                error = %e,
                "Failed to merge worker stats"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RequestOutcome;

    fn report(worker_id: usize, latency_ms: u64) -> WorkerReport {
        let mut stats = RequestStats::new().unwrap();
        stats.record(&RequestOutcome::Status {
            code: 200,
            latency: Duration::from_millis(latency_ms),
            bytes: 10,
        });
        WorkerReport { worker_id, stats }
    }

    #[test]
    fn test_absorb_skips_unmergeable_worker_and_continues() {
        let mut stats = RequestStats::bounded(1_000_000).unwrap();

        assert!(!absorb(&mut stats, 1, &report(0, 10_000)));
        assert!(absorb(&mut stats, 1, &report(1, 5)));
        assert!(absorb(&mut stats, 1, &report(2, 7)));

        assert_eq!(stats.attempted(), 2);
        assert_eq!(stats.status_counts().get(&200), Some(&2));
    }
}
