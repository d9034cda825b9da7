//! A single load worker: a fixed quota of sequential requests.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::endpoints::EndpointPicker;
use crate::error::GeneratorResult;
use crate::metrics::{self, RequestOutcome, RequestStats, WorkerReport};
use crate::profile::StressProfile;

/// Issue `profile.requests_per_worker` GET requests against `target_url`.
///
/// Every request is attempted regardless of how the previous one went.
/// Failures are logged and counted, never retried, and the worker still
/// sleeps `profile.delay` before its next request.
pub async fn run_worker(
    client: &reqwest::Client,
    worker_id: usize,
    profile: &StressProfile,
    target_url: &str,
    seed: Option<u64>,
) -> GeneratorResult<WorkerReport> {
    let mut stats = RequestStats::new()?;
    let mut picker = EndpointPicker::new(&profile.endpoints, seed, worker_id);

    for i in 0..profile.requests_per_worker {
        let Some(endpoint) = picker.pick() else {
            break;
        };
        let request = i + 1;
        let url = format!("{}{}", target_url, endpoint);

        let outcome = execute_request(client, &url, profile.request_timeout).await;
        match &outcome {
            RequestOutcome::Status { code, latency, .. } => {
                info!(
                    worker = worker_id,
                    request,
                    endpoint,
                    status = code,
                    latency_ms = latency.as_millis() as u64,
                    "Worker {}: Request {} to {} - Status: {}",
                    worker_id,
                    request,
                    endpoint,
                    code
                );
            }
            RequestOutcome::Error { message, .. } => {
                warn!(
                    worker = worker_id,
                    request,
                    endpoint,
                    error = %message,
                    "Worker {}: Request {} to {} - Error: {}",
                    worker_id,
                    request,
                    endpoint,
                    message
                );
            }
        }
        metrics::record_request(&outcome);
        stats.record(&outcome);

        if !profile.delay.is_zero() {
            sleep(profile.delay).await;
        }
    }

    Ok(WorkerReport { worker_id, stats })
}

/// Execute a single GET with a per-request timeout. Any status code counts
/// as a response; only transport failures become errors.
pub async fn execute_request(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> RequestOutcome {
    let start = Instant::now();

    match client.get(url).timeout(timeout).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            match response.bytes().await {
                Ok(body) => RequestOutcome::Status {
                    code,
                    latency: start.elapsed(),
                    bytes: body.len(),
                },
                Err(e) => RequestOutcome::Error {
                    message: format!("HTTP {} but body read failed: {}", code, e),
                    latency: start.elapsed(),
                },
            }
        }
        Err(e) => RequestOutcome::Error {
            message: describe_error(&e),
            latency: start.elapsed(),
        },
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
