//! Cycle summary formatting.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use tracing::{info, warn};

use crate::config::SummaryFormat;
use crate::metrics::CycleReport;
use crate::profile::ProfileRegistry;

/// Output a finished cycle in the requested format.
pub fn emit(report: &CycleReport, format: SummaryFormat) {
    match format {
        SummaryFormat::Log => {
            info!(
                cycle = report.cycle,
                profile = %report.profile,
                elapsed_secs = report.elapsed_secs,
                workers_completed = report.workers_completed,
                requests = report.requests_attempted,
                responses = report.responses(),
                errors = report.errors,
                p50_ms = report.latency.p50_ms,
                p99_ms = report.latency.p99_ms,
                "Cycle complete"
            );
        }
        SummaryFormat::Table => println!("{}", format_table(report)),
        SummaryFormat::Json => match format_json(report) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "Failed to serialize cycle report"),
        },
    }
}

/// Format a cycle report as a console table.
pub fn format_table(report: &CycleReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![format!(
            "Cycle {} ({})",
            report.cycle, report.profile
        )]);

    table.add_row(vec!["Duration:", &format!("{:.1}s", report.elapsed_secs)]);
    table.add_row(vec![
        "Workers:",
        &format!("{}/{}", report.workers_completed, report.workers),
    ]);
    table.add_row(vec![
        "Requests:",
        &format!("{}", report.requests_attempted),
    ]);
    table.add_row(vec!["Errors:", &format!("{}", report.errors)]);

    table.add_row(vec!["", ""]);
    for (code, count) in &report.status_counts {
        table.add_row(vec![format!("HTTP {}:", code), count.to_string()]);
    }

    table.add_row(vec!["", ""]);
    table.add_row(vec!["Latency (ms)", "p50 / p90 / p99 / max"]);
    table.add_row(vec![
        "",
        &format!(
            "{:.1} / {:.1} / {:.1} / {:.1}",
            report.latency.p50_ms,
            report.latency.p90_ms,
            report.latency.p99_ms,
            report.latency.max_ms
        ),
    ]);

    table.to_string()
}

/// Format a cycle report as JSON.
pub fn format_json(report: &CycleReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Format the profile registry for `--list-profiles`.
pub fn format_registry(registry: &ProfileRegistry) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Profile",
            "Workers",
            "Requests/worker",
            "Delay",
            "Timeout",
            "Focus",
            "Endpoints",
        ]);

    for profile in registry.profiles() {
        table.add_row(vec![
            profile.name.clone(),
            profile.worker_count.to_string(),
            profile.requests_per_worker.to_string(),
            format!("{}ms", profile.delay.as_millis()),
            format!("{}s", profile.request_timeout.as_secs()),
            profile.focus.to_string(),
            profile.endpoints.join("\n"),
        ]);
    }

    format!(
        "Endpoint set: {}\n{}",
        registry.endpoint_set(),
        table
    )
}
