//! Load generator service.
//!
//! Resolves a named stress profile and keeps a target service under
//! concurrent HTTP load, one cycle after another, until stopped.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use load_generator::{report, Args, GeneratorConfig, LoadRunner, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let registry = args.registry().context("Failed to load stress profiles")?;
    if args.list_profiles {
        println!("{}", report::format_registry(&registry));
        return Ok(());
    }

    init_tracing(&args)?;

    if let Some(port) = args.metrics_port {
        load_generator::metrics::install_exporter(port)?;
        info!(port, "Prometheus metrics exporter listening");
    }

    let config = GeneratorConfig::from_args(&args, &registry).context("Invalid configuration")?;
    if config.used_fallback() {
        warn!(
            requested = %config.requested_profile,
            available = ?registry.names(),
            "Unknown stress level, falling back to '{}'",
            config.profile.name
        );
    }

    info!("Starting stress test - Level: {}", config.requested_profile);
    info!(
        target = %config.target_url,
        profile = %config.profile.name,
        workers = config.profile.worker_count,
        requests_per_worker = config.profile.requests_per_worker,
        delay_ms = config.profile.delay.as_millis() as u64,
        timeout_secs = config.profile.request_timeout.as_secs(),
        focus = %config.profile.focus,
        endpoints = ?config.profile.endpoints,
        "Configuration"
    );

    let runner = LoadRunner::new(&config).context("Failed to create load runner")?;

    // Handle Ctrl+C
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(()).ok();
    });

    let summary = runner.drive_forever(shutdown_rx).await;
    info!(
        cycles = summary.cycles_completed,
        requests = summary.requests_attempted,
        errors = summary.errors,
        "Load generator stopped"
    );

    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true);

    match args.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    Ok(())
}
