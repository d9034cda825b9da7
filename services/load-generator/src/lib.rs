//! Concurrent HTTP load generator.
//!
//! This crate provides:
//! - A registry of named stress profiles with a total lookup
//! - Uniform-random endpoint selection per worker
//! - Bounded worker-pool cycles with join semantics
//! - A cycle driver that pauses between rounds until shut down
//! - Per-cycle reporting (log, table, JSON) and Prometheus metrics

pub mod config;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod profile;
pub mod report;
pub mod runner;
pub mod worker;

pub use config::{Args, GeneratorConfig, LogFormat, ProfileFile, SummaryFormat};
pub use endpoints::EndpointPicker;
pub use error::{GeneratorError, GeneratorResult};
pub use crate::metrics::{CycleReport, DriveSummary, RequestOutcome, WorkerReport};
pub use profile::{EndpointSet, FocusMode, ProfileOverrides, ProfileRegistry, StressProfile};
pub use runner::LoadRunner;
pub use worker::run_worker;
