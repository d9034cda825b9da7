//! Error types for the load generator.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using GeneratorError.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors raised while configuring or running the generator.
///
/// Individual request failures are never represented here: they are logged
/// by the worker and counted in the cycle report.
#[derive(Debug, Error)]
pub enum GeneratorError {
    // === Configuration Errors ===
    #[error("Invalid target URL '{url}': {message}")]
    InvalidTargetUrl { url: String, message: String },

    #[error("Invalid profile '{profile}': {message}")]
    InvalidProfile { profile: String, message: String },

    #[error("Failed to read profile file {path}: {source}")]
    ProfileFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile file {path}: {source}")]
    ProfileFileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    // === Runtime Errors ===
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Latency histogram creation failed: {0}")]
    HistogramCreation(#[from] hdrhistogram::CreationError),

    #[error("Latency histogram merge failed: {0}")]
    HistogramMerge(#[from] hdrhistogram::AdditionError),

    #[error("Metrics exporter failed to start: {0}")]
    MetricsExporter(String),
}

impl GeneratorError {
    /// Shorthand for profile validation failures.
    pub fn invalid_profile(profile: &str, message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            profile: profile.to_string(),
            message: message.into(),
        }
    }
}
