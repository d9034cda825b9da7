//! Command line, environment and profile file configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::error::{GeneratorError, GeneratorResult};
use crate::profile::{EndpointSet, FocusMode, ProfileOverrides, ProfileRegistry, StressProfile};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// How each completed cycle is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// One structured log line
    Log,
    /// Console table
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "load-generator")]
#[command(about = "Drives concurrent HTTP load against a target service using named stress profiles")]
pub struct Args {
    /// Base URL of the system under test
    #[arg(long, env = "TARGET_URL", default_value = "http://web-app")]
    pub target_url: String,

    /// Stress profile name (unknown names fall back to "low")
    #[arg(long, env = "STRESS_LEVEL", default_value = "low")]
    pub stress_level: String,

    /// Built-in profile flavour: full or basic
    #[arg(long, env = "ENDPOINT_SET", default_value = "full")]
    pub endpoint_set: EndpointSet,

    /// YAML file adding or replacing profiles
    #[arg(long, env = "PROFILES_FILE")]
    pub profiles_file: Option<PathBuf>,

    /// Pause between cycles in seconds
    #[arg(long, env = "CYCLE_PAUSE_SECS", default_value = "10")]
    pub cycle_pause_secs: u64,

    /// Stop after this many cycles (default: run forever)
    #[arg(long, env = "MAX_CYCLES")]
    pub max_cycles: Option<u64>,

    /// RNG seed for reproducible endpoint selection
    #[arg(long, env = "STRESS_SEED")]
    pub seed: Option<u64>,

    /// Override worker count
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override requests per worker
    #[arg(long)]
    pub requests_per_worker: Option<u64>,

    /// Override delay between requests in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Override per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Port for the Prometheus metrics listener (disabled if unset)
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Per-cycle summary output
    #[arg(long, value_enum, default_value = "log")]
    pub summary: SummaryFormat,

    /// Print the profile registry and exit
    #[arg(long)]
    pub list_profiles: bool,
}

impl Args {
    /// Built-in registry for the selected flavour, extended by the profile
    /// file if one was given.
    pub fn registry(&self) -> GeneratorResult<ProfileRegistry> {
        let mut registry = ProfileRegistry::builtin(self.endpoint_set);
        if let Some(path) = &self.profiles_file {
            registry.apply_file(ProfileFile::from_file(path)?)?;
        }
        Ok(registry)
    }

    pub fn overrides(&self) -> ProfileOverrides {
        ProfileOverrides {
            workers: self.workers,
            requests_per_worker: self.requests_per_worker,
            delay: self.delay_ms.map(Duration::from_millis),
            request_timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Fully resolved settings for one generator run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Normalized base URL, never ending in '/'.
    pub target_url: String,
    /// Name the operator asked for, which may differ from `profile.name`.
    pub requested_profile: String,
    pub profile: StressProfile,
    pub cycle_pause: Duration,
    pub max_cycles: Option<u64>,
    pub seed: Option<u64>,
    pub summary: SummaryFormat,
}

impl GeneratorConfig {
    /// Resolve the active profile and validate everything.
    pub fn from_args(args: &Args, registry: &ProfileRegistry) -> GeneratorResult<Self> {
        let target_url = normalize_target_url(&args.target_url)?;
        let profile = args.overrides().apply(registry.resolve(&args.stress_level))?;

        Ok(Self {
            target_url,
            requested_profile: args.stress_level.clone(),
            profile,
            cycle_pause: Duration::from_secs(args.cycle_pause_secs),
            max_cycles: args.max_cycles,
            seed: args.seed,
            summary: args.summary,
        })
    }

    /// True when the requested name was not in the registry.
    pub fn used_fallback(&self) -> bool {
        self.requested_profile != self.profile.name
    }
}

/// Validate a base URL and strip trailing slashes so that appending an
/// endpoint never produces `//`.
pub fn normalize_target_url(raw: &str) -> GeneratorResult<String> {
    let trimmed = raw.trim();
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| GeneratorError::InvalidTargetUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(GeneratorError::InvalidTargetUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(GeneratorError::InvalidTargetUrl {
            url: raw.to_string(),
            message: "base URL must not carry a query or fragment".to_string(),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Profile definitions loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileFile {
    pub profiles: Vec<ProfileSpec>,
}

/// One profile entry in a profile file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    pub workers: usize,
    pub requests_per_worker: u64,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub focus: FocusMode,
    /// Defaults to the flavour's timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Replaces the focus/flavour candidates when present.
    #[serde(default)]
    pub endpoints: Option<Vec<String>>,
}

impl ProfileFile {
    /// Load profile definitions from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> GeneratorResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| GeneratorError::ProfileFileRead {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::from_str(&content).map_err(|source| GeneratorError::ProfileFileParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ProfileSpec {
    pub fn into_profile(self, set: EndpointSet) -> StressProfile {
        let mut profile = StressProfile::new(
            &self.name,
            set,
            self.workers,
            self.requests_per_worker,
            Duration::from_millis(self.delay_ms),
            self.focus,
        );
        if let Some(secs) = self.timeout_secs {
            profile.request_timeout = Duration::from_secs(secs);
        }
        if let Some(endpoints) = self.endpoints {
            profile.endpoints = endpoints;
        }
        profile
    }
}
