//! Stress profiles and the named profile registry.
//!
//! A profile fixes the shape of one cycle: how many workers run, how many
//! requests each worker issues, how long a worker pauses between requests,
//! and which endpoints it may hit. Profiles are resolved once at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ProfileFile;
use crate::endpoints;
use crate::error::{GeneratorError, GeneratorResult};

/// Name of the profile every unknown name falls back to.
pub const DEFAULT_PROFILE: &str = "low";

/// Narrows endpoint selection to a single resource-intensive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    #[default]
    None,
    Cpu,
    Memory,
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusMode::None => write!(f, "none"),
            FocusMode::Cpu => write!(f, "cpu"),
            FocusMode::Memory => write!(f, "memory"),
        }
    }
}

/// Built-in registry flavour, one per kind of target service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSet {
    /// Resource-intensive demo application (API endpoints, 30s timeout).
    #[default]
    Full,
    /// Plain static web server (a handful of pages, 5s timeout).
    Basic,
}

impl EndpointSet {
    /// Per-request timeout used by this flavour's built-in profiles.
    pub fn request_timeout(self) -> Duration {
        match self {
            EndpointSet::Full => Duration::from_secs(30),
            EndpointSet::Basic => Duration::from_secs(5),
        }
    }

    /// Candidate endpoints for a profile with the given focus.
    pub fn candidates(self, focus: FocusMode) -> Vec<String> {
        let paths: &[&str] = match (self, focus) {
            (_, FocusMode::Cpu) => endpoints::CPU_FOCUS,
            (_, FocusMode::Memory) => endpoints::MEMORY_FOCUS,
            (EndpointSet::Full, FocusMode::None) => endpoints::FULL,
            (EndpointSet::Basic, FocusMode::None) => endpoints::BASIC,
        };
        paths.iter().map(|p| p.to_string()).collect()
    }
}

impl fmt::Display for EndpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSet::Full => write!(f, "full"),
            EndpointSet::Basic => write!(f, "basic"),
        }
    }
}

impl FromStr for EndpointSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(EndpointSet::Full),
            "basic" => Ok(EndpointSet::Basic),
            other => Err(format!(
                "unknown endpoint set '{}', expected 'full' or 'basic'",
                other
            )),
        }
    }
}

/// A named load shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressProfile {
    pub name: String,
    pub worker_count: usize,
    pub requests_per_worker: u64,
    pub delay: Duration,
    pub focus: FocusMode,
    pub request_timeout: Duration,
    /// Uniform-random candidates; repeats are expected.
    pub endpoints: Vec<String>,
}

impl StressProfile {
    /// Build a profile whose endpoints and timeout come from `set`.
    pub fn new(
        name: &str,
        set: EndpointSet,
        worker_count: usize,
        requests_per_worker: u64,
        delay: Duration,
        focus: FocusMode,
    ) -> Self {
        Self {
            name: name.to_string(),
            worker_count,
            requests_per_worker,
            delay,
            focus,
            request_timeout: set.request_timeout(),
            endpoints: set.candidates(focus),
        }
    }

    /// Requests one full cycle issues.
    pub fn requests_per_cycle(&self) -> u64 {
        self.worker_count as u64 * self.requests_per_worker
    }

    /// Validate profile values.
    pub fn validate(&self) -> GeneratorResult<()> {
        if self.worker_count == 0 {
            return Err(GeneratorError::invalid_profile(&self.name, "workers must be > 0"));
        }
        if self.requests_per_worker == 0 {
            return Err(GeneratorError::invalid_profile(
                &self.name,
                "requests_per_worker must be > 0",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(GeneratorError::invalid_profile(&self.name, "timeout must be > 0"));
        }
        if self.endpoints.is_empty() {
            return Err(GeneratorError::invalid_profile(
                &self.name,
                "at least one endpoint must be specified",
            ));
        }
        if let Some(bad) = self.endpoints.iter().find(|e| !e.starts_with('/')) {
            return Err(GeneratorError::invalid_profile(
                &self.name,
                format!("endpoint '{}' must start with '/'", bad),
            ));
        }
        Ok(())
    }
}

/// Registry of named profiles with a total lookup.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    set: EndpointSet,
    profiles: BTreeMap<String, StressProfile>,
    fallback: StressProfile,
}

impl ProfileRegistry {
    /// The built-in profiles for a registry flavour.
    pub fn builtin(set: EndpointSet) -> Self {
        let ms = Duration::from_millis;
        let mut profiles = vec![
            StressProfile::new("low", set, 5, 10, ms(500), FocusMode::None),
            StressProfile::new("medium", set, 20, 100, ms(100), FocusMode::None),
            StressProfile::new("high", set, 50, 200, ms(50), FocusMode::None),
            StressProfile::new("extreme", set, 100, 5000, ms(1), FocusMode::None),
        ];

        match set {
            EndpointSet::Full => {
                profiles.push(StressProfile::new(
                    "cpu-intensive",
                    set,
                    10,
                    50,
                    ms(100),
                    FocusMode::Cpu,
                ));
                profiles.push(StressProfile::new(
                    "memory-intensive",
                    set,
                    10,
                    50,
                    ms(100),
                    FocusMode::Memory,
                ));
            }
            // The static-site flavour has no focus endpoints; its cpu-intensive
            // profile is just a very wide pool.
            EndpointSet::Basic => {
                profiles.push(StressProfile::new(
                    "cpu-intensive",
                    set,
                    200,
                    1000,
                    ms(1),
                    FocusMode::None,
                ));
            }
        }

        let fallback = profiles[0].clone();
        Self {
            set,
            profiles: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
            fallback,
        }
    }

    /// Flavour this registry was built for.
    pub fn endpoint_set(&self) -> EndpointSet {
        self.set
    }

    /// Look up a profile by exact name, falling back to `low`. Never fails.
    pub fn resolve(&self, name: &str) -> StressProfile {
        self.profiles.get(name).unwrap_or(&self.fallback).clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &StressProfile> {
        self.profiles.values()
    }

    /// Add or replace a profile after validating it.
    pub fn insert(&mut self, profile: StressProfile) -> GeneratorResult<()> {
        profile.validate()?;
        if profile.name == DEFAULT_PROFILE {
            self.fallback = profile.clone();
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Merge profiles from a profile file. Entries with an existing name
    /// replace the built-in definition.
    pub fn apply_file(&mut self, file: ProfileFile) -> GeneratorResult<()> {
        for spec in file.profiles {
            let profile = spec.into_profile(self.set);
            self.insert(profile)?;
        }
        Ok(())
    }
}

/// CLI overrides applied on top of the resolved profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub workers: Option<usize>,
    pub requests_per_worker: Option<u64>,
    pub delay: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        self.workers.is_none()
            && self.requests_per_worker.is_none()
            && self.delay.is_none()
            && self.request_timeout.is_none()
    }

    /// Apply overrides and re-validate the result.
    pub fn apply(&self, mut profile: StressProfile) -> GeneratorResult<StressProfile> {
        if let Some(w) = self.workers {
            profile.worker_count = w;
        }
        if let Some(r) = self.requests_per_worker {
            profile.requests_per_worker = r;
        }
        if let Some(d) = self.delay {
            profile.delay = d;
        }
        if let Some(t) = self.request_timeout {
            profile.request_timeout = t;
        }
        profile.validate()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_names_fall_back_to_low() {
        let registry = ProfileRegistry::builtin(EndpointSet::Full);
        let low = registry.resolve("low");

        for name in ["", "LOW", "ultra", "cpu", "medium "] {
            assert_eq!(registry.resolve(name), low, "name {:?}", name);
        }
        assert!(!registry.contains("ultra"));
    }

    #[test]
    fn test_builtin_full_profiles() {
        let registry = ProfileRegistry::builtin(EndpointSet::Full);
        assert_eq!(
            registry.names(),
            vec!["cpu-intensive", "extreme", "high", "low", "medium", "memory-intensive"]
        );

        let low = registry.resolve("low");
        assert_eq!(low.worker_count, 5);
        assert_eq!(low.requests_per_worker, 10);
        assert_eq!(low.delay, Duration::from_millis(500));
        assert_eq!(low.request_timeout, Duration::from_secs(30));
        assert_eq!(low.endpoints.len(), 7);
        assert_eq!(low.requests_per_cycle(), 50);

        let extreme = registry.resolve("extreme");
        assert_eq!(extreme.worker_count, 100);
        assert_eq!(extreme.requests_per_worker, 5000);
        assert_eq!(extreme.delay, Duration::from_millis(1));

        let cpu = registry.resolve("cpu-intensive");
        assert_eq!(cpu.focus, FocusMode::Cpu);
        assert_eq!(cpu.endpoints, vec!["/api/cpu-intensive?iterations=500000"]);

        let memory = registry.resolve("memory-intensive");
        assert_eq!(memory.focus, FocusMode::Memory);
        assert_eq!(memory.endpoints, vec!["/api/memory-intensive?size_mb=20"]);
    }

    #[test]
    fn test_builtin_basic_profiles() {
        let registry = ProfileRegistry::builtin(EndpointSet::Basic);
        assert!(!registry.contains("memory-intensive"));
        assert_eq!(registry.resolve("memory-intensive").name, "low");

        let cpu = registry.resolve("cpu-intensive");
        assert_eq!(cpu.worker_count, 200);
        assert_eq!(cpu.requests_per_worker, 1000);
        assert_eq!(cpu.focus, FocusMode::None);
        assert_eq!(cpu.request_timeout, Duration::from_secs(5));
        assert_eq!(
            cpu.endpoints,
            vec!["/", "/index.html", "/health", "/non-existent"]
        );
    }

    #[test]
    fn test_all_builtin_profiles_validate() {
        for set in [EndpointSet::Full, EndpointSet::Basic] {
            for profile in ProfileRegistry::builtin(set).profiles() {
                profile.validate().unwrap();
            }
        }
    }

    #[test]
    fn test_replacing_low_updates_fallback() {
        let mut registry = ProfileRegistry::builtin(EndpointSet::Full);
        let mut low = registry.resolve("low");
        low.worker_count = 2;
        registry.insert(low).unwrap();

        assert_eq!(registry.resolve("nope").worker_count, 2);
    }

    #[test]
    fn test_insert_rejects_invalid_profile() {
        let mut registry = ProfileRegistry::builtin(EndpointSet::Full);
        let mut bad = registry.resolve("low");
        bad.name = "broken".to_string();
        bad.endpoints = vec!["health".to_string()];

        let err = registry.insert(bad).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let profile = ProfileRegistry::builtin(EndpointSet::Full).resolve("medium");
        let overrides = ProfileOverrides {
            workers: Some(3),
            delay: Some(Duration::ZERO),
            ..Default::default()
        };

        let applied = overrides.apply(profile.clone()).unwrap();
        assert_eq!(applied.worker_count, 3);
        assert_eq!(applied.requests_per_worker, profile.requests_per_worker);
        assert_eq!(applied.delay, Duration::ZERO);

        let zero = ProfileOverrides {
            workers: Some(0),
            ..Default::default()
        };
        assert!(zero.apply(profile).is_err());
    }

    #[test]
    fn test_endpoint_set_parsing() {
        assert_eq!("full".parse::<EndpointSet>().unwrap(), EndpointSet::Full);
        assert_eq!("Basic".parse::<EndpointSet>().unwrap(), EndpointSet::Basic);
        assert!("heavy".parse::<EndpointSet>().is_err());
    }
}
