//! Endpoint candidate lists and per-worker random selection.

use rand::prelude::*;

/// Default candidates against the resource-intensive demo application.
pub const FULL: &[&str] = &[
    "/",
    "/api/stats",
    "/health",
    "/api/cpu-intensive?iterations=100000",
    "/api/memory-intensive?size_mb=5",
    "/api/database-intensive?operations=50",
    "/api/combined-stress?duration=5",
];

/// Candidates against a plain static web server. `/non-existent` is a
/// deliberate 404.
pub const BASIC: &[&str] = &["/", "/index.html", "/health", "/non-existent"];

pub const CPU_FOCUS: &[&str] = &["/api/cpu-intensive?iterations=500000"];

pub const MEMORY_FOCUS: &[&str] = &["/api/memory-intensive?size_mb=20"];

/// Picks endpoints uniformly at random from a fixed candidate set.
///
/// Each worker owns one picker, so no RNG state is shared between workers.
pub struct EndpointPicker<'a> {
    candidates: &'a [String],
    rng: StdRng,
}

impl<'a> EndpointPicker<'a> {
    /// Create a picker for `worker_id`.
    ///
    /// With a seed, worker `i` draws from `seed + i`, which makes a run
    /// reproducible while keeping workers on distinct streams.
    pub fn new(candidates: &'a [String], seed: Option<u64>, worker_id: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
            None => StdRng::from_entropy(),
        };
        Self { candidates, rng }
    }

    /// Next endpoint. Returns `None` only for an empty candidate set, which
    /// profile validation rules out.
    pub fn pick(&mut self) -> Option<&'a str> {
        let candidates = self.candidates;
        candidates.choose(&mut self.rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn owned(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_pick_stays_within_candidates() {
        let candidates = owned(FULL);
        let allowed: HashSet<&str> = FULL.iter().copied().collect();
        let mut picker = EndpointPicker::new(&candidates, None, 0);

        for _ in 0..1000 {
            let endpoint = picker.pick().unwrap();
            assert!(allowed.contains(endpoint), "unexpected endpoint {}", endpoint);
        }
    }

    #[test]
    fn test_pick_covers_all_candidates() {
        let candidates = owned(BASIC);
        let mut picker = EndpointPicker::new(&candidates, Some(7), 0);

        let seen: HashSet<&str> = (0..500).filter_map(|_| picker.pick()).collect();
        assert_eq!(seen.len(), BASIC.len());
    }

    #[test]
    fn test_single_candidate_always_picked() {
        let candidates = owned(CPU_FOCUS);
        let mut picker = EndpointPicker::new(&candidates, None, 3);

        for _ in 0..50 {
            assert_eq!(picker.pick(), Some("/api/cpu-intensive?iterations=500000"));
        }
    }

    #[test]
    fn test_seeded_pickers_are_reproducible() {
        let candidates = owned(FULL);
        let mut a = EndpointPicker::new(&candidates, Some(42), 1);
        let mut b = EndpointPicker::new(&candidates, Some(42), 1);

        let seq_a: Vec<_> = (0..32).map(|_| a.pick()).collect();
        let seq_b: Vec<_> = (0..32).map(|_| b.pick()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_empty_candidates() {
        let candidates: Vec<String> = Vec::new();
        let mut picker = EndpointPicker::new(&candidates, None, 0);
        assert_eq!(picker.pick(), None);
    }
}
