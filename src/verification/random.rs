// Random sources behind the outcome decider - the only place the crate draws randomness

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Uniform random draws in `[0, 1)`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Thread-local RNG, fresh entropy on every draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Seeded RNG for reproducible runs.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

#[derive(Debug, Default)]
struct Script {
    values: Vec<f64>,
    draws: usize,
}

/// Returns pre-configured values in order, cycling when exhausted.
///
/// Clones share the script, so a test can keep a handle to inspect how many
/// draws the workflow made. An empty script draws `1.0`, which is never below
/// any probability threshold.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script { values, draws: 0 })),
        }
    }

    /// Create with a single value returned for every draw.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> usize {
        self.lock().draws
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let mut script = self.lock();
        let value = if script.values.is_empty() {
            1.0
        } else {
            script.values[script.draws % script.values.len()]
        };
        script.draws += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_random_cycles_and_counts() {
        let mut source = ScriptedRandom::new(vec![0.01, 0.9]);
        let handle = source.clone();

        assert_eq!(source.next_unit(), 0.01);
        assert_eq!(source.next_unit(), 0.9);
        assert_eq!(source.next_unit(), 0.01);
        assert_eq!(handle.draws(), 3);
    }

    #[test]
    fn test_empty_script_never_crosses_a_threshold() {
        let mut source = ScriptedRandom::default();
        assert_eq!(source.next_unit(), 1.0);
    }

    #[test]
    fn test_seeded_random_is_reproducible_and_in_range() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);

        for _ in 0..100 {
            let value = a.next_unit();
            assert_eq!(value, b.next_unit());
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_thread_random_in_unit_interval() {
        let mut source = ThreadRandom;
        for _ in 0..100 {
            assert!((0.0..1.0).contains(&source.next_unit()));
        }
    }
}
