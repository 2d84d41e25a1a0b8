//! Injectable randomness for battle resolution and monster generation.
//!
//! Every probabilistic decision (variance, miss, dodge, trigger chance, monster
//! rolls) goes through a [`Roller`], so a seeded roller reproduces a battle
//! exactly and tests can script the outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// A source of uniform samples in `[0, 1)`.
pub trait Roller: Send + Sync {
    fn roll(&mut self) -> f32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize {
        ((self.roll() * len as f32) as usize).min(len.saturating_sub(1))
    }

    /// True with probability `percent / 100`.
    fn percent(&mut self, percent: f32) -> bool {
        self.roll() * 100.0 < percent.clamp(0.0, 100.0)
    }
}

/// `StdRng`-backed roller; deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct SeededRoller {
    rng: StdRng,
}

impl SeededRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Roller for SeededRoller {
    fn roll(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

/// Replays a fixed sequence of samples, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    samples: Vec<f32>,
    next: usize,
}

impl ScriptedRoller {
    pub fn new(samples: Vec<f32>) -> Self {
        assert!(!samples.is_empty(), "scripted roller needs at least one sample");
        Self { samples, next: 0 }
    }

    /// Always returns `value`.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl Roller for ScriptedRoller {
    fn roll(&mut self) -> f32 {
        let v = self.samples[self.next % self.samples.len()];
        self.next = self.next.wrapping_add(1);
        v
    }
}

/// Produces a fresh roller for each battle.
pub type RollerFactory = Arc<dyn Fn() -> Box<dyn Roller> + Send + Sync>;

pub fn entropy_rollers() -> RollerFactory {
    Arc::new(|| Box::new(SeededRoller::from_entropy()))
}

/// Battle `n` (0-based) gets seed `base + n`.
pub fn seeded_rollers(base: u64) -> RollerFactory {
    let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
    Arc::new(move || {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Box::new(SeededRoller::new(base.wrapping_add(n)))
    })
}
