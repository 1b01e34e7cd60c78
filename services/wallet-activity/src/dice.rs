//! Seedable random source for action decisions

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Random source used by every decision in a session.
///
/// Seeded dice make a wallet's choices reproducible.
#[derive(Debug, Clone)]
pub struct Dice {
    rng: StdRng,
}

impl Dice {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Dice for one wallet session, derived from an optional run seed
    pub fn for_wallet(seed: Option<u64>, index: usize) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed.wrapping_add(index as u64)),
            None => Self::from_entropy(),
        }
    }

    /// Uniform integer in `[min, max]`
    pub fn between(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    pub fn flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
