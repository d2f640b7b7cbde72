//! Deterministic RNG wrapper used by experiment resolution.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// RNG handle scoped to a single resolution.
///
/// The handle is a thin wrapper around `StdRng` that documents the seeding
/// policy used throughout the project. A seeded experiment builds its handle
/// with [`RngHandle::from_seed`], an unseeded one with
/// [`RngHandle::from_entropy`]. A fresh handle is constructed for every
/// resolution call; there is no process-wide generator, so seeding one
/// experiment can never perturb another's draw.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a deterministic handle from an experiment seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a non-deterministic handle from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
