//! Seeded random provider shared by every consumer of one simulation run.

use rand::distr::{Distribution, StandardUniform, uniform::SampleUniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use diskchaos_core::RandomProvider;

/// Deterministic random provider backed by a single seeded `ChaCha8Rng`.
///
/// Clones share the same generator, so the order of draws across all holders
/// (fault injector, chaos files, workloads) defines the run. Two providers
/// built from the same seed and asked the same questions in the same order
/// give the same answers.
#[derive(Debug, Clone)]
pub struct SimRandomProvider {
    rng: Rc<RefCell<ChaCha8Rng>>,
    seed: u64,
}

impl SimRandomProvider {
    /// Create a new provider seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Rc::new(RefCell::new(ChaCha8Rng::seed_from_u64(seed))),
            seed,
        }
    }

    /// The seed this provider was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomProvider for SimRandomProvider {
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.rng.borrow_mut().random()
    }

    fn random_range<T>(&self, range: Range<T>) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        self.rng.borrow_mut().random_range(range)
    }

    fn random_ratio(&self) -> f64 {
        self.rng.borrow_mut().random()
    }
}
