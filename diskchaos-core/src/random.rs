//! Random number generation provider abstraction.
//!
//! Every random decision the chaos layer takes (whether to corrupt a write,
//! which byte, which bit, how long a throttle lasts) goes through a
//! [`RandomProvider`] handle so a simulation run is reproducible from its seed.

use rand::distr::{Distribution, StandardUniform, uniform::SampleUniform};
use rand::Rng;
use std::cell::RefCell;
use std::ops::Range;

/// Provider trait for random number generation.
pub trait RandomProvider: Clone {
    /// Generate a random value of type T.
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>;

    /// Generate a random value within `range` (exclusive upper bound).
    ///
    /// # Panics
    ///
    /// Panics if the range is empty.
    fn random_range<T>(&self, range: Range<T>) -> T
    where
        T: SampleUniform + PartialOrd;

    /// Generate a random f64 in `[0.0, 1.0)`.
    fn random_ratio(&self) -> f64;

    /// Generate a random bool with the given probability of being true.
    fn random_bool(&self, probability: f64) -> bool {
        self.random_ratio() < probability
    }
}

/// Production random provider backed by the thread-local `rand` generator.
#[derive(Debug, Clone, Default)]
pub struct TokioRandomProvider;

impl TokioRandomProvider {
    /// Create a new production random provider.
    pub fn new() -> Self {
        Self
    }
}

thread_local! {
    static RNG: RefCell<rand::rngs::ThreadRng> = RefCell::new(rand::rng());
}

impl RandomProvider for TokioRandomProvider {
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        RNG.with(|rng| rng.borrow_mut().random())
    }

    fn random_range<T>(&self, range: Range<T>) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        RNG.with(|rng| rng.borrow_mut().random_range(range))
    }

    fn random_ratio(&self) -> f64 {
        RNG.with(|rng| rng.borrow_mut().random())
    }
}
