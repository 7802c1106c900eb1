//! Random number generation provider abstraction.
//!
//! Request identifiers are only as good as the randomness behind them, so the
//! production provider uses the thread-local `ThreadRng` (a periodically
//! reseeded ChaCha CSPRNG). Tests use [`SeededRandomProvider`] for
//! reproducible identifiers.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distr::{Distribution, StandardUniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Provider trait for random number generation.
pub trait RandomProvider: Clone + 'static {
    /// Generate a random value of type T.
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>;
}

/// Production random provider backed by `rand::rng()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandomProvider;

impl ThreadRandomProvider {
    /// Create a new production random provider.
    pub fn new() -> Self {
        Self
    }
}

impl RandomProvider for ThreadRandomProvider {
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        rand::rng().random()
    }
}

/// Deterministic random provider seeded from a `u64`.
///
/// Clones share the same generator state, so two clones never replay the
/// same sequence.
#[derive(Clone, Debug)]
pub struct SeededRandomProvider {
    rng: Rc<RefCell<ChaCha8Rng>>,
}

impl SeededRandomProvider {
    /// Create a provider whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Rc::new(RefCell::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }
}

impl RandomProvider for SeededRandomProvider {
    fn random<T>(&self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.rng.borrow_mut().random()
    }
}
