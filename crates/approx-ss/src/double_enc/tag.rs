use std::sync::Arc;

use fhe_math::rq::{Poly, Representation};
use fhe_traits::Serialize;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::params::DoubleEncryptionParameters;

/// Seed of a [`Tag`].
pub type TagSeed = <ChaCha8Rng as SeedableRng>::Seed;

/// Common random polynomial binding all ciphertexts of one run.
///
/// The polynomial is expanded from a public 32-byte seed, so two tags are
/// equal exactly when their seeds are.
#[derive(Debug, Clone)]
pub struct Tag {
    seed: TagSeed,
    pub(crate) poly: Poly,
}

impl Tag {
    /// Generate a fresh tag.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<DoubleEncryptionParameters>, rng: &mut R) -> Self {
        Self::from_seed(par, rng.gen())
    }

    /// Expand a tag from a shared seed.
    pub fn from_seed(par: &Arc<DoubleEncryptionParameters>, seed: TagSeed) -> Self {
        let poly = Poly::random_from_seed(par.ctx(), Representation::Ntt, seed);
        Self { seed, poly }
    }

    /// Public seed of the tag.
    pub fn seed(&self) -> &TagSeed {
        &self.seed
    }

    /// Whether material carrying `seed` was produced under this tag.
    pub fn matches(&self, seed: &TagSeed) -> bool {
        &self.seed == seed
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
    }
}

impl Eq for Tag {}

impl Serialize for Tag {
    fn to_bytes(&self) -> Vec<u8> {
        self.poly.to_bytes()
    }
}
