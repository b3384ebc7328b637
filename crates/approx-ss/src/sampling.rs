//! Samplers for encryption errors, smudging noise and secret keys.

use rand::{seq::index, CryptoRng, Rng, RngCore};
use rand_distr::{Distribution, Normal};

use crate::{Error, Result};

/// Discrete Gaussian rounded from a continuous one, rejecting samples whose
/// magnitude exceeds `bound`.
#[derive(Debug, Clone)]
pub struct BoundedGaussian {
    sigma: f64,
    bound: u64,
    normal: Normal<f64>,
}

impl BoundedGaussian {
    /// Create a sampler of width `sigma` truncated at `bound`.
    pub fn new(sigma: f64, bound: u64) -> Result<Self> {
        if bound == 0 {
            return Err(Error::configuration("Sampler bound must be positive"));
        }
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| Error::configuration(format!("Invalid sampler width {sigma}: {e}")))?;
        Ok(Self {
            sigma,
            bound,
            normal,
        })
    }

    /// Width of the distribution.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Cutoff of the distribution.
    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Sample one value in `[-bound, bound]`.
    pub fn sample<R: RngCore + CryptoRng>(&self, rng: &mut R) -> i64 {
        loop {
            let x = self.normal.sample(rng).round();
            if x.abs() <= self.bound as f64 {
                return x as i64;
            }
        }
    }

    /// Sample `size` values in `[-bound, bound]`.
    pub fn sample_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<i64> {
        (0..size).map(|_| self.sample(rng)).collect()
    }
}

/// Sample a ternary vector of length `size`.
///
/// With `hamming_weight > 0` exactly that many coordinates are non-zero;
/// otherwise each coordinate is uniform in `{-1, 0, 1}`.
pub fn sample_ternary<R: RngCore + CryptoRng>(
    size: usize,
    hamming_weight: usize,
    rng: &mut R,
) -> Vec<i64> {
    let mut v = vec![0i64; size];
    if hamming_weight == 0 {
        v.iter_mut().for_each(|vi| *vi = rng.gen_range(-1..=1));
    } else {
        for i in index::sample(rng, size, hamming_weight.min(size)) {
            v[i] = if rng.gen::<bool>() { 1 } else { -1 };
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::{sample_ternary, BoundedGaussian};
    use proptest::prelude::*;
    use rand::{thread_rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn rejects_zero_bound() {
        assert!(BoundedGaussian::new(1.0, 0).is_err());
        assert!(BoundedGaussian::new(-1.0, 6).is_err());
    }

    #[test]
    fn smudging_width() {
        let sampler = BoundedGaussian::new(16.0 / 6.0, 16).unwrap();
        let v = sampler.sample_vec(4096, &mut thread_rng());
        assert!(v.iter().all(|x| x.abs() <= 16));
        // Not degenerate.
        assert!(v.iter().any(|x| *x != 0));
    }

    #[test]
    fn ternary_hamming_weight() {
        let mut rng = thread_rng();
        let v = sample_ternary(1024, 192, &mut rng);
        assert_eq!(v.iter().filter(|x| **x != 0).count(), 192);
        assert!(v.iter().all(|x| (-1..=1).contains(x)));

        let v = sample_ternary(1024, 0, &mut rng);
        assert!(v.iter().all(|x| (-1..=1).contains(x)));
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let sampler = BoundedGaussian::new(3.2, 19).unwrap();
        let a = sampler.sample_vec(64, &mut ChaCha20Rng::seed_from_u64(7));
        let b = sampler.sample_vec(64, &mut ChaCha20Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn samples_respect_cutoff(bound in 1u64..512, seed: u64) {
            let sampler = BoundedGaussian::new(bound as f64 / 6.0, bound).unwrap();
            let v = sampler.sample_vec(256, &mut ChaCha20Rng::seed_from_u64(seed));
            prop_assert!(v.iter().all(|x| x.unsigned_abs() <= bound));
        }
    }
}
