/// Smudging noise for round-1 parties.
///
/// Each round-1 party masks its share with a fresh polynomial whose
/// coefficients follow a discrete Gaussian of width `bound / 6`, truncated at
/// `bound`.
use fhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::config::validate_smudging_bound;
use crate::sampling::BoundedGaussian;
use crate::Result;

/// Configuration for smudging noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmudgingConfig {
    /// Largest magnitude of a noise coefficient
    pub bound: u64,
    /// Width of the distribution
    pub sigma: f64,
}

impl SmudgingConfig {
    /// Create a smudging configuration with `sigma = bound / 6`.
    pub fn new(bound: u64) -> Result<Self> {
        validate_smudging_bound(bound)?;
        Ok(Self {
            bound,
            sigma: bound as f64 / 6.0,
        })
    }

    /// Get the bound.
    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Get the width.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Bound on the aggregated noise of a quorum of `threshold` parties.
    pub fn aggregate_bound(&self, threshold: usize) -> u64 {
        threshold as u64 * self.bound
    }
}

/// Trait for generating smudging noise.
pub trait SmudgingGenerator {
    /// Generate one noise polynomial in the given context.
    fn generate_smudging_error<R: RngCore + CryptoRng>(
        &self,
        ctx: &Arc<Context>,
        rng: &mut R,
    ) -> Result<Zeroizing<Poly>>;
}

/// Bounded Gaussian smudging noise generator.
#[derive(Debug, Clone)]
pub struct BoundedSmudgingGenerator {
    sampler: BoundedGaussian,
}

impl BoundedSmudgingGenerator {
    /// Create a new generator from a configuration.
    pub fn new(config: &SmudgingConfig) -> Result<Self> {
        Ok(Self {
            sampler: BoundedGaussian::new(config.sigma, config.bound)?,
        })
    }
}

impl SmudgingGenerator for BoundedSmudgingGenerator {
    fn generate_smudging_error<R: RngCore + CryptoRng>(
        &self,
        ctx: &Arc<Context>,
        rng: &mut R,
    ) -> Result<Zeroizing<Poly>> {
        let coefficients = Zeroizing::new(self.sampler.sample_vec(ctx.degree, rng));
        let poly = Poly::try_convert_from(
            coefficients.as_slice(),
            ctx,
            false,
            Representation::PowerBasis,
        )?;
        Ok(Zeroizing::new(poly))
    }
}
