//! Parameters of the base ring-LWE scheme whose secret is being shared.

use std::sync::Arc;

use fhe_math::rq::Context;
use fhe_traits::FheParameters;
use num_bigint_dig::{prime::probably_prime, BigUint as DigBigUint};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest modulus size accepted by the ring layer.
pub const MAX_MODULUS_BITS: u32 = 62;

const DEFAULT_HAMMING_WEIGHT: usize = 192;

/// Packing of the base ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RingType {
    /// Negacyclic ring `Z[X]/(X^n + 1)`.
    #[default]
    Standard,
    /// Conjugate-invariant subring; only changes the modulus search stride.
    ConjugateInvariant,
}

/// Parameters of the base scheme.
///
/// The base modulus is the message space of the double-encryption layer and
/// the modulus under which the secret is Shamir shared.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseParameters {
    degree: usize,
    modulus: u64,
    sigma: f64,
    noise_bound: u64,
    hamming_weight: usize,
    ring_type: RingType,
    #[serde(skip)]
    ctx: Option<Arc<Context>>,
}

impl std::fmt::Debug for BaseParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseParameters")
            .field("degree", &self.degree)
            .field("modulus", &self.modulus)
            .field("sigma", &self.sigma)
            .field("noise_bound", &self.noise_bound)
            .field("hamming_weight", &self.hamming_weight)
            .field("ring_type", &self.ring_type)
            .finish()
    }
}

impl FheParameters for BaseParameters {}

impl BaseParameters {
    /// Ring dimension.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Base modulus `T_base`.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Width of the encryption error distribution.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Bound on the encryption error of one ciphertext.
    pub fn noise_bound(&self) -> u64 {
        self.noise_bound
    }

    /// Number of non-zero coefficients of secret keys, `0` for uniform ternary.
    pub fn hamming_weight(&self) -> usize {
        self.hamming_weight
    }

    /// Ring packing.
    pub fn ring_type(&self) -> RingType {
        self.ring_type
    }

    /// Ring context modulo the base modulus.
    ///
    /// Parameters obtained through deserialization must be passed through
    /// [`BaseParametersBuilder::from_parameters`] first.
    pub fn ctx(&self) -> Result<&Arc<Context>> {
        self.ctx
            .as_ref()
            .ok_or_else(|| Error::configuration("Base parameters were not built"))
    }

    /// Default parameters: n = 4096 over the 39-bit NTT prime `0x7ffffec001`.
    pub fn default_arc() -> Result<Arc<Self>> {
        BaseParametersBuilder::new().build_arc()
    }
}

/// Builder for [`BaseParameters`].
#[derive(Debug, Clone)]
pub struct BaseParametersBuilder {
    degree: usize,
    modulus: u64,
    sigma: f64,
    noise_bound: Option<u64>,
    hamming_weight: Option<usize>,
    ring_type: RingType,
}

impl Default for BaseParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseParametersBuilder {
    /// Creates a new builder holding the default parameters.
    pub fn new() -> Self {
        Self {
            degree: 4096,
            modulus: 0x7ffffec001,
            sigma: 3.2,
            noise_bound: None,
            hamming_weight: None,
            ring_type: RingType::Standard,
        }
    }

    /// Starts from existing (e.g. deserialized) parameters.
    pub fn from_parameters(par: &BaseParameters) -> Self {
        Self {
            degree: par.degree,
            modulus: par.modulus,
            sigma: par.sigma,
            noise_bound: Some(par.noise_bound),
            hamming_weight: Some(par.hamming_weight),
            ring_type: par.ring_type,
        }
    }

    /// Sets the ring dimension.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the base modulus.
    pub fn set_modulus(&mut self, modulus: u64) -> &mut Self {
        self.modulus = modulus;
        self
    }

    /// Sets the error width; the noise bound defaults to `floor(6 * sigma)`.
    pub fn set_sigma(&mut self, sigma: f64) -> &mut Self {
        self.sigma = sigma;
        self
    }

    /// Overrides the per-ciphertext noise bound.
    pub fn set_noise_bound(&mut self, noise_bound: u64) -> &mut Self {
        self.noise_bound = Some(noise_bound);
        self
    }

    /// Sets the hamming weight of secret keys (`0` for uniform ternary).
    ///
    /// Defaults to `min(192, degree / 2)`.
    pub fn set_hamming_weight(&mut self, hamming_weight: usize) -> &mut Self {
        self.hamming_weight = Some(hamming_weight);
        self
    }

    /// Sets the ring packing.
    pub fn set_ring_type(&mut self, ring_type: RingType) -> &mut Self {
        self.ring_type = ring_type;
        self
    }

    /// Build a new `BaseParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<BaseParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `BaseParameters`.
    pub fn build(&self) -> Result<BaseParameters> {
        if !self.degree.is_power_of_two() || self.degree < 8 {
            return Err(Error::configuration(format!(
                "Ring dimension {} is not a power of two larger or equal to 8",
                self.degree
            )));
        }
        if self.modulus >> MAX_MODULUS_BITS != 0 {
            return Err(Error::configuration(format!(
                "Base modulus {} does not fit in {} bits",
                self.modulus, MAX_MODULUS_BITS
            )));
        }
        if self.modulus % (2 * self.degree as u64) != 1 {
            return Err(Error::configuration(format!(
                "Base modulus {} is not congruent to 1 modulo {}",
                self.modulus,
                2 * self.degree
            )));
        }
        if !probably_prime(&DigBigUint::from(self.modulus), 20) {
            return Err(Error::configuration(format!(
                "Base modulus {} is not prime",
                self.modulus
            )));
        }
        if !(self.sigma > 0.0) {
            return Err(Error::configuration("Error width must be positive"));
        }
        let noise_bound = self
            .noise_bound
            .unwrap_or_else(|| (6.0 * self.sigma).floor() as u64);
        if noise_bound == 0 {
            return Err(Error::configuration("Noise bound must be positive"));
        }
        let hamming_weight = self
            .hamming_weight
            .unwrap_or(DEFAULT_HAMMING_WEIGHT.min(self.degree / 2));
        if hamming_weight > self.degree {
            return Err(Error::configuration(format!(
                "Hamming weight {} exceeds ring dimension {}",
                hamming_weight, self.degree
            )));
        }

        let ctx = Arc::new(Context::new(&[self.modulus], self.degree)?);

        Ok(BaseParameters {
            degree: self.degree,
            modulus: self.modulus,
            sigma: self.sigma,
            noise_bound,
            hamming_weight,
            ring_type: self.ring_type,
            ctx: Some(ctx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseParameters, BaseParametersBuilder, RingType};

    #[test]
    fn default_parameters() {
        let par = BaseParameters::default_arc().unwrap();
        assert_eq!(par.degree(), 4096);
        assert_eq!(par.modulus(), 0x7ffffec001);
        assert_eq!(par.noise_bound(), 19);
        assert_eq!(par.hamming_weight(), 192);
        assert_eq!(par.ring_type(), RingType::Standard);
        assert_eq!(par.ctx().unwrap().moduli(), &[0x7ffffec001]);
    }

    #[test]
    fn builder_rejects_bad_input() {
        // Not a power of two.
        assert!(BaseParametersBuilder::new().set_degree(1000).build().is_err());
        // Too small.
        assert!(BaseParametersBuilder::new().set_degree(4).build().is_err());
        // Not 1 mod 2n.
        assert!(BaseParametersBuilder::new()
            .set_modulus(0x7ffffec003)
            .build()
            .is_err());
        // Composite, 1 mod 2n.
        assert!(BaseParametersBuilder::new()
            .set_degree(8)
            .set_modulus(17 * 33)
            .build()
            .is_err());
        assert!(BaseParametersBuilder::new().set_sigma(0.0).build().is_err());
        assert!(BaseParametersBuilder::new()
            .set_degree(16)
            .set_hamming_weight(17)
            .build()
            .is_err());
        assert!(BaseParametersBuilder::new()
            .set_degree(16)
            .set_hamming_weight(17)
            .build()
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn noise_bound_override() {
        let par = BaseParametersBuilder::new()
            .set_degree(256)
            .set_sigma(2.0)
            .build()
            .unwrap();
        assert_eq!(par.noise_bound(), 12);

        let par = BaseParametersBuilder::new()
            .set_degree(256)
            .set_noise_bound(25)
            .build()
            .unwrap();
        assert_eq!(par.noise_bound(), 25);
    }

    #[test]
    fn hamming_weight_default_follows_degree() {
        let par = BaseParametersBuilder::new().set_degree(64).build().unwrap();
        assert_eq!(par.hamming_weight(), 32);
        let par = BaseParametersBuilder::new().set_degree(1024).build().unwrap();
        assert_eq!(par.hamming_weight(), 192);
    }

    #[test]
    fn rebuild_after_roundtrip() {
        let par = BaseParametersBuilder::new().set_degree(64).build().unwrap();
        let copy = BaseParametersBuilder::from_parameters(&par).build().unwrap();
        assert_eq!(par, copy);
    }
}
