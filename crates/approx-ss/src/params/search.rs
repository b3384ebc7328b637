//! Search for the second modulus of the double-encryption layer.
//!
//! The double-encryption ring works modulo `Q = T_base * Q1` with plaintext
//! modulus `T_base`, so `Δ = Q1`. Combining the ciphertexts of a quorum
//! multiplies the encryption error of each party by a Lagrange coefficient
//! smaller than `T_base`; the search therefore looks for a prime
//! `Q1 > 2 * N * B * T_base`, with `B` the per-ciphertext noise bound.

use std::sync::Arc;

use num_bigint_dig::{prime::probably_prime, BigUint as DigBigUint};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::params::base::{BaseParameters, RingType, MAX_MODULUS_BITS};
use crate::params::double::DoubleEncryptionParameters;
use crate::{Error, Result};

/// Knobs of the modulus search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of candidates examined before giving up.
    pub max_iterations: usize,
    /// Miller-Rabin rounds on top of the Baillie-PSW test.
    pub primality_rounds: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            primality_rounds: 0,
        }
    }
}

/// Lower bound `2 * N * B * T_base` that `Q1` must strictly exceed.
pub fn modulus_bound(base: &BaseParameters, n_parties: usize) -> u128 {
    2 * n_parties as u128 * base.noise_bound() as u128 * base.modulus() as u128
}

/// Find `Q1` for `n_parties` parties over the `base` parameters.
pub fn find_second_modulus(
    base: &BaseParameters,
    n_parties: usize,
    config: &SearchConfig,
) -> Result<u64> {
    if n_parties == 0 {
        return Err(Error::invalid_party_count(n_parties));
    }

    let t = base.modulus() as u128;
    let degree = base.degree() as u128;
    let bound = modulus_bound(base, n_parties);
    let stride = match base.ring_type() {
        RingType::Standard => 2 * degree,
        RingType::ConjugateInvariant => 4 * degree,
    };

    let start = t * n_parties as u128 * base.noise_bound() as u128 / degree;
    for (examined, i) in (start..start + config.max_iterations as u128).enumerate() {
        let x = t + i * stride;
        if x >> MAX_MODULUS_BITS != 0 {
            return Err(Error::ModulusTooLarge {
                candidate: x,
                max_bits: MAX_MODULUS_BITS,
            });
        }
        if x > bound && probably_prime(&DigBigUint::from(x as u64), config.primality_rounds) {
            debug!(
                n_parties,
                q1 = x as u64,
                candidates = examined + 1,
                "found double-encryption modulus"
            );
            return Ok(x as u64);
        }
    }

    Err(Error::ModulusSearchExhausted {
        bound,
        iterations: config.max_iterations,
    })
}

/// Derive the double-encryption parameters `(T_base, Q1)` for `n_parties`.
///
/// A failed search is reported as a configuration error; errors raised while
/// building the ring context are reported as math errors.
pub fn derive_double_encryption_parameters(
    base: &Arc<BaseParameters>,
    n_parties: usize,
    config: &SearchConfig,
) -> Result<Arc<DoubleEncryptionParameters>> {
    let q1 = find_second_modulus(base, n_parties, config)?;
    DoubleEncryptionParameters::new(base.clone(), n_parties, q1).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::{
        derive_double_encryption_parameters, find_second_modulus, modulus_bound, SearchConfig,
    };
    use crate::params::{BaseParametersBuilder, RingType};
    use crate::Error;
    use num_bigint_dig::{prime::probably_prime, BigUint};

    #[test]
    fn modulus_exceeds_bound_and_is_prime() {
        for degree in [256, 1024, 4096] {
            let base = BaseParametersBuilder::new().set_degree(degree).build().unwrap();
            for n in [1, 3, 32, 64, 128] {
                let q1 = find_second_modulus(&base, n, &SearchConfig::default()).unwrap();
                assert!(q1 as u128 > modulus_bound(&base, n));
                assert!(probably_prime(&BigUint::from(q1), 20));
                assert_eq!(q1 % (2 * degree as u64), 1);
            }
        }
    }

    #[test]
    fn search_is_deterministic() {
        let base = BaseParametersBuilder::new().set_degree(512).build().unwrap();
        let config = SearchConfig::default();
        let a = find_second_modulus(&base, 64, &config).unwrap();
        let b = find_second_modulus(&base, 64, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn conjugate_invariant_stride() {
        let base = BaseParametersBuilder::new()
            .set_degree(512)
            .set_ring_type(RingType::ConjugateInvariant)
            .build()
            .unwrap();
        let q1 = find_second_modulus(&base, 32, &SearchConfig::default()).unwrap();
        assert_eq!((q1 - base.modulus()) % (4 * 512), 0);
        assert!(q1 as u128 > modulus_bound(&base, 32));
    }

    #[test]
    fn exhausted_search_is_a_configuration_error() {
        let base = BaseParametersBuilder::new().set_degree(256).build().unwrap();
        let config = SearchConfig {
            max_iterations: 0,
            primality_rounds: 0,
        };
        let e = find_second_modulus(&base, 32, &config).unwrap_err();
        assert!(matches!(e, Error::ModulusSearchExhausted { iterations: 0, .. }));
        assert!(e.is_configuration());
    }

    #[test]
    fn too_many_parties_overflow_the_ring_layer() {
        let base = BaseParametersBuilder::new().set_degree(256).build().unwrap();
        let e = find_second_modulus(&base, 1 << 20, &SearchConfig::default()).unwrap_err();
        assert!(matches!(e, Error::ModulusTooLarge { .. }));
        assert!(e.is_configuration());
    }

    #[test]
    fn zero_parties_rejected() {
        let base = BaseParametersBuilder::new().set_degree(256).build().unwrap();
        assert!(find_second_modulus(&base, 0, &SearchConfig::default())
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn derived_parameters() {
        let base = BaseParametersBuilder::new().set_degree(256).build_arc().unwrap();
        let par = derive_double_encryption_parameters(&base, 32, &SearchConfig::default()).unwrap();
        assert_eq!(par.ctx().moduli()[0], base.modulus());
        assert_eq!(par.ctx().moduli()[1], par.q1());
        assert_eq!(par.n_parties(), 32);
    }
}
