/// Shamir secret sharing of ring polynomials.
///
/// Every coefficient is shared independently modulo every RNS modulus of the
/// polynomial's context, with party `i` receiving the evaluation at `i + 1`.
use std::sync::Arc;

use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use ndarray::Array2;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use zeroize::{Zeroize, Zeroizing};

use crate::config::validate_threshold_config;
use crate::errors::QuorumError;
use crate::poly::{moduli_operators, scale_by_residues};
use crate::sharing::lagrange::{EvaluationPoint, LagrangeCoefficients};
use crate::sharing::traits::SecretSharer;
use crate::{Error, Result};

/// Shamir Secret Sharing for `threshold`-of-`n` access structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShamirSecretSharing {
    /// Number of parties
    pub n: usize,
    /// Threshold for reconstruction
    pub threshold: usize,
}

impl ShamirSecretSharing {
    /// Create a new Shamir Secret Sharing instance.
    pub fn new(n: usize, threshold: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::invalid_party_count(n));
        }
        if threshold == 0 {
            return Err(Error::configuration("Threshold must be at least 1"));
        }
        if threshold > n {
            return Err(Error::threshold_too_large(threshold, n));
        }
        Ok(Self { n, threshold })
    }
}

impl SecretSharer for ShamirSecretSharing {
    fn generate_shares<R: RngCore + CryptoRng>(
        &self,
        poly: &Poly,
        rng: &mut R,
    ) -> Result<Vec<Poly>> {
        let ctx = poly.ctx().clone();
        let min_modulus = ctx.moduli().iter().copied().min().unwrap_or(0);
        validate_threshold_config(self.n, self.threshold, min_modulus)?;

        let mut poly = Zeroizing::new(poly.clone());
        poly.change_representation(Representation::PowerBasis);
        let degree = ctx.degree;
        let ops = moduli_operators(&ctx)?;
        let seeds: Vec<<ChaCha20Rng as SeedableRng>::Seed> =
            ops.iter().map(|_| rng.gen()).collect();

        // One matrix per modulus: rows are parties, columns are coefficients.
        let mut per_modulus: Vec<Array2<u64>> = ops
            .par_iter()
            .zip(seeds.into_par_iter())
            .enumerate()
            .map(|(level, (qi, seed))| {
                let mut rng = ChaCha20Rng::from_seed(seed);
                let mut shares = Array2::<u64>::zeros((self.n, degree));
                let mut f = Zeroizing::new(vec![0u64; self.threshold]);
                for (c, secret) in poly.coefficients().row(level).iter().enumerate() {
                    f[0] = *secret;
                    f[1..]
                        .iter_mut()
                        .for_each(|a| *a = rng.gen_range(0..qi.modulus()));
                    for party in 0..self.n {
                        let x = qi.reduce(EvaluationPoint::for_party(party).value());
                        shares[[party, c]] = f
                            .iter()
                            .rev()
                            .fold(0, |acc, a| qi.add(qi.mul(acc, x), *a));
                    }
                }
                shares
            })
            .collect();

        let shares = (0..self.n)
            .map(|party| {
                let coefficients = Array2::from_shape_fn((ops.len(), degree), |(level, c)| {
                    per_modulus[level][[party, c]]
                });
                Ok(Poly::try_convert_from(
                    coefficients,
                    &ctx,
                    false,
                    Representation::PowerBasis,
                )?)
            })
            .collect();
        per_modulus
            .iter_mut()
            .filter_map(|m| m.as_slice_memory_order_mut())
            .for_each(|m| m.zeroize());
        shares
    }

    fn reconstruct(&self, shares: &[(usize, &Poly)]) -> Result<Poly> {
        let first = shares
            .first()
            .ok_or_else(|| Error::wrong_quorum_size(self.threshold, 0))?;
        let ctx: Arc<_> = first.1.ctx().clone();
        for (party, _) in shares {
            if *party >= self.n {
                return Err(QuorumError::UnknownParty {
                    party: *party,
                    n: self.n,
                }
                .into());
            }
        }

        let points = shares
            .iter()
            .map(|(party, _)| EvaluationPoint::for_party(*party))
            .collect::<Vec<_>>();
        let lagrange = LagrangeCoefficients::build(&ctx, &points, self.threshold)?;
        let ops = moduli_operators(&ctx)?;

        let mut acc = Poly::zero(&ctx, Representation::PowerBasis);
        for ((_, share), point) in shares.iter().zip(&points) {
            let mut share = (*share).clone();
            share.change_representation(Representation::PowerBasis);
            let l = lagrange
                .residues(point)
                .ok_or(QuorumError::MissingContribution(point.party()))?;
            acc += &scale_by_residues(&share, l, &ops)?;
        }
        Ok(acc)
    }
}
