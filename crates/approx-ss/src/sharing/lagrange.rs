//! Lagrange coefficients for a quorum of evaluation points.
//!
//! For a quorum `{p_1, ..., p_T}` the coefficient of `p_i` is
//! `L_i = Π_{j≠i} p_j / (p_j - p_i)`, so that `Σ L_i f(p_i) = f(0)` for every
//! polynomial `f` of degree smaller than `T`. Coefficients are computed modulo
//! every RNS modulus of a context and can be lifted back to a single scalar.

use std::collections::{BTreeMap, BTreeSet};

use fhe_math::{rq::Context, zq::Modulus};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::errors::QuorumError;
use crate::poly::{moduli_operators, residues_of};
use crate::{Error, Result};

/// Public evaluation point of a party, equal to its index plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvaluationPoint(u64);

impl EvaluationPoint {
    /// Evaluation point of the party with index `party`.
    pub fn for_party(party: usize) -> Self {
        Self(party as u64 + 1)
    }

    /// Raw value of the point.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Index of the party owning this point.
    pub fn party(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl From<u64> for EvaluationPoint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Lagrange coefficients of one quorum, as residues modulo each modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagrangeCoefficients {
    moduli: Vec<u64>,
    coefficients: BTreeMap<EvaluationPoint, Vec<u64>>,
}

impl LagrangeCoefficients {
    /// Compute the coefficients of a quorum of exactly `threshold` points.
    pub fn build(ctx: &Context, points: &[EvaluationPoint], threshold: usize) -> Result<Self> {
        if points.len() != threshold {
            return Err(Error::wrong_quorum_size(threshold, points.len()));
        }
        let min_modulus = ctx.moduli().iter().copied().min().unwrap_or(0);
        let mut seen = BTreeSet::new();
        for p in points {
            if p.value() == 0 || p.value() >= min_modulus {
                return Err(QuorumError::InvalidPoint {
                    point: p.value(),
                    modulus: min_modulus,
                }
                .into());
            }
            if !seen.insert(*p) {
                return Err(QuorumError::DuplicatePoint(p.value()).into());
            }
        }

        let ops = moduli_operators(ctx)?;
        let mut coefficients: BTreeMap<EvaluationPoint, Vec<u64>> = BTreeMap::new();
        for (i, pi) in points.iter().enumerate() {
            let residues = ops
                .iter()
                .map(|qi| Self::coefficient(qi, points, i))
                .collect::<Result<Vec<_>>>()?;
            coefficients.insert(*pi, residues);
        }

        Ok(Self {
            moduli: ctx.moduli().to_vec(),
            coefficients,
        })
    }

    fn coefficient(qi: &Modulus, points: &[EvaluationPoint], i: usize) -> Result<u64> {
        let pi = qi.reduce(points[i].value());
        let mut numerator = 1u64;
        let mut denominator = 1u64;
        for (j, pj) in points.iter().enumerate() {
            if j == i {
                continue;
            }
            let pj = qi.reduce(pj.value());
            numerator = qi.mul(numerator, pj);
            denominator = qi.mul(denominator, qi.sub(pj, pi));
        }
        let inv = qi.inv(denominator).ok_or_else(|| {
            Error::configuration(format!(
                "Lagrange denominator is not invertible modulo {}",
                qi.modulus()
            ))
        })?;
        Ok(qi.mul(numerator, inv))
    }

    /// Moduli the coefficients are expressed over.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of points in the quorum.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether the quorum is empty.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Points of the quorum, in increasing order.
    pub fn points(&self) -> impl Iterator<Item = &EvaluationPoint> {
        self.coefficients.keys()
    }

    /// Whether `point` belongs to the quorum.
    pub fn contains(&self, point: &EvaluationPoint) -> bool {
        self.coefficients.contains_key(point)
    }

    /// Residues of the coefficient of `point`, one per modulus.
    pub fn residues(&self, point: &EvaluationPoint) -> Option<&[u64]> {
        self.coefficients.get(point).map(|v| v.as_slice())
    }

    /// Residues of the coefficient of party `party`.
    pub fn for_party(&self, party: usize) -> Option<&[u64]> {
        self.residues(&EvaluationPoint::for_party(party))
    }

    /// Coefficient of `point` as a single scalar modulo the product of the
    /// moduli.
    pub fn scalar(&self, point: &EvaluationPoint) -> Option<BigUint> {
        self.residues(point).map(|r| crt_lift(&self.moduli, r))
    }

    /// Integer coefficient of `point`, reduced modulo each of `ops`.
    ///
    /// Used to carry a coefficient computed over a small ring into a ring
    /// with a larger modulus.
    pub fn lifted_residues(&self, point: &EvaluationPoint, ops: &[Modulus]) -> Option<Vec<u64>> {
        self.scalar(point).map(|l| residues_of(&l, ops))
    }

    /// Coefficient of `point` when the context has a single modulus.
    pub fn to_u64(&self, point: &EvaluationPoint) -> Option<u64> {
        match self.residues(point) {
            Some([r]) => Some(*r),
            _ => None,
        }
    }

    /// Interpolate at zero the values `(point, f(point))` modulo the modulus
    /// with index `level`.
    pub fn interpolate_at_zero(
        &self,
        values: &[(EvaluationPoint, u64)],
        level: usize,
    ) -> Result<u64> {
        let q = self.moduli.get(level).ok_or_else(|| {
            Error::configuration(format!("No modulus at level {level}"))
        })?;
        let qi = Modulus::new(*q)?;
        let mut acc = 0u64;
        for (p, v) in values {
            let l = self
                .residues(p)
                .ok_or(QuorumError::UnexpectedContribution(p.party()))?[level];
            acc = qi.add(acc, qi.mul(l, qi.reduce(*v)));
        }
        Ok(acc)
    }
}

/// Chinese remaindering of `residues` modulo the pairwise coprime `moduli`.
pub(crate) fn crt_lift(moduli: &[u64], residues: &[u64]) -> BigUint {
    let modulus: BigUint = moduli.iter().map(|q| BigUint::from(*q)).product();
    let mut acc = BigUint::zero();
    for (q, r) in moduli.iter().zip(residues) {
        let q_big = BigUint::from(*q);
        let m = &modulus / &q_big;
        let m_mod_q = (&m % &q_big).iter_u64_digits().next().unwrap_or(0);
        let inv = BigUint::from(m_mod_q).modpow(&(&q_big - 2u64), &q_big);
        acc += BigUint::from(*r) * &m * inv;
    }
    acc % modulus
}
