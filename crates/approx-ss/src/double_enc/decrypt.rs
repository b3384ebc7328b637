//! Final approximate decryption.

use std::collections::BTreeSet;
use std::sync::Arc;

use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use num_bigint::BigUint;
use zeroize::Zeroizing;

use crate::double_enc::ciphertext::Ciphertext;
use crate::double_enc::decryption_key::DecryptionKey;
use crate::double_enc::keys::KeyKind;
use crate::double_enc::tag::{Tag, TagSeed};
use crate::errors::QuorumError;
use crate::params::DoubleEncryptionParameters;
use crate::poly::{max_centered_distance, scale_by_residues};
use crate::sharing::{EvaluationPoint, LagrangeCoefficients};
use crate::{Error, Result};

/// The secret plus the aggregated smudging noise of a quorum, modulo `T_base`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproxMessage {
    tag: TagSeed,
    poly: Poly,
}

impl ApproxMessage {
    /// Seed of the tag of the run that produced the message.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }

    /// Message as a polynomial modulo `T_base`, in power basis.
    pub fn poly(&self) -> &Poly {
        &self.poly
    }

    /// Coefficients in `[0, T_base)`.
    pub fn coefficients(&self) -> Vec<u64> {
        self.poly.coefficients().row(0).to_vec()
    }

    /// Largest centered distance to `secret` over all coefficients.
    pub fn max_deviation(&self, secret: &Poly) -> u64 {
        max_centered_distance(&self.poly, secret)
    }

    /// Whether every coefficient is within `bound` of `secret`.
    pub fn is_within(&self, secret: &Poly, bound: u64) -> bool {
        self.max_deviation(secret) <= bound
    }
}

fn check_contributions(
    lagrange: &LagrangeCoefficients,
    cts: &[Ciphertext],
    tag: &Tag,
    kind: KeyKind,
) -> Result<()> {
    let mut seen = BTreeSet::new();
    for ct in cts {
        if !tag.matches(ct.tag()) {
            return Err(Error::TagMismatch);
        }
        if ct.kind() != kind {
            return Err(Error::configuration(format!(
                "Expected a {kind} ciphertext from party {}, got a {} ciphertext",
                ct.party(),
                ct.kind()
            )));
        }
        if !lagrange.contains(&EvaluationPoint::for_party(ct.party())) {
            return Err(QuorumError::UnexpectedContribution(ct.party()).into());
        }
        if !seen.insert(ct.party()) {
            let point = EvaluationPoint::for_party(ct.party());
            return Err(QuorumError::DuplicatePoint(point.value()).into());
        }
    }
    if let Some(missing) = lagrange.points().find(|p| !seen.contains(&p.party())) {
        return Err(Error::missing_contribution(missing.party()));
    }
    Ok(())
}

/// Combine the ciphertexts of the round-1 quorum and decrypt them with `dk`.
///
/// Computes `Σ_i (L_i * CTs_i + CTn_i) - a * DK` and rounds every
/// coefficient to the nearest multiple of `Q1`.
pub fn decrypt_final(
    par: &Arc<DoubleEncryptionParameters>,
    tag: &Tag,
    dk: &DecryptionKey,
    lagrange: &LagrangeCoefficients,
    share_cts: &[Ciphertext],
    noise_cts: &[Ciphertext],
) -> Result<ApproxMessage> {
    if !tag.matches(dk.tag()) {
        return Err(Error::TagMismatch);
    }
    check_contributions(lagrange, share_cts, tag, KeyKind::Share)?;
    check_contributions(lagrange, noise_cts, tag, KeyKind::Noise)?;
    if !dk.round1().iter().copied().eq(lagrange.points().map(|p| p.party())) {
        return Err(Error::configuration(
            "Decryption key was derived for another round-1 quorum",
        ));
    }

    let ops = par.moduli_operators();
    let mut c = Poly::zero(par.ctx(), Representation::Ntt);
    for ct in share_cts {
        let l = lagrange
            .lifted_residues(&EvaluationPoint::for_party(ct.party()), ops)
            .ok_or(QuorumError::UnexpectedContribution(ct.party()))?;
        c += &scale_by_residues(&ct.c, &l, ops)?;
    }
    for ct in noise_cts {
        c += &ct.c;
    }
    let mut a_dk = Zeroizing::new(tag.poly.clone());
    *a_dk.as_mut() *= dk.poly.as_ref();
    c -= a_dk.as_ref();
    c.change_representation(Representation::PowerBasis);

    let q1 = BigUint::from(par.q1());
    let t = BigUint::from(par.plaintext());
    let half = &q1 >> 1;
    let coefficients = Vec::<BigUint>::from(&c)
        .into_iter()
        .map(|x| {
            let m: BigUint = (x + &half) / &q1 % &t;
            m.iter_u64_digits().next().unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let poly = Poly::try_convert_from(
        coefficients,
        par.base().ctx()?,
        false,
        Representation::PowerBasis,
    )?;
    Ok(ApproxMessage {
        tag: *tag.seed(),
        poly,
    })
}
