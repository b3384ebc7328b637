//! Ciphertexts of the double-encryption layer.

use std::sync::Arc;

use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use fhe_traits::{FheParametrized, Serialize};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::double_enc::keys::{EncryptionKey, KeyKind};
use crate::double_enc::tag::{Tag, TagSeed};
use crate::params::DoubleEncryptionParameters;
use crate::poly::{lift_into, scale_by_residues};
use crate::sampling::BoundedGaussian;
use crate::{Error, Result};

/// Single-polynomial ciphertext `c = a * ek + e + Δ * m` modulo `T_base * Q1`,
/// with `a` the run's tag and `Δ = Q1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    pub(crate) par: Arc<DoubleEncryptionParameters>,
    pub(crate) party: usize,
    pub(crate) kind: KeyKind,
    pub(crate) tag: TagSeed,
    /// Stored in NTT representation.
    pub(crate) c: Poly,
}

impl Ciphertext {
    /// Encrypt `message`, a polynomial modulo `T_base`, under `key`.
    pub fn encrypt<R: RngCore + CryptoRng>(
        party: usize,
        tag: &Tag,
        key: &EncryptionKey,
        message: &Poly,
        rng: &mut R,
    ) -> Result<Self> {
        if !tag.matches(key.tag()) {
            return Err(Error::TagMismatch);
        }
        let par = key.par.clone();
        let base_ctx = par.base().ctx()?;
        if message.ctx() != base_ctx {
            return Err(Error::configuration(
                "Message is not a polynomial modulo the base modulus",
            ));
        }

        let sampler = BoundedGaussian::new(par.base().sigma(), par.base().noise_bound())?;
        let e = Zeroizing::new(sampler.sample_vec(par.degree(), rng));
        let mut c = Poly::try_convert_from(
            e.as_slice(),
            par.ctx(),
            false,
            Representation::PowerBasis,
        )?;

        let m = Zeroizing::new(lift_into(message, par.ctx())?);
        let delta = [par.q1() % par.plaintext(), 0];
        let delta_m = Zeroizing::new(scale_by_residues(&m, &delta, par.moduli_operators())?);
        c += delta_m.as_ref();
        c.change_representation(Representation::Ntt);

        let mut a_s = key.to_poly(Representation::Ntt)?;
        *a_s.as_mut() *= &tag.poly;
        c += a_s.as_ref();

        Ok(Self {
            par,
            party,
            kind: key.kind(),
            tag: *tag.seed(),
            c,
        })
    }

    /// Index of the party that produced the ciphertext.
    pub fn party(&self) -> usize {
        self.party
    }

    /// Kind of key the ciphertext was produced under.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Seed of the tag the ciphertext is bound to.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }
}

impl FheParametrized for Ciphertext {
    type Parameters = DoubleEncryptionParameters;
}

impl Serialize for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        self.c.to_bytes()
    }
}
