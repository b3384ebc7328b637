//! Single-use encryption keys of the double-encryption layer.
//!
//! A party holds one long-term seed. For every run it derives two ternary
//! keys, one encrypting its share and one encrypting its smudging noise, from
//! `SHA-256(domain || long-term seed || tag seed || kind)`. The tag seed is
//! fresh for every run, so keys are never reused across runs.

use std::fmt;
use std::sync::Arc;

use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::double_enc::tag::{Tag, TagSeed};
use crate::params::DoubleEncryptionParameters;
use crate::sampling::sample_ternary;
use crate::Result;

const KEY_DERIVATION_DOMAIN: &[u8] = b"approx-ss/encryption-key/v1";

/// What a single-use key encrypts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    /// Key encrypting the party's secret share.
    Share,
    /// Key encrypting the party's smudging noise.
    Noise,
}

impl KeyKind {
    /// Label entering the key derivation.
    pub fn label(&self) -> &'static [u8] {
        match self {
            Self::Share => b"s",
            Self::Noise => b"n",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Share => write!(f, "share"),
            Self::Noise => write!(f, "noise"),
        }
    }
}

/// Long-term key material of a party.
#[derive(Clone, zeroize_derive::Zeroize, zeroize_derive::ZeroizeOnDrop)]
pub struct LongTermKey {
    seed: [u8; 32],
}

impl fmt::Debug for LongTermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LongTermKey(..)")
    }
}

impl LongTermKey {
    /// Generate a random long-term key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self { seed: rng.gen() }
    }

    /// Create a long-term key from its seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    fn derivation_seed(&self, tag: &TagSeed, kind: KeyKind) -> Zeroizing<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_DOMAIN);
        hasher.update(self.seed);
        hasher.update(tag);
        hasher.update(kind.label());
        Zeroizing::new(hasher.finalize().into())
    }
}

/// Single-use ternary key bound to one tag.
#[derive(Clone)]
pub struct EncryptionKey {
    pub(crate) par: Arc<DoubleEncryptionParameters>,
    kind: KeyKind,
    tag: TagSeed,
    coeffs: Box<[i64]>,
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.par == other.par
            && self.kind == other.kind
            && self.tag == other.tag
            && self.coeffs == other.coeffs
    }
}

impl Eq for EncryptionKey {}

impl Zeroize for EncryptionKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for EncryptionKey {}

impl EncryptionKey {
    /// Derive the key of kind `kind` for the run identified by `tag`.
    pub fn derive(
        par: &Arc<DoubleEncryptionParameters>,
        long_term: &LongTermKey,
        tag: &Tag,
        kind: KeyKind,
    ) -> Self {
        let seed = long_term.derivation_seed(tag.seed(), kind);
        let mut rng = ChaCha20Rng::from_seed(*seed);
        let coeffs = sample_ternary(par.degree(), par.base().hamming_weight(), &mut rng);
        Self {
            par: par.clone(),
            kind,
            tag: *tag.seed(),
            coeffs: coeffs.into_boxed_slice(),
        }
    }

    /// Kind of the key.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Seed of the tag the key is bound to.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }

    /// Key as a polynomial of the double-encryption ring.
    pub fn to_poly(&self, representation: Representation) -> Result<Zeroizing<Poly>> {
        let mut s = Zeroizing::new(Poly::try_convert_from(
            self.coeffs.as_ref(),
            self.par.ctx(),
            false,
            Representation::PowerBasis,
        )?);
        s.change_representation(representation);
        Ok(s)
    }
}

/// The two single-use keys of a party for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKeyPair {
    /// Key encrypting the secret share.
    pub share: EncryptionKey,
    /// Key encrypting the smudging noise.
    pub noise: EncryptionKey,
}

impl EncryptionKeyPair {
    /// Derive both keys of a party for the run identified by `tag`.
    pub fn derive(
        par: &Arc<DoubleEncryptionParameters>,
        long_term: &LongTermKey,
        tag: &Tag,
    ) -> Self {
        Self {
            share: EncryptionKey::derive(par, long_term, tag, KeyKind::Share),
            noise: EncryptionKey::derive(par, long_term, tag, KeyKind::Noise),
        }
    }

    /// Key of kind `kind`.
    pub fn get(&self, kind: KeyKind) -> &EncryptionKey {
        match kind {
            KeyKind::Share => &self.share,
            KeyKind::Noise => &self.noise,
        }
    }
}
