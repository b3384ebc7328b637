//! In-process party actor.

use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::double_enc::{
    distribute_keys, Ciphertext, DecryptionKeyShare, EncryptionKeyPair, KeySharePair,
    LongTermKey, Tag,
};
use crate::params::DoubleEncryptionParameters;
use crate::sharing::{LagrangeCoefficients, ShamirSecretSharing, ShareStore};
use crate::smudging::{BoundedSmudgingGenerator, SmudgingGenerator};
use crate::Result;

/// What a round-1 party hands to the aggregator.
#[derive(Debug, Clone)]
pub struct Round1Output {
    /// Index of the party.
    pub party: usize,
    /// Encryption of the party's secret share.
    pub share_ct: Ciphertext,
    /// Encryption of the party's smudging noise.
    pub noise_ct: Ciphertext,
    /// Shares of the party's keys; entry `j` is addressed to party `j`.
    pub key_shares: Vec<KeySharePair>,
}

/// One member of the pool, holding its long-term key material.
#[derive(Debug, Clone)]
pub struct Party {
    index: usize,
    long_term: LongTermKey,
}

impl Party {
    /// Create party `index` with the given long-term key.
    pub fn new(index: usize, long_term: LongTermKey) -> Self {
        Self { index, long_term }
    }

    /// Create party `index` with a fresh long-term key.
    pub fn random<R: RngCore + CryptoRng>(index: usize, rng: &mut R) -> Self {
        Self::new(index, LongTermKey::random(rng))
    }

    /// Index of the party.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Single-use keys of the party for the run identified by `tag`.
    pub fn derive_keys(
        &self,
        par: &Arc<DoubleEncryptionParameters>,
        tag: &Tag,
    ) -> EncryptionKeyPair {
        EncryptionKeyPair::derive(par, &self.long_term, tag)
    }

    /// Encrypt the party's share and a fresh smudging noise under `keys`.
    ///
    /// The share is read from `store`; a share that cannot be loaded is fatal.
    pub fn encrypt<S, R>(
        &self,
        tag: &Tag,
        keys: &EncryptionKeyPair,
        store: &S,
        smudging: &BoundedSmudgingGenerator,
        rng: &mut R,
    ) -> Result<(Ciphertext, Ciphertext)>
    where
        S: ShareStore + ?Sized,
        R: RngCore + CryptoRng,
    {
        let base_ctx = keys.share.par.base().ctx()?;
        let share = store.share_for(self.index, base_ctx)?;
        let noise = smudging.generate_smudging_error(base_ctx, rng)?;
        let share_ct = Ciphertext::encrypt(self.index, tag, &keys.share, share.poly(), rng)?;
        let noise_ct = Ciphertext::encrypt(self.index, tag, &keys.noise, &noise, rng)?;
        Ok((share_ct, noise_ct))
    }

    /// Round 1: derive keys, encrypt, and distribute shares of the keys.
    pub fn round1<S, R>(
        &self,
        par: &Arc<DoubleEncryptionParameters>,
        tag: &Tag,
        store: &S,
        smudging: &BoundedSmudgingGenerator,
        sharer: &ShamirSecretSharing,
        rng: &mut R,
    ) -> Result<Round1Output>
    where
        S: ShareStore + ?Sized,
        R: RngCore + CryptoRng,
    {
        let keys = self.derive_keys(par, tag);
        let (share_ct, noise_ct) = self.encrypt(tag, &keys, store, smudging, rng)?;
        let key_shares = distribute_keys(self.index, &keys, sharer, rng)?;
        debug!(party = self.index, "round-1 party encrypted and distributed its keys");
        Ok(Round1Output {
            party: self.index,
            share_ct,
            noise_ct,
            key_shares,
        })
    }

    /// Round 2: derive this party's decryption-key share from the key shares
    /// received from the round-1 quorum.
    pub fn round2(
        &self,
        par: &Arc<DoubleEncryptionParameters>,
        tag: &Tag,
        lagrange: &LagrangeCoefficients,
        received: &[&KeySharePair],
    ) -> Result<DecryptionKeyShare> {
        let share = DecryptionKeyShare::derive_share(par, tag, lagrange, self.index, received)?;
        debug!(party = self.index, "round-2 party derived its decryption-key share");
        Ok(share)
    }
}
