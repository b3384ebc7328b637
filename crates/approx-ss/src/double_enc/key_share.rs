//! Distribution of single-use keys to the whole pool.
//!
//! After encrypting, a round-1 party Shamir-shares both of its keys over the
//! double-encryption ring, so that any `T` parties can later derive shares of
//! the decryption key.

use std::sync::Arc;

use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::double_enc::keys::{EncryptionKeyPair, KeyKind};
use crate::double_enc::tag::TagSeed;
use crate::sharing::{SecretSharer, ShamirSecretSharing};
use crate::Result;

/// Share of one key of party `sender`, addressed to party `recipient`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyShare {
    pub(crate) sender: usize,
    pub(crate) recipient: usize,
    pub(crate) kind: KeyKind,
    pub(crate) tag: TagSeed,
    pub(crate) poly: Arc<Zeroizing<Poly>>,
}

impl KeyShare {
    /// Index of the party owning the key.
    pub fn sender(&self) -> usize {
        self.sender
    }

    /// Index of the recipient.
    pub fn recipient(&self) -> usize {
        self.recipient
    }

    /// Kind of the shared key.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Seed of the tag the key is bound to.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }

    pub(crate) fn poly(&self) -> &Poly {
        &self.poly
    }
}

/// Shares of both keys of one party, addressed to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySharePair {
    /// Share of the key encrypting the secret share.
    pub share: KeyShare,
    /// Share of the key encrypting the smudging noise.
    pub noise: KeyShare,
}

impl KeySharePair {
    /// Index of the party owning the keys.
    pub fn sender(&self) -> usize {
        self.share.sender
    }

    /// Index of the recipient.
    pub fn recipient(&self) -> usize {
        self.share.recipient
    }

    /// The same shares, attributed to another sender. The polynomials are
    /// shared, not copied.
    pub(crate) fn attributed_to(&self, sender: usize) -> Self {
        let mut pair = self.clone();
        pair.share.sender = sender;
        pair.noise.sender = sender;
        pair
    }
}

/// Shamir-share both keys of party `sender`; entry `j` is addressed to party `j`.
pub fn distribute_keys<R: RngCore + CryptoRng>(
    sender: usize,
    keys: &EncryptionKeyPair,
    sharer: &ShamirSecretSharing,
    rng: &mut R,
) -> Result<Vec<KeySharePair>> {
    let share_shares = share_key(keys, KeyKind::Share, sharer, rng)?;
    let noise_shares = share_key(keys, KeyKind::Noise, sharer, rng)?;
    let tag = *keys.share.tag();

    Ok(share_shares
        .into_iter()
        .zip(noise_shares)
        .enumerate()
        .map(|(recipient, (s, n))| KeySharePair {
            share: KeyShare {
                sender,
                recipient,
                kind: KeyKind::Share,
                tag,
                poly: Arc::new(Zeroizing::new(s)),
            },
            noise: KeyShare {
                sender,
                recipient,
                kind: KeyKind::Noise,
                tag,
                poly: Arc::new(Zeroizing::new(n)),
            },
        })
        .collect())
}

fn share_key<R: RngCore + CryptoRng>(
    keys: &EncryptionKeyPair,
    kind: KeyKind,
    sharer: &ShamirSecretSharing,
    rng: &mut R,
) -> Result<Vec<Poly>> {
    let key = keys.get(kind).to_poly(Representation::PowerBasis)?;
    sharer.generate_shares(&key, rng)
}
