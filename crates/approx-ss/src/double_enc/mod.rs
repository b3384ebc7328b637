//! Double-encryption layer.
//!
//! Round-1 parties encrypt their secret share and their smudging noise under
//! two single-use keys in a ring modulo `T_base * Q1`, then distribute Shamir
//! shares of these keys. Round-2 parties turn the key shares they received
//! into shares of a decryption key for the combined ciphertext.

mod ciphertext;
mod decrypt;
mod decryption_key;
mod key_share;
mod keys;
mod tag;

pub use ciphertext::Ciphertext;
pub use decrypt::{decrypt_final, ApproxMessage};
pub use decryption_key::{DecryptionKey, DecryptionKeyShare};
pub use key_share::{distribute_keys, KeyShare, KeySharePair};
pub use keys::{EncryptionKey, EncryptionKeyPair, KeyKind, LongTermKey};
pub use tag::{Tag, TagSeed};
