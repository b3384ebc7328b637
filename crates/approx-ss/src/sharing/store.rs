//! Persisted secret shares.
//!
//! Shares are kept as serialized polynomials and decoded on demand against
//! the base ring context. A share that cannot be read or decoded makes the
//! whole run fail; loads are never retried.

use std::collections::HashMap;
use std::sync::Arc;

use fhe_math::rq::{Context, Poly};
use fhe_traits::{DeserializeWithContext, Serialize};
use zeroize::Zeroizing;

use crate::{Error, Result};

/// Shamir share of the secret held by one party.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretShare {
    party: usize,
    poly: Zeroizing<Poly>,
}

impl SecretShare {
    /// Wrap the share of party `party`.
    pub fn new(party: usize, poly: Poly) -> Self {
        Self {
            party,
            poly: Zeroizing::new(poly),
        }
    }

    /// Index of the owning party.
    pub fn party(&self) -> usize {
        self.party
    }

    /// Share polynomial, modulo the base modulus.
    pub fn poly(&self) -> &Poly {
        &self.poly
    }
}

/// Source of serialized secret shares.
pub trait ShareStore: Send + Sync {
    /// Raw bytes of the share of `party`.
    fn load(&self, party: usize) -> Result<Zeroizing<Vec<u8>>>;

    /// Decoded share of `party` in the context `ctx`.
    fn share_for(&self, party: usize, ctx: &Arc<Context>) -> Result<SecretShare> {
        load_share(self, party, ctx)
    }
}

/// Load and decode the share of `party` from `store`.
pub fn load_share<S: ShareStore + ?Sized>(
    store: &S,
    party: usize,
    ctx: &Arc<Context>,
) -> Result<SecretShare> {
    let bytes = store.load(party)?;
    let poly = Poly::from_bytes(&bytes, ctx)
        .map_err(|e| Error::material_load(party, format!("Corrupt share: {e}")))?;
    Ok(SecretShare::new(party, poly))
}

/// Share store backed by a map held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryShareStore {
    shares: HashMap<usize, Zeroizing<Vec<u8>>>,
}

impl MemoryShareStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the serialization of `share` for `party`.
    pub fn insert(&mut self, party: usize, share: &Poly) {
        self.shares.insert(party, Zeroizing::new(share.to_bytes()));
    }

    /// Store raw bytes for `party`, replacing any previous entry.
    pub fn insert_bytes(&mut self, party: usize, bytes: Vec<u8>) {
        self.shares.insert(party, Zeroizing::new(bytes));
    }

    /// Remove the entry of `party`.
    pub fn remove(&mut self, party: usize) -> bool {
        self.shares.remove(&party).is_some()
    }

    /// Store one share per party, party `i` receiving `shares[i]`.
    pub fn from_shares(shares: &[Poly]) -> Self {
        let mut store = Self::new();
        shares
            .iter()
            .enumerate()
            .for_each(|(party, share)| store.insert(party, share));
        store
    }

    /// Number of stored shares.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

impl ShareStore for MemoryShareStore {
    fn load(&self, party: usize) -> Result<Zeroizing<Vec<u8>>> {
        self.shares
            .get(&party)
            .cloned()
            .ok_or_else(|| Error::material_load(party, "No share stored"))
    }
}

#[cfg(test)]
mod tests {
    use super::{load_share, MemoryShareStore, ShareStore};
    use crate::Error;
    use fhe_math::rq::{Context, Poly, Representation};
    use rand::thread_rng;
    use std::sync::Arc;

    #[test]
    fn store_and_load() {
        let ctx = Arc::new(Context::new(&[0x7ffffec001], 64).unwrap());
        let mut rng = thread_rng();
        let shares = (0..3)
            .map(|_| Poly::random(&ctx, Representation::PowerBasis, &mut rng))
            .collect::<Vec<_>>();
        let store = MemoryShareStore::from_shares(&shares);
        assert_eq!(store.len(), 3);

        let share = store.share_for(2, &ctx).unwrap();
        assert_eq!(share.party(), 2);
        assert_eq!(share.poly(), &shares[2]);
    }

    #[test]
    fn missing_and_corrupt_shares() {
        let ctx = Arc::new(Context::new(&[0x7ffffec001], 64).unwrap());
        let mut store = MemoryShareStore::new();
        assert!(matches!(
            load_share(&store, 4, &ctx).unwrap_err(),
            Error::MaterialLoad { party: 4, .. }
        ));

        store.insert_bytes(1, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            store.share_for(1, &ctx).unwrap_err(),
            Error::MaterialLoad { party: 1, .. }
        ));
        assert!(store.remove(1));
        assert!(store.is_empty());
    }
}
