/// Traits for secret sharing operations.
use crate::Result;
use fhe_math::rq::Poly;
use rand::{CryptoRng, RngCore};

/// Trait for threshold sharing of ring polynomials.
pub trait SecretSharer {
    /// Split `poly` into one share per party; share `i` belongs to party `i`.
    fn generate_shares<R: RngCore + CryptoRng>(
        &self,
        poly: &Poly,
        rng: &mut R,
    ) -> Result<Vec<Poly>>;

    /// Reconstruct the shared polynomial from `(party, share)` pairs.
    fn reconstruct(&self, shares: &[(usize, &Poly)]) -> Result<Poly>;
}
