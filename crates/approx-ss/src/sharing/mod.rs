//! Threshold sharing of ring polynomials.

/// Lagrange coefficients of a quorum.
pub mod lagrange;
/// Shamir secret sharing.
pub mod shamir;
/// Persisted shares.
pub mod store;
/// Secret sharing traits.
pub mod traits;

pub use lagrange::{EvaluationPoint, LagrangeCoefficients};
pub use shamir::ShamirSecretSharing;
pub use store::{load_share, MemoryShareStore, SecretShare, ShareStore};
pub use traits::SecretSharer;
