//! Error types for approximate threshold recovery.

use crate::protocol::Stage;
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid N / T / ring dimension combination or parameter value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The modulus search ran out of candidates before finding a prime.
    #[error("No prime modulus above {bound} found within {iterations} candidates")]
    ModulusSearchExhausted {
        /// Lower bound the modulus had to exceed.
        bound: u128,
        /// Number of candidates examined.
        iterations: usize,
    },

    /// The modulus search walked past what the ring layer can represent.
    #[error("Candidate modulus {candidate} exceeds the {max_bits}-bit limit of the ring layer")]
    ModulusTooLarge {
        /// First candidate that did not fit.
        candidate: u128,
        /// Largest supported modulus size, in bits.
        max_bits: u32,
    },

    /// A set of evaluation points or contributions is not a valid quorum.
    #[error("Quorum error: {0}")]
    Quorum(#[from] QuorumError),

    /// Persisted share or key material could not be read or decoded.
    #[error("Failed to load material for party {party}: {reason}")]
    MaterialLoad {
        /// Party whose material is unusable.
        party: usize,
        /// What went wrong.
        reason: String,
    },

    /// Ciphertexts or key material from different runs were mixed.
    #[error("Tag mismatch: material produced under a different tag")]
    TagMismatch,

    /// A protocol stage was invoked out of order.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Stage the run was in.
        from: Stage,
        /// Stage that was requested.
        to: Stage,
    },

    /// Error from the ring arithmetic layer.
    #[error("{0}")]
    MathError(#[from] fhe_math::Error),
}

/// Errors raised while validating a quorum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuorumError {
    /// The quorum does not have exactly `threshold` members.
    #[error("Expected {expected} members, found {found}")]
    WrongSize {
        /// Required quorum size.
        expected: usize,
        /// Supplied quorum size.
        found: usize,
    },

    /// The same evaluation point appears twice.
    #[error("Duplicate evaluation point {0}")]
    DuplicatePoint(u64),

    /// The evaluation point is zero or not smaller than the modulus.
    #[error("Evaluation point {point} is not a valid point modulo {modulus}")]
    InvalidPoint {
        /// Offending point.
        point: u64,
        /// Modulus it was checked against.
        modulus: u64,
    },

    /// A party index outside of `0..n`.
    #[error("Unknown party {party}, must be smaller than {n}")]
    UnknownParty {
        /// Offending index.
        party: usize,
        /// Number of parties.
        n: usize,
    },

    /// A quorum member did not contribute in this phase.
    #[error("Missing contribution from party {0}")]
    MissingContribution(usize),

    /// A contribution came from a party outside the quorum.
    #[error("Unexpected contribution from party {0}")]
    UnexpectedContribution(usize),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid party count error.
    pub fn invalid_party_count(n: usize) -> Self {
        Self::Configuration(format!("Number of parties must be at least 1, got {n}"))
    }

    /// Create a threshold too large error.
    pub fn threshold_too_large(threshold: usize, parties: usize) -> Self {
        Self::Configuration(format!(
            "Threshold {threshold} must not exceed number of parties {parties}"
        ))
    }

    /// Create a material load error.
    pub fn material_load<S: Into<String>>(party: usize, reason: S) -> Self {
        Self::MaterialLoad {
            party,
            reason: reason.into(),
        }
    }

    /// Create a wrong quorum size error.
    pub fn wrong_quorum_size(expected: usize, found: usize) -> Self {
        Self::Quorum(QuorumError::WrongSize { expected, found })
    }

    /// Create a missing contribution error.
    pub fn missing_contribution(party: usize) -> Self {
        Self::Quorum(QuorumError::MissingContribution(party))
    }

    /// Whether the error is a (fatal) configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::ModulusSearchExhausted { .. }
                | Self::ModulusTooLarge { .. }
        )
    }
}
