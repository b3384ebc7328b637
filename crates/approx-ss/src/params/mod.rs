//! Base scheme parameters and derivation of the double-encryption parameters.

mod base;
mod double;
mod search;

pub use base::{BaseParameters, BaseParametersBuilder, RingType, MAX_MODULUS_BITS};
pub use double::DoubleEncryptionParameters;
pub use search::{
    derive_double_encryption_parameters, find_second_modulus, modulus_bound, SearchConfig,
};
