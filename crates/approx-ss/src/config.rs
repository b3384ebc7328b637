/// Configuration validation for approximate threshold recovery.
use crate::{Error, Result};

/// Validates the access structure: `1 <= threshold <= n < modulus`.
///
/// `modulus` is the smallest modulus the shares live under; evaluation points
/// `1..=n` must be non-zero and distinct modulo it.
pub fn validate_threshold_config(n: usize, threshold: usize, modulus: u64) -> Result<()> {
    if n == 0 {
        return Err(Error::invalid_party_count(n));
    }
    if threshold == 0 {
        return Err(Error::configuration("Threshold must be at least 1"));
    }
    if threshold > n {
        return Err(Error::threshold_too_large(threshold, n));
    }
    if n as u128 >= modulus as u128 {
        return Err(Error::configuration(format!(
            "Number of parties {n} must be smaller than the modulus {modulus}"
        )));
    }
    Ok(())
}

/// Validates the smudging bound.
pub fn validate_smudging_bound(bound: u64) -> Result<()> {
    if bound == 0 {
        return Err(Error::configuration("Smudging bound must be greater than 0"));
    }
    Ok(())
}

/// Validates the access structure and the smudging bound together.
pub fn validate_all_params(n: usize, threshold: usize, modulus: u64, bound: u64) -> Result<()> {
    validate_threshold_config(n, threshold, modulus)?;
    validate_smudging_bound(bound)?;
    Ok(())
}
