#![crate_name = "approx_ss"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Approximate threshold secret recovery over a ring-LWE double-encryption
//! layer.
//!
//! A secret polynomial modulo `T_base` is Shamir shared among `N` parties.
//! A first quorum of `T` parties encrypts its shares and fresh smudging noise
//! in a larger ring modulo `T_base * Q1`, and a second, independent quorum
//! derives the key decrypting their Lagrange combination. The result is the
//! secret plus a noise of magnitude at most `T` times the smudging bound.
//!
//! ```no_run
//! # fn main() -> approx_ss::Result<()> {
//! let report = approx_ss::run_once(32, 5, 16)?;
//! assert!(report.success);
//! assert!(report.max_deviation <= 80);
//! # Ok(())
//! # }
//! ```

mod errors;
mod poly;

/// Configuration validation.
pub mod config;
/// Double-encryption layer.
pub mod double_enc;
/// Base and double-encryption parameters.
pub mod params;
/// Recovery protocol.
pub mod protocol;
/// Noise and key samplers.
pub mod sampling;
/// Threshold sharing.
pub mod sharing;
/// Smudging noise.
pub mod smudging;

pub use errors::{Error, QuorumError, Result};
pub use protocol::{run_once, ApproxRecovery, RunReport, SimulationMode};
