use std::sync::Arc;

use fhe_math::{rq::Context, zq::Modulus};
use fhe_traits::FheParameters;
use num_bigint::BigUint;

use crate::params::base::BaseParameters;
use crate::Result;

/// Parameters of the double-encryption layer: ring modulo `T_base * Q1`,
/// plaintext modulus `T_base`.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleEncryptionParameters {
    base: Arc<BaseParameters>,
    n_parties: usize,
    q1: u64,
    ctx: Arc<Context>,
    moduli_operators: Vec<Modulus>,
    modulus: BigUint,
}

impl FheParameters for DoubleEncryptionParameters {}

impl DoubleEncryptionParameters {
    pub(crate) fn new(base: Arc<BaseParameters>, n_parties: usize, q1: u64) -> Result<Self> {
        let moduli = [base.modulus(), q1];
        let ctx = Arc::new(Context::new(&moduli, base.degree())?);
        let moduli_operators = moduli
            .iter()
            .map(|q| Modulus::new(*q))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let modulus = BigUint::from(base.modulus()) * BigUint::from(q1);
        Ok(Self {
            base,
            n_parties,
            q1,
            ctx,
            moduli_operators,
            modulus,
        })
    }

    /// Base parameters this layer was derived from.
    pub fn base(&self) -> &Arc<BaseParameters> {
        &self.base
    }

    /// Number of parties the modulus was sized for.
    pub fn n_parties(&self) -> usize {
        self.n_parties
    }

    /// Second modulus `Q1`, which is also the scaling factor `Δ`.
    pub fn q1(&self) -> u64 {
        self.q1
    }

    /// Plaintext modulus, equal to the base modulus.
    pub fn plaintext(&self) -> u64 {
        self.base.modulus()
    }

    /// Ring context modulo `T_base * Q1`.
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Modulus operators for `[T_base, Q1]`.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.moduli_operators
    }

    /// Full ciphertext modulus `T_base * Q1`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Ring dimension.
    pub fn degree(&self) -> usize {
        self.base.degree()
    }
}
