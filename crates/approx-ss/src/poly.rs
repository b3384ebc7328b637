//! Coefficient-level helpers on top of the ring layer.

use std::sync::Arc;

use fhe_math::{
    rq::{traits::TryConvertFrom, Context, Poly, Representation},
    zq::Modulus,
};
use itertools::izip;
use num_bigint::BigUint;

use crate::Result;

/// Modulus operators for every modulus of `ctx`.
pub(crate) fn moduli_operators(ctx: &Context) -> Result<Vec<Modulus>> {
    Ok(ctx
        .moduli()
        .iter()
        .map(|q| Modulus::new(*q))
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Multiply every coefficient by a scalar given through its RNS residues.
pub(crate) fn scale_by_residues(poly: &Poly, residues: &[u64], ops: &[Modulus]) -> Result<Poly> {
    let mut coefficients = poly.coefficients().to_owned();
    for (mut row, qi, r) in izip!(coefficients.outer_iter_mut(), ops, residues) {
        let r = qi.reduce(*r);
        row.mapv_inplace(|c| qi.mul(c, r));
    }
    Ok(Poly::try_convert_from(
        coefficients,
        poly.ctx(),
        false,
        poly.representation().clone(),
    )?)
}

/// Residues of an integer scalar modulo every modulus.
pub(crate) fn residues_of(scalar: &BigUint, ops: &[Modulus]) -> Vec<u64> {
    ops.iter()
        .map(|qi| {
            let r = scalar % BigUint::from(qi.modulus());
            r.iter_u64_digits().next().unwrap_or(0)
        })
        .collect()
}

/// Lift a polynomial modulo `T_base` into the larger context, keeping its
/// coefficients as integers in `[0, T_base)`.
pub(crate) fn lift_into(message: &Poly, ctx: &Arc<Context>) -> Result<Poly> {
    let mut message = message.clone();
    message.change_representation(Representation::PowerBasis);
    let coefficients = message.coefficients().row(0).to_vec();
    Ok(Poly::try_convert_from(
        coefficients,
        ctx,
        false,
        Representation::PowerBasis,
    )?)
}

/// Centered representative of `x mod q`, as a magnitude.
pub(crate) fn centered_abs(x: u64, q: u64) -> u64 {
    if x > q / 2 {
        q - x
    } else {
        x
    }
}

/// Largest centered distance between the coefficients of two polynomials
/// over a single modulus.
pub(crate) fn max_centered_distance(a: &Poly, b: &Poly) -> u64 {
    let mut a = a.clone();
    let mut b = b.clone();
    a.change_representation(Representation::PowerBasis);
    b.change_representation(Representation::PowerBasis);
    let q = a.ctx().moduli()[0];
    izip!(a.coefficients().row(0).iter(), b.coefficients().row(0).iter())
        .map(|(x, y)| centered_abs((x + q - y) % q, q))
        .max()
        .unwrap_or(0)
}
