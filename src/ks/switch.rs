//! Key-switching operation

use crate::math::{NttContext, Poly};
use crate::rlwe::{automorphism_ciphertext, RlweCiphertext};

use super::gadget::GadgetVector;
use super::setup::{GaloisKeys, KeySwitchingMatrix};

/// Apply key-switching to transform a ciphertext from key s to key s'
///
/// # Algorithm
///
/// 1. Decompose a using the gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
/// 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]
///
/// The result satisfies a'·s' + b' ≈ a·s + b. Input and output are in
/// coefficient domain; the matrix rows are expected in NTT domain.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    gadget: &GadgetVector,
    ctx: &NttContext,
) -> RlweCiphertext {
    debug_assert_eq!(ks_matrix.len(), gadget.len(), "KS matrix must have ℓ rows");

    let mut acc = RlweCiphertext::zero_ntt(ctx);
    for (mut digit, row) in gadget.decompose(&ct.a, ctx).into_iter().zip(&ks_matrix.rows) {
        digit.to_ntt(ctx);
        acc.mul_plain_acc(row, &digit, ctx);
    }
    acc.from_ntt(ctx);

    let mut b: Poly = ct.b.clone();
    b.add_assign(&acc.b, ctx);
    RlweCiphertext::from_parts(acc.a, b)
}

/// Applies τ_g to a ciphertext and switches the result back to the original key.
///
/// Returns `None` when `keys` has no matrix for `galois_element`.
pub fn apply_galois(
    ct: &RlweCiphertext,
    galois_element: usize,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Option<RlweCiphertext> {
    let ks_matrix = keys.get(galois_element)?;
    let rotated = automorphism_ciphertext(ct, galois_element, ctx);
    Some(key_switch(&rotated, ks_matrix, &keys.gadget, ctx))
}
