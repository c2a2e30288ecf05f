//! Galois automorphisms for RLWE
//!
//! Galois automorphisms τ_g: R → R are ring automorphisms defined by
//! τ_g(X) = X^g for odd g ∈ Z_{2n}^*.
//!
//! Query expansion only needs the elements g_a = n/2^a + 1: τ_{g_a} fixes
//! the monomials X^{k·2^{a+1}} and negates X^{2^a + k·2^{a+1}}, which is
//! what splits a polynomial into its even and odd halves at level a.

use crate::math::{ModQ, NttContext, Poly};

use super::types::RlweCiphertext;

/// Apply Galois automorphism τ_g to a coefficient-domain polynomial
///
/// X^i maps to X^(g·i mod 2n), with a sign flip when the exponent lands in
/// [n, 2n) since X^n = -1.
pub fn apply_automorphism(poly: &Poly, g: usize, ctx: &NttContext) -> Poly {
    debug_assert!(!poly.is_ntt(), "automorphism needs coefficient domain");
    let n = ctx.dimension();
    let two_n = 2 * n;
    let mut out = Poly::zero(ctx);

    for ((dst, src), &q) in out
        .coeffs_mut()
        .chunks_exact_mut(n)
        .zip(poly.coeffs().chunks_exact(n))
        .zip(ctx.moduli())
    {
        let mut idx = 0usize;
        for &c in src.iter() {
            if idx < n {
                dst[idx] = c;
            } else {
                dst[idx - n] = ModQ::negate(c, q);
            }
            idx = (idx + g) % two_n;
        }
    }
    out
}

/// Apply automorphism to RLWE ciphertext
///
/// The result is encrypted under τ_g(s); key switching brings it back to s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize, ctx: &NttContext) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g, ctx),
        b: apply_automorphism(&ct.b, g, ctx),
    }
}

/// Galois element used by expansion round `round`: n/2^round + 1.
pub fn expansion_galois_element(n: usize, round: u32) -> usize {
    (n >> round) + 1
}

/// Galois elements for the first `rounds` expansion rounds.
pub fn expansion_galois_elements(n: usize, rounds: u32) -> Vec<usize> {
    (0..rounds).map(|r| expansion_galois_element(n, r)).collect()
}

/// Check if g is a valid Galois element (odd and below 2n)
pub fn is_valid_galois_element(g: usize, n: usize) -> bool {
    g % 2 == 1 && g < 2 * n
}
