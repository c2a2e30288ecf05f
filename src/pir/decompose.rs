//! Ciphertext ⇄ plaintext decomposition between recursion levels
//!
//! A coefficient-domain ciphertext is cut into `expansion_ratio` plaintexts:
//! for poly a then b, for each prime q_i, for each chunk s, the plaintext
//! whose coefficient j is `(residue_i[j] >> (w·s)) & (2^w − 1)` with
//! w = plain_bits. Every chunk is below 2^w < t, so the server can multiply
//! them by the next dimension's selectors and the client recovers them
//! exactly by decryption.

use crate::math::{NttContext, Poly};
use crate::rlwe::RlweCiphertext;

/// Plaintext chunks needed for one residue modulo `q`
pub fn chunks_per_prime(q: u64, plain_bits: u32) -> usize {
    (u64::BITS - q.leading_zeros()).div_ceil(plain_bits) as usize
}

/// Split a coefficient-domain ciphertext into plaintexts (coefficient domain)
pub fn decompose_ciphertext(ct: &RlweCiphertext, plain_bits: u32, ctx: &NttContext) -> Vec<Poly> {
    debug_assert!(!ct.is_ntt(), "decompose needs coefficient domain");
    let mask = (1u64 << plain_bits) - 1;
    let mut out = Vec::new();

    for part in [&ct.a, &ct.b] {
        for (i, &q) in ctx.moduli().iter().enumerate() {
            let row = part.row(i, ctx);
            for s in 0..chunks_per_prime(q, plain_bits) {
                let shift = plain_bits * s as u32;
                let chunk: Vec<u64> = row.iter().map(|&c| (c >> shift) & mask).collect();
                out.push(Poly::from_small(&chunk, ctx));
            }
        }
    }
    out
}

/// Rebuild a ciphertext from its decrypted chunks
///
/// Returns `None` if the chunk count is wrong, a chunk is wider than
/// `plain_bits`, or a rebuilt residue is not reduced.
pub fn compose_ciphertext(
    chunks: &[Vec<u64>],
    plain_bits: u32,
    ctx: &NttContext,
) -> Option<RlweCiphertext> {
    let n = ctx.dimension();
    let per_part: usize = ctx
        .moduli()
        .iter()
        .map(|&q| chunks_per_prime(q, plain_bits))
        .sum();
    if chunks.len() != 2 * per_part || chunks.iter().any(|c| c.len() != n) {
        return None;
    }

    let mut chunks = chunks.iter();
    let mut parts = Vec::with_capacity(2);
    for _ in 0..2 {
        let mut residues = Vec::with_capacity(n * ctx.crt_count());
        for &q in ctx.moduli() {
            let mut row = vec![0u128; n];
            for s in 0..chunks_per_prime(q, plain_bits) {
                let chunk = chunks.next()?;
                let shift = plain_bits * s as u32;
                for (acc, &c) in row.iter_mut().zip(chunk) {
                    if c >> plain_bits != 0 {
                        return None;
                    }
                    *acc |= (c as u128) << shift;
                }
            }
            for acc in row {
                if acc >= q as u128 {
                    return None;
                }
                residues.push(acc as u64);
            }
        }
        parts.push(Poly::from_residues(residues, false));
    }

    let b = parts.pop()?;
    let a = parts.pop()?;
    Some(RlweCiphertext::from_parts(a, b))
}
