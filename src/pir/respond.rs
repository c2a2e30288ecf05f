//! PIR Respond: Server response computation
//!
//! # Recursive Contraction
//!
//! The database is a hypercube of plaintexts, row-major with dimension 0
//! most significant. With expanded one-hot selectors E_i for each dimension:
//!
//! ```text
//! product = |cur| / n_i
//! out[k]  = Σ_j E_i[j] ⊙ cur[k + j·product]      k < product
//! ```
//!
//! Before the next dimension every `out[k]` is decomposed into
//! `expansion_ratio` plaintexts, so the next level again multiplies a fresh
//! ciphertext by small plaintexts and noise never compounds. The reply is
//! the output of the last dimension, `expansion_ratio^(d-1)` ciphertexts per
//! column.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::math::{NttContext, Poly};
use crate::params::PirParams;
use crate::rlwe::RlweCiphertext;

use super::decompose::decompose_ciphertext;
use super::encode_db::EncodedDatabase;

/// One dimension: fold `selectors` (NTT) against NTT-domain plaintexts
///
/// Output is in coefficient domain.
fn contract(selectors: &[RlweCiphertext], plaintexts: &[Poly], ctx: &NttContext) -> Vec<RlweCiphertext> {
    let product = plaintexts.len() / selectors.len();
    debug_assert_eq!(product * selectors.len(), plaintexts.len());

    (0..product)
        .into_par_iter()
        .map(|k| {
            let mut acc = RlweCiphertext::zero_ntt(ctx);
            for (j, selector) in selectors.iter().enumerate() {
                acc.mul_plain_acc(selector, &plaintexts[k + j * product], ctx);
            }
            acc.from_ntt(ctx);
            acc
        })
        .collect()
}

/// Decompose each ciphertext into NTT-domain plaintexts, chunk-major per input
fn to_plaintexts(cts: &[RlweCiphertext], plain_bits: u32, ctx: &NttContext) -> Vec<Poly> {
    cts.par_iter()
        .flat_map_iter(|ct| {
            decompose_ciphertext(ct, plain_bits, ctx)
                .into_iter()
                .map(|mut p| {
                    p.to_ntt(ctx);
                    p
                })
        })
        .collect()
}

/// Reply ciphertexts for one column
pub fn respond_column(
    params: &PirParams,
    plaintexts: &[Poly],
    selectors: &[Vec<RlweCiphertext>],
    ctx: &NttContext,
) -> Vec<RlweCiphertext> {
    let mut cur: Cow<[Poly]> = Cow::Borrowed(plaintexts);
    let last = selectors.len() - 1;

    for (dim, dim_selectors) in selectors.iter().enumerate() {
        let out = contract(dim_selectors, &cur, ctx);
        if dim == last {
            return out;
        }
        cur = Cow::Owned(to_plaintexts(&out, params.plain_bits, ctx));
    }
    Vec::new()
}

/// Full reply: every column's block, in column order
///
/// `expanded` holds the per-dimension one-hot vectors in coefficient domain.
/// The database must be preprocessed.
pub fn respond(
    params: &PirParams,
    db: &EncodedDatabase,
    mut expanded: Vec<Vec<RlweCiphertext>>,
    ctx: &NttContext,
) -> Vec<RlweCiphertext> {
    expanded
        .par_iter_mut()
        .flat_map(|dim| dim.par_iter_mut())
        .for_each(|ct| ct.to_ntt(ctx));

    (0..params.columns)
        .into_par_iter()
        .flat_map_iter(|column| respond_column(params, db.preprocessed_column(column), &expanded, ctx))
        .collect()
}
