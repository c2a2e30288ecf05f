//! PIR Query: Client query generation
//!
//! # Query Mechanism
//!
//! The element's plaintext row has coordinate (c_0, ..., c_{d-1}) in the
//! hypercube. For each dimension the client encrypts a selector polynomial
//! with a single nonzero coefficient at c_i. Server-side expansion turns a
//! selector covering m slots into m ciphertexts, slot j encrypting 2^l·s_j
//! with l = ⌈log2 m⌉, so the client pre-scales by 2^{-l} mod t and the
//! expanded vector is one-hot.
//!
//! With the packed layout all d selectors share one polynomial, dimension i
//! starting at offset Σ_{k<i} extent_k.

use crate::math::{GaussianSampler, ModQ};
use crate::params::{expansion_rounds, PirParams, QueryLayout};
use crate::rlwe::{BfvContext, RlweCiphertext, RlweSecretKey};

use super::error::{PirError, Result};
use super::wire::PirQuery;

/// Mixed-radix digits of `row`, dimension 0 most significant
pub fn coordinate(row: usize, extents: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; extents.len()];
    let mut rest = row;
    for (c, &extent) in coords.iter_mut().zip(extents).rev() {
        *c = rest % extent;
        rest /= extent;
    }
    coords
}

/// Inverse of [`coordinate`]
pub fn recompose(coords: &[usize], extents: &[usize]) -> usize {
    coords
        .iter()
        .zip(extents)
        .fold(0, |acc, (&c, &extent)| acc * extent + c)
}

/// 2^{-rounds} mod t
pub(crate) fn expansion_scale(rounds: u32, t: u64) -> u64 {
    ModQ::pow(t.div_ceil(2), rounds as u64, t)
}

/// Selector sizes in query order: one entry per ciphertext, the number of
/// slots it expands to.
pub(crate) fn selector_lengths(params: &PirParams) -> Vec<usize> {
    let n = params.poly_degree;
    match params.layout {
        QueryLayout::PerDimension => params
            .extents
            .iter()
            .flat_map(|&extent| {
                (0..extent.div_ceil(n)).map(move |chunk| (extent - chunk * n).min(n))
            })
            .collect(),
        QueryLayout::Packed => vec![params.extents.iter().sum()],
    }
}

/// Plaintext messages of the selectors for element `index`
pub fn selector_messages(params: &PirParams, index: usize) -> Result<Vec<Vec<u64>>> {
    if index >= params.element_count {
        return Err(PirError::IndexOutOfRange {
            index,
            element_count: params.element_count,
        });
    }
    let n = params.poly_degree;
    let t = params.plain_modulus;
    let coords = coordinate(params.plaintext_index(index), &params.extents);

    let messages = match params.layout {
        QueryLayout::PerDimension => {
            let mut messages = Vec::with_capacity(params.query_count());
            for (&c, &extent) in coords.iter().zip(&params.extents) {
                for chunk in 0..extent.div_ceil(n) {
                    let mut message = vec![0u64; n];
                    if chunk == c / n {
                        let len = (extent - chunk * n).min(n);
                        message[c % n] = expansion_scale(expansion_rounds(len), t);
                    }
                    messages.push(message);
                }
            }
            messages
        }
        QueryLayout::Packed => {
            let total: usize = params.extents.iter().sum();
            let scale = expansion_scale(expansion_rounds(total), t);
            let mut message = vec![0u64; n];
            let mut offset = 0;
            for (&c, &extent) in coords.iter().zip(&params.extents) {
                message[offset + c] = scale;
                offset += extent;
            }
            vec![message]
        }
    };
    Ok(messages)
}

/// Encrypt the selectors for element `index` under `sk`
pub fn generate_query(
    params: &PirParams,
    index: usize,
    sk: &RlweSecretKey,
    bfv: &BfvContext,
    sampler: &mut GaussianSampler,
) -> Result<PirQuery> {
    let ciphertexts: Vec<RlweCiphertext> = selector_messages(params, index)?
        .iter()
        .map(|message| RlweCiphertext::encrypt(sk, message, bfv, sampler))
        .collect();
    Ok(PirQuery::from_ciphertexts(&ciphertexts))
}
