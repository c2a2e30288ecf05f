//! PIR Extract: Client reply decoding
//!
//! Each column's block of `expansion_ratio^(d-1)` ciphertexts is peeled one
//! recursion level at a time: decrypt everything, regroup consecutive
//! `expansion_ratio` plaintexts into the ciphertext they were cut from, and
//! repeat until a single plaintext remains. That plaintext is unpacked into
//! ⌊N·plain_bits/8⌋ bytes.

use crate::params::PirParams;
use crate::rlwe::{BfvContext, RlweCiphertext, RlweSecretKey};

use super::decompose::compose_ciphertext;
use super::encode_db::coeffs_to_bytes;
use super::error::{PirError, Result};
use super::wire::PirReply;

/// Decrypt and check every coefficient fits in `plain_bits`
fn decrypt_checked(
    ct: &RlweCiphertext,
    sk: &RlweSecretKey,
    bfv: &BfvContext,
    plain_bits: u32,
) -> Result<Vec<u64>> {
    let plaintext = ct.decrypt(sk, bfv);
    if plaintext.iter().any(|&c| c >> plain_bits != 0) {
        return Err(PirError::DecryptionError(format!(
            "decrypted coefficient exceeds {} bits",
            plain_bits
        )));
    }
    Ok(plaintext)
}

/// Peel one column block down to its final plaintext
fn decode_column(
    params: &PirParams,
    block: &[RlweCiphertext],
    sk: &RlweSecretKey,
    bfv: &BfvContext,
) -> Result<Vec<u64>> {
    let ratio = params.expansion_ratio();
    let mut plaintexts = block
        .iter()
        .map(|ct| decrypt_checked(ct, sk, bfv, params.plain_bits))
        .collect::<Result<Vec<_>>>()?;

    while plaintexts.len() > 1 {
        plaintexts = plaintexts
            .chunks(ratio)
            .map(|group| {
                let ct = compose_ciphertext(group, params.plain_bits, bfv.ntt()).ok_or_else(
                    || PirError::DecryptionError("chunks do not form a ciphertext".into()),
                )?;
                decrypt_checked(&ct, sk, bfv, params.plain_bits)
            })
            .collect::<Result<Vec<_>>>()?;
    }

    plaintexts
        .pop()
        .ok_or_else(|| PirError::DecryptionError("empty reply block".into()))
}

/// Decode every column of a reply and concatenate their bytes
pub fn decode_reply(
    params: &PirParams,
    reply: &PirReply,
    sk: &RlweSecretKey,
    bfv: &BfvContext,
) -> Result<Vec<u8>> {
    let ciphertexts = reply.to_ciphertexts(params.reply_count(), bfv.ntt())?;
    let block = params.reply_count() / params.columns;
    let bytes_per_plaintext = params.bytes_per_plaintext();

    let mut out = Vec::with_capacity(params.columns * bytes_per_plaintext);
    for column in ciphertexts.chunks(block) {
        let plaintext = decode_column(params, column, sk, bfv)?;
        out.extend(coeffs_to_bytes(&plaintext, params.plain_bits, bytes_per_plaintext));
    }
    Ok(out)
}

/// Decode a reply and slice out element `index`
pub fn decode_element(
    params: &PirParams,
    index: usize,
    reply: &PirReply,
    sk: &RlweSecretKey,
    bfv: &BfvContext,
) -> Result<Vec<u8>> {
    if index >= params.element_count {
        return Err(PirError::IndexOutOfRange {
            index,
            element_count: params.element_count,
        });
    }
    let bytes = decode_reply(params, reply, sk, bfv)?;
    let start = params.plaintext_offset(index) * params.element_size;
    bytes
        .get(start..start + params.element_size)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| PirError::DecryptionError("reply shorter than element".into()))
}
