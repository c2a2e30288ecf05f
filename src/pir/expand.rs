//! Oblivious query expansion
//!
//! Turns a selector ciphertext covering m slots into m ciphertexts, slot j
//! encrypting 2^l times coefficient j of the selector (l = ⌈log2 m⌉).
//!
//! Round a doubles the list. With g = N/2^a + 1, τ_g fixes the even powers
//! of X^{2^a} and negates the odd ones, so for every ciphertext c0:
//!
//! ```text
//! c1   = τ_g(c0)                       (key-switched back to s)
//! even = c0 + c1                       → position b
//! odd  = (c0 − c1) · X^{-2^a}          → position b + 2^a
//! ```
//!
//! After l rounds position j holds 2^l·s_j in its constant coefficient.

use rayon::prelude::*;

use crate::ks::{apply_galois, GaloisKeys};
use crate::math::NttContext;
use crate::params::{expansion_rounds, PirParams};
use crate::rlwe::{expansion_galois_element, RlweCiphertext};

use super::error::{PirError, Result};
use super::query::selector_lengths;

/// Expand one coefficient-domain selector into its first `m` slots
pub fn expand_selector(
    ct: &RlweCiphertext,
    m: usize,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<Vec<RlweCiphertext>> {
    let n = ctx.dimension();
    let rounds = expansion_rounds(m);
    debug_assert!(m <= n, "selector covers at most N slots");

    let mut current = vec![ct.clone()];
    for round in 0..rounds {
        let g = expansion_galois_element(n, round);
        let inverse_shift = 2 * n - (1 << round);

        let pairs = current
            .par_iter()
            .map(|c0| {
                let c1 = apply_galois(c0, g, keys, ctx).ok_or_else(|| {
                    PirError::InvalidKey(format!("missing Galois element {}", g))
                })?;
                let even = c0.add(&c1, ctx);
                let odd = c0.sub(&c1, ctx).mul_monomial(inverse_shift, ctx);
                Ok((even, odd))
            })
            .collect::<Result<Vec<_>>>()?;

        let (evens, odds): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        current = evens;
        current.extend(odds);
    }

    current.truncate(m);
    Ok(current)
}

/// Expand every selector of a query into per-dimension one-hot vectors
///
/// Returns `d` vectors; vector i holds `extents[i]` ciphertexts in
/// coefficient domain.
pub fn expand_query(
    params: &PirParams,
    selectors: &[RlweCiphertext],
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<Vec<Vec<RlweCiphertext>>> {
    let lengths = selector_lengths(params);
    if selectors.len() != lengths.len() {
        return Err(PirError::MalformedQuery(format!(
            "expected {} selectors, got {}",
            lengths.len(),
            selectors.len()
        )));
    }

    let mut slots = Vec::with_capacity(lengths.iter().sum());
    for (ct, &m) in selectors.iter().zip(&lengths) {
        slots.extend(expand_selector(ct, m, keys, ctx)?);
    }

    let mut slots = slots.into_iter();
    Ok(params
        .extents
        .iter()
        .map(|&extent| slots.by_ref().take(extent).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::GadgetVector;
    use crate::math::GaussianSampler;
    use crate::params::MODULUS_CHAIN;
    use crate::rlwe::{expansion_galois_elements, BfvContext, RlweSecretKey};

    #[test]
    fn test_expand_selector_one_hot() {
        let bfv = BfvContext::new(64, &MODULUS_CHAIN[..1], 65537, 3.2);
        let ctx = bfv.ntt();
        let t = bfv.plain_modulus();
        let mut sampler = GaussianSampler::with_seed(3.2, 21);
        let sk = RlweSecretKey::generate(&bfv, &mut sampler);

        let m = 11;
        let rounds = expansion_rounds(m);
        let gadget = GadgetVector::new(12, ctx.moduli());
        let keys = GaloisKeys::generate(
            &sk,
            &expansion_galois_elements(64, rounds),
            &gadget,
            &mut sampler,
            ctx,
        );

        let mut message = vec![0u64; 64];
        message[6] = 5;
        message[9] = 7;
        let ct = RlweCiphertext::encrypt(&sk, &message, &bfv, &mut sampler);

        let expanded = expand_selector(&ct, m, &keys, ctx).unwrap();
        assert_eq!(expanded.len(), m);
        for (j, slot) in expanded.iter().enumerate() {
            let decrypted = slot.decrypt(&sk, &bfv);
            let expected = (message[j] << rounds) % t;
            assert_eq!(decrypted[0], expected, "slot {}", j);
            assert!(decrypted[1..].iter().all(|&c| c == 0), "slot {}", j);
        }
    }

    #[test]
    fn test_missing_key_is_invalid() {
        let bfv = BfvContext::new(64, &MODULUS_CHAIN[..1], 65537, 3.2);
        let ctx = bfv.ntt();
        let mut sampler = GaussianSampler::with_seed(3.2, 22);
        let sk = RlweSecretKey::generate(&bfv, &mut sampler);
        let gadget = GadgetVector::new(12, ctx.moduli());
        // Only the first round's key
        let keys = GaloisKeys::generate(&sk, &[65], &gadget, &mut sampler, ctx);

        let ct = RlweCiphertext::encrypt(&sk, &[1], &bfv, &mut sampler);
        assert_eq!(expand_selector(&ct, 2, &keys, ctx).unwrap().len(), 2);
        assert!(matches!(
            expand_selector(&ct, 4, &keys, ctx),
            Err(PirError::InvalidKey(_))
        ));
    }
}
