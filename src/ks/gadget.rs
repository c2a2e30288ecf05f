//! RNS gadget decomposition.
//!
//! Over q = Π q_i the gadget vector has one block per prime:
//!
//! ```text
//! g = [ q̂_0·z^0, ..., q̂_0·z^(ℓ_0-1), q̂_1·z^0, ..., q̂_{k-1}·z^(ℓ_{k-1}-1) ]
//! ```
//!
//! with z = 2^base_bits and ℓ_i = ⌈log_z q_i⌉. A polynomial a decomposes into
//! the base-z digits of `[a_i · q̂_i^{-1}]_{q_i}` for each prime i; every
//! digit is below z, so the same small integer is valid in every residue
//! row. Then ⟨g^{-1}(a), g⟩ ≡ a (mod q) by CRT.

use serde::{Deserialize, Serialize};

use crate::math::{ModQ, NttContext, Poly};

/// Gadget parameters for a modulus chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// log2 of the gadget base z.
    pub base_bits: u32,
    /// Digits per prime, ℓ_i.
    pub digits: Vec<usize>,
}

impl GadgetVector {
    /// Gadget with base 2^base_bits for the given primes.
    pub fn new(base_bits: u32, moduli: &[u64]) -> Self {
        debug_assert!((1..=32).contains(&base_bits), "Gadget base out of range");
        let digits = moduli
            .iter()
            .map(|&q| Self::digits_for(q, base_bits))
            .collect();
        Self { base_bits, digits }
    }

    /// ⌈bits(q) / base_bits⌉
    pub fn digits_for(q: u64, base_bits: u32) -> usize {
        let bits = u64::BITS - q.leading_zeros();
        bits.div_ceil(base_bits) as usize
    }

    /// Total gadget length ℓ = Σ ℓ_i.
    pub fn len(&self) -> usize {
        self.digits.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gadget entries as residue vectors, in decomposition order.
    ///
    /// Entry (i, j) is q̂_i·z^j, which vanishes modulo every prime but q_i.
    pub fn weights(&self, ctx: &NttContext) -> Vec<Vec<u64>> {
        let crt = ctx.crt();
        let mut out = Vec::with_capacity(self.len());
        for (i, &ell) in self.digits.iter().enumerate() {
            for j in 0..ell {
                let shift = j as u64 * self.base_bits as u64;
                let w = ctx
                    .moduli()
                    .iter()
                    .enumerate()
                    .map(|(p, &q)| {
                        let z_pow = ModQ::pow(2, shift, q);
                        ModQ::mul(z_pow, crt.q_hat_mod(i, p), q)
                    })
                    .collect();
                out.push(w);
            }
        }
        out
    }

    /// Decomposes a coefficient-domain polynomial into ℓ digit polynomials
    /// (coefficient domain, entries below 2^base_bits).
    pub fn decompose(&self, poly: &Poly, ctx: &NttContext) -> Vec<Poly> {
        debug_assert!(!poly.is_ntt(), "decompose needs coefficient domain");
        let n = ctx.dimension();
        let crt = ctx.crt();
        let mask = (1u64 << self.base_bits) - 1;

        let mut out = Vec::with_capacity(self.len());
        for (i, (&ell, &q)) in self.digits.iter().zip(ctx.moduli()).enumerate() {
            let q_hat_inv = crt.q_hat_inv(i);
            let source: Vec<u64> = poly
                .row(i, ctx)
                .iter()
                .map(|&c| ModQ::mul(c, q_hat_inv, q))
                .collect();

            for j in 0..ell {
                let shift = j as u32 * self.base_bits;
                let digits: Vec<u64> = source.iter().map(|&y| (y >> shift) & mask).collect();
                let mut residues = Vec::with_capacity(n * ctx.crt_count());
                for _ in 0..ctx.crt_count() {
                    residues.extend_from_slice(&digits);
                }
                out.push(Poly::from_residues(residues, false));
            }
        }
        out
    }

    /// Inverse of [`Self::decompose`]: Σ digit · weight.
    pub fn reconstruct(&self, digits: &[Poly], ctx: &NttContext) -> Poly {
        let mut acc = Poly::zero(ctx);
        for (digit, w) in digits.iter().zip(self.weights(ctx)) {
            let mut term = digit.clone();
            term.mul_rns_scalar(&w, ctx);
            acc.add_assign(&term, ctx);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MODULUS_CHAIN;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_digit_counts() {
        let g = GadgetVector::new(20, &MODULUS_CHAIN[..2]);
        assert_eq!(g.digits, vec![3, 3]);
        assert_eq!(g.len(), 6);
        assert_eq!(GadgetVector::new(7, &MODULUS_CHAIN[..1]).len(), 9);
    }

    #[test]
    fn test_decompose_reconstruct() {
        for (k, bits) in [(1usize, 4u32), (2, 20), (3, 13)] {
            let ctx = NttContext::with_moduli(32, &MODULUS_CHAIN[..k]);
            let gadget = GadgetVector::new(bits, ctx.moduli());
            let mut rng = ChaCha20Rng::seed_from_u64(k as u64);
            let mut a = Poly::random(&ctx, &mut rng);
            a.from_ntt(&ctx);

            let digits = gadget.decompose(&a, &ctx);
            assert_eq!(digits.len(), gadget.len());
            for d in &digits {
                assert!(d.coeffs().iter().all(|&c| c < (1 << bits)));
            }
            assert_eq!(gadget.reconstruct(&digits, &ctx), a);
        }
    }
}
