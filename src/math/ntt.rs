//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^n + 1), with q given as a product of word-sized primes
//! (RNS representation). Every prime is processed independently.
//!
//! # Theory
//!
//! For negacyclic convolution we use a primitive 2n-th root of unity ψ with
//! ψ^n = -1. The forward transform evaluates a polynomial at the odd powers
//! of ψ (in bit-reversed order), so a product in R_q becomes a pointwise
//! product of evaluations.
//!
//! # Representation
//!
//! A polynomial over k primes is a flat slice of `k * n` residues, row `i`
//! holding the coefficients modulo `moduli[i]`. Values are always kept in
//! standard (non-Montgomery) form; only the twiddle tables are stored in
//! Montgomery form so that a single Montgomery multiplication yields a
//! standard-form product.
//!
//! # Example
//!
//! ```
//! use sealpir::math::ntt::NttContext;
//! use sealpir::params::MODULUS_CHAIN;
//!
//! let ctx = NttContext::with_moduli(256, &MODULUS_CHAIN[..2]);
//!
//! let mut coeffs = vec![1u64; 2 * 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert!(coeffs.iter().all(|&c| c == 1));
//! ```

use super::crt::CrtBasis;
use super::modular::ModQ;

/// Precomputed NTT tables for a ring dimension and a chain of RNS primes.
///
/// Create once and share by reference; it carries no mutable state.
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// RNS primes, each ≡ 1 (mod 2n).
    moduli: Vec<u64>,
    /// -q^(-1) mod 2^64 per prime.
    q_inv_neg: Vec<u64>,
    /// R^2 mod q per prime.
    r_squared: Vec<u64>,
    /// ψ^bitrev(i) in Montgomery form.
    psi_rev: Vec<Vec<u64>>,
    /// ψ^(-bitrev(i)) in Montgomery form.
    psi_inv_rev: Vec<Vec<u64>>,
    /// n^(-1) in Montgomery form.
    n_inv: Vec<u64>,
    /// CRT reconstruction data for the full modulus.
    crt: CrtBasis,
}

impl NttContext {
    /// Creates an NTT context for a single prime.
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[q])
    }

    /// Creates an NTT context for a chain of RNS primes.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two (at least 2), if `moduli` is empty,
    /// or if some prime does not satisfy q ≡ 1 (mod 2n). Parameter derivation
    /// rejects all of these before a context is built.
    pub fn with_moduli(n: usize, moduli: &[u64]) -> Self {
        assert!(n >= 2 && n.is_power_of_two(), "n must be a power of two");
        assert!(!moduli.is_empty(), "moduli must be non-empty");

        let log_n = n.trailing_zeros();
        let bitrev: Vec<usize> = (0..n)
            .map(|i| i.reverse_bits() >> (usize::BITS - log_n))
            .collect();

        let mut q_inv_neg = Vec::with_capacity(moduli.len());
        let mut r_squared = Vec::with_capacity(moduli.len());
        let mut psi_rev = Vec::with_capacity(moduli.len());
        let mut psi_inv_rev = Vec::with_capacity(moduli.len());
        let mut n_inv = Vec::with_capacity(moduli.len());

        for &q in moduli {
            assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");

            let q_inv = Self::compute_q_inv_neg(q);
            let r2 = Self::compute_r_squared(q);
            let to_mont = |a: u64| Self::montgomery_mul(a, r2, q, q_inv);

            let psi = Self::find_primitive_root(2 * n as u64, q);
            let psi_inv = ModQ::pow(psi, q - 2, q);

            psi_rev.push(
                bitrev
                    .iter()
                    .map(|&e| to_mont(ModQ::pow(psi, e as u64, q)))
                    .collect(),
            );
            psi_inv_rev.push(
                bitrev
                    .iter()
                    .map(|&e| to_mont(ModQ::pow(psi_inv, e as u64, q)))
                    .collect(),
            );
            n_inv.push(to_mont(ModQ::pow(n as u64, q - 2, q)));
            q_inv_neg.push(q_inv);
            r_squared.push(r2);
        }

        Self {
            n,
            moduli: moduli.to_vec(),
            q_inv_neg,
            r_squared,
            psi_rev,
            psi_inv_rev,
            n_inv,
            crt: CrtBasis::new(moduli),
        }
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the RNS primes.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of RNS primes.
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// CRT data for the composite modulus.
    pub fn crt(&self) -> &CrtBasis {
        &self.crt
    }

    /// Forward NTT in place over every residue row.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(
            coeffs.len(),
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );
        for (idx, row) in coeffs.chunks_exact_mut(self.n).enumerate() {
            self.forward_at(row, idx);
        }
    }

    /// Inverse NTT in place over every residue row.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(
            coeffs.len(),
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );
        for (idx, row) in coeffs.chunks_exact_mut(self.n).enumerate() {
            self.inverse_at(row, idx);
        }
    }

    /// Cooley-Tukey decimation-in-time on one residue row.
    pub fn forward_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_rev = &self.psi_rev[idx];

        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = psi_rev[m + i];
                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = self.mont_mul_at(coeffs[j + t], w, idx);
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = ModQ::sub(u, v, q);
                }
            }
            m <<= 1;
        }
    }

    /// Gentleman-Sande decimation-in-frequency on one residue row.
    pub fn inverse_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_inv_rev = &self.psi_inv_rev[idx];

        let mut t = 1;
        let mut m = n;
        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = psi_inv_rev[m + i];
                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = ModQ::add(u, v, q);
                    coeffs[j + t] = self.mont_mul_at(ModQ::sub(u, v, q), w, idx);
                }
            }
            t <<= 1;
        }

        let n_inv = self.n_inv[idx];
        for c in coeffs.iter_mut() {
            *c = self.mont_mul_at(*c, n_inv, idx);
        }
    }

    /// Standard-form product `a * b mod q_idx`.
    #[inline]
    pub fn mul_at(&self, a: u64, b: u64, idx: usize) -> u64 {
        let ab_r_inv = self.mont_mul_at(a, b, idx);
        self.mont_mul_at(ab_r_inv, self.r_squared[idx], idx)
    }

    /// Pointwise product of two NTT-domain polynomials.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        for (idx, ((r, x), y)) in result
            .chunks_exact_mut(self.n)
            .zip(a.chunks_exact(self.n))
            .zip(b.chunks_exact(self.n))
            .enumerate()
        {
            for ((r, &x), &y) in r.iter_mut().zip(x).zip(y) {
                *r = self.mul_at(x, y, idx);
            }
        }
    }

    /// Fused `acc += a * b` on NTT-domain polynomials.
    pub fn pointwise_mul_acc(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        for (idx, ((r, x), y)) in acc
            .chunks_exact_mut(self.n)
            .zip(a.chunks_exact(self.n))
            .zip(b.chunks_exact(self.n))
            .enumerate()
        {
            let q = self.moduli[idx];
            for ((r, &x), &y) in r.iter_mut().zip(x).zip(y) {
                *r = ModQ::add(*r, self.mul_at(x, y, idx), q);
            }
        }
    }

    #[inline]
    fn mont_mul_at(&self, a: u64, b: u64, idx: usize) -> u64 {
        Self::montgomery_mul(a, b, self.moduli[idx], self.q_inv_neg[idx])
    }

    #[inline]
    fn montgomery_mul(a: u64, b: u64, q: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    /// Finds ψ with ψ^order = 1 and ψ^(order/2) = -1.
    fn find_primitive_root(order: u64, q: u64) -> u64 {
        let exp = (q - 1) / order;
        for g in 2..q {
            let psi = ModQ::pow(g, exp, q);
            if ModQ::pow(psi, order / 2, q) == q - 1 {
                return psi;
            }
        }
        unreachable!("q ≡ 1 (mod order) guarantees a primitive root")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MODULUS_CHAIN;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn schoolbook(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = ModQ::mul(a[i], b[j], q);
                let k = i + j;
                if k < n {
                    out[k] = ModQ::add(out[k], prod, q);
                } else {
                    out[k - n] = ModQ::sub(out[k - n], prod, q);
                }
            }
        }
        out
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let n = 1024;
        let ctx = NttContext::with_moduli(n, &MODULUS_CHAIN);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let original: Vec<u64> = ctx
            .moduli()
            .iter()
            .flat_map(|&q| (0..n).map(move |_| q))
            .map(|q| rng.gen_range(0..q))
            .collect();
        let mut coeffs = original.clone();
        ctx.forward(&mut coeffs);
        assert_ne!(coeffs, original);
        ctx.inverse(&mut coeffs);
        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_negacyclic_product_matches_schoolbook() {
        let n = 32;
        let ctx = NttContext::with_moduli(n, &MODULUS_CHAIN[..2]);
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        for (idx, &q) in ctx.moduli().iter().enumerate() {
            let a: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let b: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let expected = schoolbook(&a, &b, q);

            let mut fa = a.clone();
            let mut fb = b.clone();
            ctx.forward_at(&mut fa, idx);
            ctx.forward_at(&mut fb, idx);
            let mut prod: Vec<u64> = fa
                .iter()
                .zip(&fb)
                .map(|(&x, &y)| ctx.mul_at(x, y, idx))
                .collect();
            ctx.inverse_at(&mut prod, idx);
            assert_eq!(prod, expected, "mismatch for prime {}", idx);
        }
    }

    #[test]
    fn test_x_times_x_pow_n_minus_1_is_minus_one() {
        let n = 64;
        let q = MODULUS_CHAIN[0];
        let ctx = NttContext::new(n, q);

        let mut x = vec![0u64; n];
        x[1] = 1;
        let mut y = vec![0u64; n];
        y[n - 1] = 1;
        ctx.forward(&mut x);
        ctx.forward(&mut y);
        let mut prod = vec![0u64; n];
        ctx.pointwise_mul(&x, &y, &mut prod);
        ctx.inverse(&mut prod);

        assert_eq!(prod[0], q - 1);
        assert!(prod[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_mul_at_matches_modq() {
        let ctx = NttContext::new(16, MODULUS_CHAIN[1]);
        let q = MODULUS_CHAIN[1];
        for (a, b) in [(0, 5), (q - 1, q - 1), (123456789, 987654321)] {
            assert_eq!(ctx.mul_at(a, b, 0), ModQ::mul(a, b, q));
        }
    }
}
