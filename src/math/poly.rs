//! Polynomial operations over R_q = Z_q[X]/(X^n + 1) in RNS form.
//!
//! A [`Poly`] stores one row of `n` residues per prime of the modulus chain,
//! flattened row-major. It does not own its modulus: every operation takes
//! the [`NttContext`] describing the ring, so one context can be shared by
//! all polynomials of a parameter set.
//!
//! Polynomials live either in the coefficient domain or in the NTT domain.
//! Additions work in both; ring products require the NTT domain while
//! automorphisms and monomial shifts require the coefficient domain.
//!
//! # Example
//!
//! ```
//! use sealpir::math::{NttContext, Poly};
//! use sealpir::params::MODULUS_CHAIN;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let ctx = NttContext::with_moduli(256, &MODULUS_CHAIN[..2]);
//! let mut rng = ChaCha20Rng::seed_from_u64(7);
//!
//! let a = Poly::random(&ctx, &mut rng);
//! let b = Poly::from_small(&[3], &ctx);
//! let product = a.mul_ntt(&b, &ctx);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gaussian::GaussianSampler;
use super::modular::ModQ;
use super::ntt::NttContext;

/// Polynomial in R_q, one residue row per RNS prime.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly {
    /// Residues, `crt_count` rows of `n` values.
    coeffs: Vec<u64>,
    /// Whether the rows are in NTT domain.
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial in coefficient domain.
    pub fn zero(ctx: &NttContext) -> Self {
        Self {
            coeffs: vec![0; ctx.dimension() * ctx.crt_count()],
            is_ntt: false,
        }
    }

    /// Wraps raw residues; values must already be reduced per row.
    pub fn from_residues(coeffs: Vec<u64>, is_ntt: bool) -> Self {
        Self { coeffs, is_ntt }
    }

    /// Lifts non-negative integers smaller than every prime into all residue rows.
    ///
    /// Missing trailing coefficients are zero.
    pub fn from_small(values: &[u64], ctx: &NttContext) -> Self {
        let n = ctx.dimension();
        let mut coeffs = vec![0u64; n * ctx.crt_count()];
        for (row, &q) in coeffs.chunks_exact_mut(n).zip(ctx.moduli()) {
            for (c, &v) in row.iter_mut().zip(values) {
                *c = v % q;
            }
        }
        Self {
            coeffs,
            is_ntt: false,
        }
    }

    /// Lifts signed integers into all residue rows.
    pub fn from_signed(values: &[i64], ctx: &NttContext) -> Self {
        let n = ctx.dimension();
        let mut coeffs = vec![0u64; n * ctx.crt_count()];
        for (row, &q) in coeffs.chunks_exact_mut(n).zip(ctx.moduli()) {
            for (c, &v) in row.iter_mut().zip(values) {
                *c = ModQ::from_signed(v, q);
            }
        }
        Self {
            coeffs,
            is_ntt: false,
        }
    }

    /// Uniformly random polynomial. The distribution is the same in either
    /// domain, so the result is tagged as NTT to skip a transform.
    pub fn random<R: Rng + ?Sized>(ctx: &NttContext, rng: &mut R) -> Self {
        let n = ctx.dimension();
        let coeffs = ctx
            .moduli()
            .iter()
            .flat_map(|&q| std::iter::repeat(q).take(n))
            .map(|q| rng.gen_range(0..q))
            .collect();
        Self {
            coeffs,
            is_ntt: true,
        }
    }

    /// Polynomial with discrete Gaussian coefficients, coefficient domain.
    pub fn sample_gaussian(ctx: &NttContext, sampler: &mut GaussianSampler) -> Self {
        let values = sampler.sample_vec(ctx.dimension());
        Self::from_signed(&values, ctx)
    }

    /// All residues, row-major.
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Mutable access to all residues.
    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    /// Residue row for prime `idx`.
    pub fn row(&self, idx: usize, ctx: &NttContext) -> &[u64] {
        let n = ctx.dimension();
        &self.coeffs[idx * n..(idx + 1) * n]
    }

    /// Whether the polynomial is in NTT domain.
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Converts to NTT domain (no-op if already there).
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Converts to coefficient domain (no-op if already there).
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    pub fn add_assign(&mut self, other: &Poly, ctx: &NttContext) {
        debug_assert_eq!(self.is_ntt, other.is_ntt, "domain mismatch");
        self.zip_rows(other, ctx, ModQ::add);
    }

    pub fn sub_assign(&mut self, other: &Poly, ctx: &NttContext) {
        debug_assert_eq!(self.is_ntt, other.is_ntt, "domain mismatch");
        self.zip_rows(other, ctx, ModQ::sub);
    }

    pub fn negate(&mut self, ctx: &NttContext) {
        let n = ctx.dimension();
        for (row, &q) in self.coeffs.chunks_exact_mut(n).zip(ctx.moduli()) {
            for c in row.iter_mut() {
                *c = ModQ::negate(*c, q);
            }
        }
    }

    /// Multiplies row `i` by `scalars[i]`.
    pub fn mul_rns_scalar(&mut self, scalars: &[u64], ctx: &NttContext) {
        let n = ctx.dimension();
        for (idx, (row, &s)) in self.coeffs.chunks_exact_mut(n).zip(scalars).enumerate() {
            for c in row.iter_mut() {
                *c = ctx.mul_at(*c, s, idx);
            }
        }
    }

    /// Ring product; converts copies of both operands to NTT domain as needed.
    /// The result is in NTT domain.
    pub fn mul_ntt(&self, other: &Poly, ctx: &NttContext) -> Poly {
        let mut a = self.clone();
        let mut b = other.clone();
        a.to_ntt(ctx);
        b.to_ntt(ctx);
        a.mul_ntt_domain(&b, ctx)
    }

    /// Ring product of two NTT-domain polynomials.
    pub fn mul_ntt_domain(&self, other: &Poly, ctx: &NttContext) -> Poly {
        debug_assert!(self.is_ntt && other.is_ntt, "operands must be in NTT domain");
        let mut out = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut out);
        Poly {
            coeffs: out,
            is_ntt: true,
        }
    }

    /// `self += a * b` for NTT-domain operands.
    pub fn mul_acc_ntt_domain(&mut self, a: &Poly, b: &Poly, ctx: &NttContext) {
        debug_assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "operands must be in NTT domain"
        );
        ctx.pointwise_mul_acc(&mut self.coeffs, &a.coeffs, &b.coeffs);
    }

    /// Multiplies by the monomial X^k, k taken modulo 2n (coefficient domain).
    pub fn mul_monomial(&self, k: usize, ctx: &NttContext) -> Poly {
        debug_assert!(!self.is_ntt, "monomial shift needs coefficient domain");
        let n = ctx.dimension();
        let k = k % (2 * n);
        let mut out = vec![0u64; self.coeffs.len()];

        for ((dst, src), &q) in out
            .chunks_exact_mut(n)
            .zip(self.coeffs.chunks_exact(n))
            .zip(ctx.moduli())
        {
            for (i, &c) in src.iter().enumerate() {
                let j = i + k;
                if j < n {
                    dst[j] = c;
                } else if j < 2 * n {
                    dst[j - n] = ModQ::negate(c, q);
                } else {
                    dst[j - 2 * n] = c;
                }
            }
        }

        Poly {
            coeffs: out,
            is_ntt: false,
        }
    }

    /// Largest centered absolute value of the first residue row.
    ///
    /// Meaningful for polynomials whose true coefficients are far below the
    /// smallest prime, such as error terms.
    pub fn linf_norm(&self, ctx: &NttContext) -> u64 {
        let q = ctx.moduli()[0];
        self.row(0, ctx)
            .iter()
            .map(|&c| ModQ::to_signed(c, q).unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    fn zip_rows(&mut self, other: &Poly, ctx: &NttContext, op: fn(u64, u64, u64) -> u64) {
        let n = ctx.dimension();
        for ((row, other_row), &q) in self
            .coeffs
            .chunks_exact_mut(n)
            .zip(other.coeffs.chunks_exact(n))
            .zip(ctx.moduli())
        {
            for (a, &b) in row.iter_mut().zip(other_row) {
                *a = op(*a, b, q);
            }
        }
    }
}
