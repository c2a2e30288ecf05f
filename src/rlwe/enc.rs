//! RLWE encryption, decryption and homomorphic operations
//!
//! Implements symmetric encryption: b = -a·s + e + ⌊q·m/t⌉.

use crate::math::{GaussianSampler, NttContext, Poly};

use super::context::BfvContext;
use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a secret key from the Gaussian distribution
    pub fn generate(bfv: &BfvContext, sampler: &mut GaussianSampler) -> Self {
        let poly = Poly::sample_gaussian(bfv.ntt(), sampler);
        Self::from_poly(poly, bfv.ntt())
    }
}

impl RlweCiphertext {
    /// Encrypt a message polynomial with coefficients in [0, t).
    pub fn encrypt(
        sk: &RlweSecretKey,
        message: &[u64],
        bfv: &BfvContext,
        sampler: &mut GaussianSampler,
    ) -> Self {
        let payload = bfv.scale_up(message);
        Self::encrypt_payload(sk, &payload, bfv.ntt(), sampler)
    }

    /// Encrypts an already-scaled coefficient-domain payload:
    /// `(a, -a·s + e + payload)`.
    ///
    /// Key-switching keys use this directly with payload `τ(s)·w`.
    pub fn encrypt_payload(
        sk: &RlweSecretKey,
        payload: &Poly,
        ctx: &NttContext,
        sampler: &mut GaussianSampler,
    ) -> Self {
        let mut a = Poly::random(ctx, sampler.rng());
        let mut a_s = a.mul_ntt_domain(&sk.poly_ntt, ctx);
        a_s.from_ntt(ctx);

        let mut b = Poly::sample_gaussian(ctx, sampler);
        b.sub_assign(&a_s, ctx);
        b.add_assign(payload, ctx);

        a.from_ntt(ctx);
        Self { a, b }
    }

    /// Returns the phase `b + a·s` in coefficient domain.
    pub fn phase(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Poly {
        let mut a_s = self.a.mul_ntt(&sk.poly_ntt, ctx);
        let mut b = self.b.clone();
        if b.is_ntt() {
            a_s.add_assign(&b, ctx);
            a_s.from_ntt(ctx);
            a_s
        } else {
            a_s.from_ntt(ctx);
            b.add_assign(&a_s, ctx);
            b
        }
    }

    /// Decrypt to the message coefficients: ⌊(a·s + b) · t / q⌉ mod t.
    pub fn decrypt(&self, sk: &RlweSecretKey, bfv: &BfvContext) -> Vec<u64> {
        bfv.scale_down(&self.phase(sk, bfv.ntt()))
    }

    /// Homomorphic addition
    pub fn add(&self, other: &RlweCiphertext, ctx: &NttContext) -> RlweCiphertext {
        let mut out = self.clone();
        out.add_assign(other, ctx);
        out
    }

    pub fn add_assign(&mut self, other: &RlweCiphertext, ctx: &NttContext) {
        self.a.add_assign(&other.a, ctx);
        self.b.add_assign(&other.b, ctx);
    }

    /// Homomorphic subtraction
    pub fn sub(&self, other: &RlweCiphertext, ctx: &NttContext) -> RlweCiphertext {
        let mut out = self.clone();
        out.a.sub_assign(&other.a, ctx);
        out.b.sub_assign(&other.b, ctx);
        out
    }

    /// Multiplies the encrypted message by X^k (coefficient domain).
    pub fn mul_monomial(&self, k: usize, ctx: &NttContext) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_monomial(k, ctx),
            b: self.b.mul_monomial(k, ctx),
        }
    }

    /// Multiplies by an NTT-domain plaintext; `self` must be in NTT domain.
    ///
    /// p(X) · (a, b) = (p·a, p·b), decrypting to p·m mod (X^n + 1, t).
    pub fn mul_plain_ntt(&self, plaintext: &Poly, ctx: &NttContext) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_ntt_domain(plaintext, ctx),
            b: self.b.mul_ntt_domain(plaintext, ctx),
        }
    }

    /// `self += ct · plaintext`, all operands in NTT domain.
    pub fn mul_plain_acc(&mut self, ct: &RlweCiphertext, plaintext: &Poly, ctx: &NttContext) {
        self.a.mul_acc_ntt_domain(&ct.a, plaintext, ctx);
        self.b.mul_acc_ntt_domain(&ct.b, plaintext, ctx);
    }
}
