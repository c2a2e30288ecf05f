//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_q = Z_q[X]/(X^n + 1) with q given in RNS form.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::math::{NttContext, Poly};

/// RLWE secret key: polynomial with small coefficients.
///
/// Both domains are kept: the coefficient form feeds automorphisms during
/// key generation, the NTT form feeds every ring product.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RlweSecretKey {
    /// Secret polynomial, coefficient domain.
    pub poly: Poly,
    /// The same polynomial in NTT domain.
    pub poly_ntt: Poly,
}

/// RLWE ciphertext: (a, b) ∈ R_q × R_q where b = -a·s + e + ⌊q·m/t⌉.
///
/// To decrypt, compute `b + a·s = e + ⌊q·m/t⌉`, then scale by t/q and round.
/// Both parts always share a domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Random polynomial in R_q.
    pub a: Poly,
    /// Masked message polynomial.
    pub b: Poly,
}

impl RlweSecretKey {
    /// Wraps a coefficient-domain secret polynomial.
    pub fn from_poly(poly: Poly, ctx: &NttContext) -> Self {
        let mut poly_ntt = poly.clone();
        poly_ntt.to_ntt(ctx);
        Self { poly, poly_ntt }
    }
}

impl RlweCiphertext {
    /// Creates a ciphertext from its components.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(a.is_ntt(), b.is_ntt(), "domain mismatch");
        Self { a, b }
    }

    /// Encryption of zero with zero error (identity for addition), NTT domain.
    pub fn zero_ntt(ctx: &NttContext) -> Self {
        let mut a = Poly::zero(ctx);
        a.to_ntt(ctx);
        Self { b: a.clone(), a }
    }

    pub fn is_ntt(&self) -> bool {
        self.a.is_ntt()
    }

    pub fn to_ntt(&mut self, ctx: &NttContext) {
        self.a.to_ntt(ctx);
        self.b.to_ntt(ctx);
    }

    pub fn from_ntt(&mut self, ctx: &NttContext) {
        self.a.from_ntt(ctx);
        self.b.from_ntt(ctx);
    }

    /// Size in bytes of one serialized ciphertext.
    pub fn serialized_len(ctx: &NttContext) -> usize {
        2 * ctx.dimension() * ctx.crt_count() * 8
    }

    /// Fixed-size little-endian encoding: every residue of `a`, then of `b`.
    ///
    /// The ciphertext must be in coefficient domain.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        debug_assert!(!self.is_ntt(), "serialize in coefficient domain");
        let start = out.len();
        let words = self.a.coeffs().len() + self.b.coeffs().len();
        out.resize(start + words * 8, 0);

        let (a_bytes, b_bytes) = out[start..].split_at_mut(self.a.coeffs().len() * 8);
        LittleEndian::write_u64_into(self.a.coeffs(), a_bytes);
        LittleEndian::write_u64_into(self.b.coeffs(), b_bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(&mut out);
        out
    }

    /// Parses one ciphertext written by [`Self::write_bytes`].
    ///
    /// Returns `None` if the length is wrong or a residue is not reduced.
    pub fn from_bytes(bytes: &[u8], ctx: &NttContext) -> Option<Self> {
        if bytes.len() != Self::serialized_len(ctx) {
            return None;
        }
        let half = bytes.len() / 2;
        let a = Self::read_poly(&bytes[..half], ctx)?;
        let b = Self::read_poly(&bytes[half..], ctx)?;
        Some(Self { a, b })
    }

    /// Splits a concatenation of `count` ciphertexts.
    pub fn many_from_bytes(bytes: &[u8], count: usize, ctx: &NttContext) -> Option<Vec<Self>> {
        let len = Self::serialized_len(ctx);
        if bytes.len() != count.checked_mul(len)? {
            return None;
        }
        bytes
            .chunks_exact(len)
            .map(|chunk| Self::from_bytes(chunk, ctx))
            .collect()
    }

    fn read_poly(bytes: &[u8], ctx: &NttContext) -> Option<Poly> {
        let n = ctx.dimension();
        let mut coeffs = vec![0u64; n * ctx.crt_count()];
        LittleEndian::read_u64_into(bytes, &mut coeffs);

        let reduced = coeffs
            .chunks_exact(n)
            .zip(ctx.moduli())
            .all(|(row, &q)| row.iter().all(|&c| c < q));
        if !reduced {
            return None;
        }
        Some(Poly::from_residues(coeffs, false))
    }
}
