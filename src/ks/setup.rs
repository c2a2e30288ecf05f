//! Key-switching matrix and Galois key generation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::rlwe::{apply_automorphism, RlweCiphertext, RlweSecretKey};

use super::gadget::GadgetVector;

/// Key-switching matrix from a source key s to the secret key s'
///
/// One RLWE ciphertext per gadget entry g_i, stored in NTT domain:
/// ```text
/// K[i] = RLWE_{s'}(s·g_i) = (a_i, -a_i·s' + e_i + s·g_i)
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    /// ℓ RLWE ciphertexts, NTT domain
    pub rows: Vec<RlweCiphertext>,
}

impl KeySwitchingMatrix {
    /// Get the number of rows (same as gadget length)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the matrix is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shape check: row count, NTT tagging and reduced residues.
    pub fn is_well_formed(&self, gadget: &GadgetVector, ctx: &NttContext) -> bool {
        let n = ctx.dimension();
        let well_formed_poly = |p: &Poly| {
            p.is_ntt()
                && p.coeffs().len() == n * ctx.crt_count()
                && p.coeffs()
                    .chunks_exact(n)
                    .zip(ctx.moduli())
                    .all(|(row, &q)| row.iter().all(|&c| c < q))
        };
        self.len() == gadget.len()
            && self
                .rows
                .iter()
                .all(|row| well_formed_poly(&row.a) && well_formed_poly(&row.b))
    }
}

/// Generate a key-switching matrix from the polynomial `from` to secret key `to_key`
///
/// `from` is a coefficient-domain secret (typically τ_g(s)).
pub fn generate_ks_matrix(
    from: &Poly,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let rows = gadget
        .weights(ctx)
        .iter()
        .map(|w| {
            let mut payload = from.clone();
            payload.mul_rns_scalar(w, ctx);
            let mut row = RlweCiphertext::encrypt_payload(to_key, &payload, ctx, sampler);
            row.to_ntt(ctx);
            row
        })
        .collect();
    KeySwitchingMatrix { rows }
}

/// Generate a key-switching matrix for automorphism
///
/// For Galois automorphism τ_g, creates a matrix from τ_g(s) to s.
pub fn generate_automorphism_ks_matrix(
    sk: &RlweSecretKey,
    galois_element: usize,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let auto_s = apply_automorphism(&sk.poly, galois_element, ctx);
    generate_ks_matrix(&auto_s, sk, gadget, sampler, ctx)
}

/// Automorphism keys for a set of Galois elements, all under one gadget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKeys {
    pub gadget: GadgetVector,
    pub keys: BTreeMap<usize, KeySwitchingMatrix>,
}

impl GaloisKeys {
    pub fn generate(
        sk: &RlweSecretKey,
        galois_elements: &[usize],
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let keys = galois_elements
            .iter()
            .map(|&g| {
                (
                    g,
                    generate_automorphism_ks_matrix(sk, g, gadget, sampler, ctx),
                )
            })
            .collect();
        Self {
            gadget: gadget.clone(),
            keys,
        }
    }

    pub fn get(&self, galois_element: usize) -> Option<&KeySwitchingMatrix> {
        self.keys.get(&galois_element)
    }

    pub fn galois_elements(&self) -> impl Iterator<Item = usize> + '_ {
        self.keys.keys().copied()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
