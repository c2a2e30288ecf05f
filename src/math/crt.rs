//! CRT (Chinese Remainder Theorem) helpers.
//!
//! The ciphertext modulus is q = q_0 · q_1 · ... · q_{k-1}. Residues are
//! combined with the usual basis
//!
//! ```text
//! x = Σ_i [x_i · q̂_i^{-1}]_{q_i} · q̂_i  (mod q),   q̂_i = q / q_i
//! ```
//!
//! which is also the gadget used by key switching: the digit source for
//! prime i is `[x_i · q̂_i^{-1}]_{q_i}` and its weight is `q̂_i`.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use super::modular::ModQ;

/// Precomputed CRT constants for a chain of pairwise coprime moduli.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrtBasis {
    moduli: Vec<u64>,
    /// q as a big integer.
    modulus: BigUint,
    /// floor(q / 2), used for rounding.
    half_modulus: BigUint,
    /// q̂_i^{-1} mod q_i.
    q_hat_inv: Vec<u64>,
    /// q̂_i mod q_j, indexed `[i][j]`.
    q_hat_mod: Vec<Vec<u64>>,
    /// q̂_i · (q̂_i^{-1} mod q_i) as big integers.
    garner: Vec<BigUint>,
}

impl CrtBasis {
    /// # Panics
    ///
    /// Panics if the moduli are not pairwise coprime.
    pub fn new(moduli: &[u64]) -> Self {
        let modulus = moduli
            .iter()
            .fold(BigUint::from(1u64), |acc, &q| acc * q);
        let half_modulus = &modulus >> 1usize;

        let mut q_hat_inv = Vec::with_capacity(moduli.len());
        let mut q_hat_mod = Vec::with_capacity(moduli.len());
        let mut garner = Vec::with_capacity(moduli.len());

        for (i, &qi) in moduli.iter().enumerate() {
            let row: Vec<u64> = moduli
                .iter()
                .map(|&qj| {
                    moduli
                        .iter()
                        .enumerate()
                        .filter(|&(k, _)| k != i)
                        .fold(1 % qj, |acc, (_, &qk)| ModQ::mul(acc, qk % qj, qj))
                })
                .collect();
            let inv = match ModQ::inv(row[i], qi) {
                Some(inv) => inv,
                None => panic!("CRT moduli must be pairwise coprime"),
            };
            garner.push((&modulus / qi) * inv);
            q_hat_inv.push(inv);
            q_hat_mod.push(row);
        }

        Self {
            moduli: moduli.to_vec(),
            modulus,
            half_modulus,
            q_hat_inv,
            q_hat_mod,
            garner,
        }
    }

    /// The composite modulus q.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// q̂_i^{-1} mod q_i.
    pub fn q_hat_inv(&self, i: usize) -> u64 {
        self.q_hat_inv[i]
    }

    /// q̂_i mod q_j.
    pub fn q_hat_mod(&self, i: usize, j: usize) -> u64 {
        self.q_hat_mod[i][j]
    }

    /// q mod m for a word-sized m.
    pub fn modulus_mod(&self, m: u64) -> u64 {
        self.moduli
            .iter()
            .fold(1 % m, |acc, &q| ModQ::mul(acc, q % m, m))
    }

    /// Reconstructs the integer in [0, q) with the given residues.
    pub fn compose(&self, residues: &[u64]) -> BigUint {
        let sum = residues
            .iter()
            .zip(&self.garner)
            .fold(BigUint::zero(), |acc, (&r, g)| acc + g * r);
        sum % &self.modulus
    }

    /// Splits an integer into its residues.
    pub fn decompose(&self, value: &BigUint) -> Vec<u64> {
        self.moduli
            .iter()
            .map(|&q| (value % q).to_u64().unwrap_or_default())
            .collect()
    }

    /// Computes `round(t · x / q) mod t` for the integer x with the given residues.
    ///
    /// This is the BFV decryption scaling step.
    pub fn scale_and_round(&self, residues: &[u64], t: u64) -> u64 {
        let x = self.compose(residues);
        let scaled = (x * t + &self.half_modulus) / &self.modulus;
        (scaled % t).to_u64().unwrap_or_default()
    }
}
