//! Key-switching module
//!
//! This module implements key-switching for RLWE ciphertexts, which transforms
//! a ciphertext valid under secret key s to one valid under secret key s'.
//!
//! Query expansion uses it after every Galois automorphism: τ_g maps a
//! ciphertext under s to one under τ_g(s), and the Galois key for g switches
//! it back.
//!
//! # Key-Switching Matrix
//!
//! A key-switching matrix K from s to s' consists of ℓ RLWE ciphertexts,
//! one per entry of the RNS gadget vector:
//! ```text
//! K = [RLWE_{s'}(s·g_0), RLWE_{s'}(s·g_1), ..., RLWE_{s'}(s·g_{ℓ-1})]
//! ```
//!
//! # Algorithm
//!
//! To switch (a, b) from key s to key s':
//! 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
//! 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]

mod gadget;
mod setup;
mod switch;

pub use gadget::GadgetVector;
pub use setup::{
    generate_automorphism_ks_matrix, generate_ks_matrix, GaloisKeys, KeySwitchingMatrix,
};
pub use switch::{apply_galois, key_switch};
