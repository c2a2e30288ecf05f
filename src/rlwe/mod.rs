//! RLWE (Ring Learning With Errors) encryption module
//!
//! Implements BFV-style RLWE over R_q = Z_q[X]/(X^n + 1), q an RNS product.
//!
//! # Overview
//!
//! - Secret key s is a polynomial sampled from the error distribution
//! - Ciphertext (a, b) encrypts m ∈ Z_t[X] as b = -a·s + e + ⌊q·m/t⌉
//! - Decryption scales the phase b + a·s by t/q and rounds
//!
//! Plaintext multiplication, monomial shifts and Galois automorphisms are
//! the only homomorphic operations the PIR protocol needs.
//!
//! # Example
//!
//! ```
//! use sealpir::math::GaussianSampler;
//! use sealpir::params::MODULUS_CHAIN;
//! use sealpir::rlwe::{BfvContext, RlweCiphertext, RlweSecretKey};
//!
//! let bfv = BfvContext::new(256, &MODULUS_CHAIN[..1], 65537, 3.2);
//! let mut sampler = GaussianSampler::with_seed(3.2, 1);
//! let sk = RlweSecretKey::generate(&bfv, &mut sampler);
//!
//! let message = vec![42u64; 256];
//! let ct = RlweCiphertext::encrypt(&sk, &message, &bfv, &mut sampler);
//! assert_eq!(ct.decrypt(&sk, &bfv), message);
//! ```

mod context;
mod enc;
mod galois;
mod types;

pub use context::BfvContext;
pub use galois::{
    apply_automorphism, automorphism_ciphertext, expansion_galois_element,
    expansion_galois_elements, is_valid_galois_element,
};
pub use types::{RlweCiphertext, RlweSecretKey};
