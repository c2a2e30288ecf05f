//! Mathematical primitives for the PIR protocol.
//!
//! - **Modular arithmetic** over word-sized primes, plus primality testing
//!   used to pick the plaintext modulus
//! - **Number-Theoretic Transform (NTT)** over a chain of RNS primes
//! - **CRT** reconstruction and BFV scale-and-round
//! - **Polynomial operations** over R_q = Z_q[X]/(X^n + 1)
//! - **Discrete Gaussian sampling** for error terms
//!
//! # Example
//!
//! ```
//! use sealpir::math::{NttContext, Poly};
//! use sealpir::params::MODULUS_CHAIN;
//!
//! let ctx = NttContext::with_moduli(256, &MODULUS_CHAIN[..1]);
//! let mut poly = Poly::from_small(&[1, 2, 3], &ctx);
//! poly.to_ntt(&ctx);
//! poly.from_ntt(&ctx);
//! assert_eq!(&poly.coeffs()[..3], &[1, 2, 3]);
//! ```

pub mod crt;
pub mod gaussian;
pub mod modular;
pub mod ntt;
pub mod poly;

pub use crt::CrtBasis;
pub use gaussian::GaussianSampler;
pub use modular::ModQ;
pub use ntt::NttContext;
pub use poly::Poly;
