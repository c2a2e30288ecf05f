//! SealPIR: Computational PIR with query expansion and recursion
//!
//! A client fetches one element of a server-held database without revealing
//! which one. The protocol runs over BFV-style RLWE encryption:
//!
//! - Database elements are packed into plaintext polynomials arranged as a
//!   d-dimensional hypercube
//! - The client sends compressed selectors that the server obliviously
//!   expands with Galois automorphisms
//! - The server contracts the hypercube dimension by dimension, decomposing
//!   ciphertexts into plaintexts between levels
//!
//! Key components:
//! - [`params`]: parameter derivation and noise budgeting
//! - [`math`], [`rlwe`], [`ks`]: the RNS ring, BFV encryption and key switching
//! - [`pir`]: encoding, query, expansion, contraction and decoding

pub mod ks;
pub mod math;
pub mod params;
pub mod pir;
pub mod rlwe;

pub use pir::{PirClient, PirError, PirQuery, PirReply, PirServer};

pub use params::{PirParams, PirParamsBuilder, QueryLayout};
