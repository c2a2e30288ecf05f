//! SealPIR Protocol Implementation
//!
//! # Protocol Overview
//!
//! 1. **Setup**: Derive [`PirParams`](crate::params::PirParams); the server
//!    encodes the database into a d-dimensional hypercube of plaintexts and
//!    preprocesses them into NTT form
//! 2. **Keys**: The client generates a secret key and Galois keys for the
//!    expansion rounds, and registers the keys with the server
//! 3. **Query**: The client encrypts one selector per dimension (or one
//!    packed selector) marking the coordinate of the wanted plaintext
//! 4. **Respond**: The server expands each selector into a one-hot vector of
//!    ciphertexts and contracts the hypercube one dimension at a time,
//!    decomposing intermediate ciphertexts into plaintexts between levels
//! 5. **Extract**: The client decrypts and recomposes level by level, then
//!    unpacks the element's bytes
//!
//! # Example
//!
//! ```no_run
//! use sealpir::params::PirParams;
//! use sealpir::pir::{PirClient, PirServer};
//!
//! # fn main() -> sealpir::pir::Result<()> {
//! let params = PirParams::derive(100, 288, 4096, 20, 2)?;
//! let database = vec![7u8; 100 * 288];
//!
//! let server = PirServer::new(params.clone())?;
//! server.setup(&database)?;
//!
//! let client = PirClient::new(params)?;
//! server.set_galois_key(0, client.galois_key())?;
//!
//! let query = client.generate_query(37)?;
//! let reply = server.evaluate(&query, 0)?;
//! let element = client.decode_element(37, &reply)?;
//! assert_eq!(element, vec![7u8; 288]);
//! # Ok(())
//! # }
//! ```

mod client;
mod decompose;
pub mod encode_db;
pub mod error;
mod expand;
mod extract;
mod query;
mod respond;
mod server;
mod wire;

pub use client::PirClient;
pub use decompose::{chunks_per_prime, compose_ciphertext, decompose_ciphertext};
pub use encode_db::{bytes_to_coeffs, coeffs_to_bytes, EncodedDatabase};
pub use error::{PirError, Result};
pub use expand::{expand_query, expand_selector};
pub use extract::{decode_element, decode_reply};
pub use query::{coordinate, generate_query, recompose, selector_messages};
pub use respond::{respond, respond_column};
pub use server::PirServer;
pub use wire::{PirQuery, PirReply};
