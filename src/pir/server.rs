//! PIR server
//!
//! All methods take `&self`; share the server through an `Arc`. One lock
//! guards the database and its dirty set (mutations write, evaluation
//! reads), another guards the client key registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info};

use crate::ks::GaloisKeys;
use crate::params::PirParams;
use crate::rlwe::BfvContext;

use super::encode_db::EncodedDatabase;
use super::error::{PirError, Result};
use super::expand::expand_query;
use super::respond::respond;
use super::wire::{PirQuery, PirReply};

pub struct PirServer {
    params: PirParams,
    bfv: BfvContext,
    database: RwLock<EncodedDatabase>,
    galois_keys: RwLock<HashMap<u32, Arc<GaloisKeys>>>,
}

impl PirServer {
    /// Server with an empty database
    ///
    /// Fails if `params` does not match its own derivation.
    pub fn new(params: PirParams) -> Result<Self> {
        params.validate()?;
        let bfv = params.bfv_context();
        let database = EncodedDatabase::new(&params, bfv.ntt());
        Ok(Self {
            params,
            bfv,
            database: RwLock::new(database),
            galois_keys: RwLock::new(HashMap::new()),
        })
    }

    pub fn params(&self) -> &PirParams {
        &self.params
    }

    /// Register a client's serialized Galois keys, replacing any earlier set
    pub fn set_galois_key(&self, client_id: u32, key_blob: &[u8]) -> Result<()> {
        let keys =
            GaloisKeys::from_bytes(key_blob).map_err(|e| PirError::InvalidKey(e.to_string()))?;
        self.check_keys(&keys)?;

        let mut registry = self
            .galois_keys
            .write()
            .map_err(|_| PirError::LockPoisoned)?;
        let replaced = registry.insert(client_id, Arc::new(keys)).is_some();

        info!(client_id, replaced, "registered Galois keys");
        Ok(())
    }

    fn check_keys(&self, keys: &GaloisKeys) -> Result<()> {
        let gadget = self.params.gadget();
        if keys.gadget != gadget {
            return Err(PirError::InvalidKey(format!(
                "gadget base 2^{} does not match 2^{}",
                keys.gadget.base_bits, gadget.base_bits
            )));
        }
        for g in self.params.galois_elements() {
            let matrix = keys
                .get(g)
                .ok_or_else(|| PirError::InvalidKey(format!("missing Galois element {}", g)))?;
            if !matrix.is_well_formed(&gadget, self.bfv.ntt()) {
                return Err(PirError::InvalidKey(format!(
                    "malformed key for Galois element {}",
                    g
                )));
            }
        }
        Ok(())
    }

    /// Replace the database; it must be preprocessed before evaluation
    pub fn load_database(&self, raw: &[u8], element_count: usize, element_size: usize) -> Result<()> {
        let mut db = self.database.write().map_err(|_| PirError::LockPoisoned)?;
        db.load(raw, element_count, element_size, self.bfv.ntt())
    }

    /// Re-encode the plaintext holding element `index` from `raw`
    pub fn update_element(
        &self,
        raw: &[u8],
        element_count: usize,
        element_size: usize,
        index: usize,
    ) -> Result<()> {
        let mut db = self.database.write().map_err(|_| PirError::LockPoisoned)?;
        db.update(raw, element_count, element_size, index, self.bfv.ntt())
    }

    /// Bring every changed plaintext into NTT form; returns rows converted
    pub fn preprocess(&self) -> Result<usize> {
        let mut db = self.database.write().map_err(|_| PirError::LockPoisoned)?;
        Ok(db.preprocess(self.bfv.ntt()))
    }

    /// Load `raw` with the parameter shape, then preprocess
    pub fn setup(&self, raw: &[u8]) -> Result<()> {
        let mut db = self.database.write().map_err(|_| PirError::LockPoisoned)?;
        db.load(
            raw,
            self.params.element_count,
            self.params.element_size,
            self.bfv.ntt(),
        )?;
        db.preprocess(self.bfv.ntt());
        Ok(())
    }

    /// Answer `query` with the Galois keys registered for `client_id`
    pub fn evaluate(&self, query: &PirQuery, client_id: u32) -> Result<PirReply> {
        let keys = self
            .galois_keys
            .read()
            .map_err(|_| PirError::LockPoisoned)?
            .get(&client_id)
            .cloned()
            .ok_or(PirError::MissingClientKey(client_id))?;

        let ctx = self.bfv.ntt();
        let selectors = query.to_ciphertexts(self.params.query_count(), ctx)?;

        let db = self.database.read().map_err(|_| PirError::LockPoisoned)?;
        if db.is_stale() {
            return Err(PirError::StalePreprocessedState);
        }

        let start = Instant::now();
        let expanded = expand_query(&self.params, &selectors, &keys, ctx)?;
        let expand_time = start.elapsed();

        let start = Instant::now();
        let reply = respond(&self.params, &db, expanded, ctx);
        debug!(
            client_id,
            ?expand_time,
            contract_time = ?start.elapsed(),
            ciphertexts = reply.len(),
            "evaluated query"
        );

        Ok(PirReply::from_ciphertexts(&reply))
    }
}
