//! PIR client
//!
//! Owns the secret key and the serialized Galois keys generated from it.
//! Every method takes `&self`; query randomness is supplied per call.

use rand::RngCore;

use crate::ks::GaloisKeys;
use crate::math::GaussianSampler;
use crate::params::PirParams;
use crate::rlwe::{BfvContext, RlweSecretKey};

use super::error::{PirError, Result};
use super::extract;
use super::query;
use super::wire::{PirQuery, PirReply};

pub struct PirClient {
    params: PirParams,
    bfv: BfvContext,
    secret_key: RlweSecretKey,
    galois_key: Vec<u8>,
}

impl PirClient {
    /// Fresh keys from the thread RNG
    pub fn new(params: PirParams) -> Result<Self> {
        Self::from_rng(params, &mut rand::thread_rng())
    }

    /// Keys derived from `rng`
    ///
    /// Generates the secret key and Galois keys for every expansion round
    /// the parameters need.
    pub fn from_rng<R: RngCore + ?Sized>(params: PirParams, rng: &mut R) -> Result<Self> {
        params.validate()?;
        let bfv = params.bfv_context();
        let mut sampler = GaussianSampler::from_rng(params.sigma, rng);
        let secret_key = RlweSecretKey::generate(&bfv, &mut sampler);

        let keys = GaloisKeys::generate(
            &secret_key,
            &params.galois_elements(),
            &params.gadget(),
            &mut sampler,
            bfv.ntt(),
        );
        let galois_key = keys.to_bytes()?;

        Ok(Self {
            params,
            bfv,
            secret_key,
            galois_key,
        })
    }

    pub fn params(&self) -> &PirParams {
        &self.params
    }

    /// Serialized Galois keys to register with the server
    pub fn galois_key(&self) -> &[u8] {
        &self.galois_key
    }

    /// Hypercube coordinate of the plaintext holding element `index`
    pub fn coordinate(&self, index: usize) -> Result<Vec<usize>> {
        self.check_index(index)?;
        Ok(query::coordinate(
            self.params.plaintext_index(index),
            &self.params.extents,
        ))
    }

    pub fn plaintext_index(&self, index: usize) -> usize {
        self.params.plaintext_index(index)
    }

    pub fn plaintext_offset(&self, index: usize) -> usize {
        self.params.plaintext_offset(index)
    }

    pub fn generate_query(&self, index: usize) -> Result<PirQuery> {
        self.generate_query_with_rng(index, &mut rand::thread_rng())
    }

    pub fn generate_query_with_rng<R: RngCore + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<PirQuery> {
        let mut sampler = GaussianSampler::from_rng(self.params.sigma, rng);
        query::generate_query(&self.params, index, &self.secret_key, &self.bfv, &mut sampler)
    }

    /// Every column's plaintext bytes, concatenated
    pub fn decode_reply(&self, reply: &PirReply) -> Result<Vec<u8>> {
        extract::decode_reply(&self.params, reply, &self.secret_key, &self.bfv)
    }

    /// Exactly `element_size` bytes of element `index`
    pub fn decode_element(&self, index: usize, reply: &PirReply) -> Result<Vec<u8>> {
        extract::decode_element(&self.params, index, reply, &self.secret_key, &self.bfv)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.params.element_count {
            return Err(PirError::IndexOutOfRange {
                index,
                element_count: self.params.element_count,
            });
        }
        Ok(())
    }
}
