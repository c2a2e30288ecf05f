//! Query and reply wire types
//!
//! Both are a concatenation of fixed-size ciphertexts (see
//! [`RlweCiphertext::write_bytes`]) plus their count. The structs derive
//! serde so callers can embed them in their own framing; `to_bytes` uses
//! bincode.

use serde::{Deserialize, Serialize};

use crate::math::NttContext;
use crate::rlwe::RlweCiphertext;

use super::error::{PirError, Result};

fn concat(ciphertexts: &[RlweCiphertext]) -> Vec<u8> {
    let mut out = Vec::new();
    for ct in ciphertexts {
        ct.write_bytes(&mut out);
    }
    out
}

/// Client query: selector ciphertexts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PirQuery {
    pub ciphertexts: Vec<u8>,
    pub count: u32,
}

impl PirQuery {
    pub fn from_ciphertexts(ciphertexts: &[RlweCiphertext]) -> Self {
        Self {
            ciphertexts: concat(ciphertexts),
            count: ciphertexts.len() as u32,
        }
    }

    /// Parse the ciphertexts, checking count and size against `expected`
    pub fn to_ciphertexts(&self, expected: usize, ctx: &NttContext) -> Result<Vec<RlweCiphertext>> {
        if self.count as usize != expected {
            return Err(PirError::MalformedQuery(format!(
                "expected {} ciphertexts, got {}",
                expected, self.count
            )));
        }
        RlweCiphertext::many_from_bytes(&self.ciphertexts, expected, ctx).ok_or_else(|| {
            PirError::MalformedQuery(format!(
                "{} bytes do not hold {} reduced ciphertexts",
                self.ciphertexts.len(),
                expected
            ))
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Server reply: `columns · expansion_ratio^(d-1)` ciphertexts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PirReply {
    pub ciphertexts: Vec<u8>,
    pub count: u32,
}

impl PirReply {
    pub fn from_ciphertexts(ciphertexts: &[RlweCiphertext]) -> Self {
        Self {
            ciphertexts: concat(ciphertexts),
            count: ciphertexts.len() as u32,
        }
    }

    /// Parse the ciphertexts, checking count and size against `expected`
    pub fn to_ciphertexts(&self, expected: usize, ctx: &NttContext) -> Result<Vec<RlweCiphertext>> {
        if self.count as usize != expected {
            return Err(PirError::DecryptionError(format!(
                "expected {} reply ciphertexts, got {}",
                expected, self.count
            )));
        }
        RlweCiphertext::many_from_bytes(&self.ciphertexts, expected, ctx).ok_or_else(|| {
            PirError::DecryptionError(format!(
                "{} bytes do not hold {} reduced ciphertexts",
                self.ciphertexts.len(),
                expected
            ))
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Poly;
    use crate::params::MODULUS_CHAIN;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn random_ct(ctx: &NttContext, rng: &mut ChaCha20Rng) -> RlweCiphertext {
        let mut ct = RlweCiphertext::from_parts(Poly::random(ctx, rng), Poly::random(ctx, rng));
        ct.from_ntt(ctx);
        ct
    }

    #[test]
    fn test_query_parse() {
        let ctx = NttContext::with_moduli(64, &MODULUS_CHAIN[..2]);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let cts: Vec<_> = (0..3).map(|_| random_ct(&ctx, &mut rng)).collect();

        let query = PirQuery::from_ciphertexts(&cts);
        assert_eq!(query.count, 3);
        assert_eq!(query.ciphertexts.len(), 3 * RlweCiphertext::serialized_len(&ctx));
        assert_eq!(query.to_ciphertexts(3, &ctx).unwrap(), cts);

        let decoded = PirQuery::from_bytes(&query.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn test_malformed_query() {
        let ctx = NttContext::with_moduli(64, &MODULUS_CHAIN[..1]);
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let cts: Vec<_> = (0..2).map(|_| random_ct(&ctx, &mut rng)).collect();
        let mut query = PirQuery::from_ciphertexts(&cts);

        assert!(matches!(
            query.to_ciphertexts(3, &ctx),
            Err(PirError::MalformedQuery(_))
        ));

        query.ciphertexts.truncate(10);
        assert!(matches!(
            query.to_ciphertexts(2, &ctx),
            Err(PirError::MalformedQuery(_))
        ));

        let mut unreduced = PirQuery::from_ciphertexts(&cts);
        unreduced.ciphertexts[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(unreduced.to_ciphertexts(2, &ctx).is_err());
    }

    #[test]
    fn test_reply_count_mismatch() {
        let ctx = NttContext::with_moduli(64, &MODULUS_CHAIN[..1]);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let reply = PirReply::from_ciphertexts(&[random_ct(&ctx, &mut rng)]);
        assert!(reply.to_ciphertexts(1, &ctx).is_ok());
        assert!(matches!(
            reply.to_ciphertexts(2, &ctx),
            Err(PirError::DecryptionError(_))
        ));
    }
}
