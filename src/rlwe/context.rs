//! BFV plaintext scaling on top of the RNS ring.
//!
//! A message m ∈ Z_t[X] is embedded as ⌊q·m/t⌉. With q = Δ·t + r this is
//! `Δ·m + ⌊r·m/t⌉`, computed prime by prime without leaving RNS since
//! `Δ ≡ -r·t^{-1} (mod q_i)`. Using the exact quotient q/t (rather than Δ
//! alone) keeps plaintext multiplication free of the `r·m` error term.

use crate::math::{ModQ, NttContext, Poly};

/// Ring plus plaintext modulus: everything needed to encrypt, decrypt and
/// compute on ciphertexts of one parameter set.
#[derive(Clone, Debug)]
pub struct BfvContext {
    ntt: NttContext,
    /// Plaintext modulus t.
    t: u64,
    /// ⌊q/t⌋ mod q_i.
    delta: Vec<u64>,
    /// q mod t.
    q_mod_t: u64,
    /// Error standard deviation.
    sigma: f64,
}

impl BfvContext {
    /// # Panics
    ///
    /// Panics if t is not invertible modulo some prime of the chain.
    pub fn new(n: usize, moduli: &[u64], t: u64, sigma: f64) -> Self {
        let ntt = NttContext::with_moduli(n, moduli);
        let q_mod_t = ntt.crt().modulus_mod(t);

        let delta = moduli
            .iter()
            .map(|&qi| {
                let t_inv = match ModQ::inv(t % qi, qi) {
                    Some(inv) => inv,
                    None => panic!("plaintext modulus must be invertible mod {}", qi),
                };
                ModQ::mul(ModQ::negate(q_mod_t % qi, qi), t_inv, qi)
            })
            .collect();

        Self {
            ntt,
            t,
            delta,
            q_mod_t,
            sigma,
        }
    }

    pub fn ntt(&self) -> &NttContext {
        &self.ntt
    }

    pub fn dimension(&self) -> usize {
        self.ntt.dimension()
    }

    pub fn plain_modulus(&self) -> u64 {
        self.t
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Embeds `message` (coefficients in [0, t)) as ⌊q·m/t⌉, coefficient domain.
    pub fn scale_up(&self, message: &[u64]) -> Poly {
        let n = self.dimension();
        let t = self.t as u128;
        let rounding: Vec<u64> = message
            .iter()
            .map(|&m| ((self.q_mod_t as u128 * m as u128 + t / 2) / t) as u64)
            .collect();

        let mut poly = Poly::zero(&self.ntt);
        for (idx, (row, &q)) in poly
            .coeffs_mut()
            .chunks_exact_mut(n)
            .zip(self.ntt.moduli())
            .enumerate()
        {
            let delta = self.delta[idx];
            for ((c, &m), &r) in row.iter_mut().zip(message).zip(&rounding) {
                let scaled = ModQ::mul(delta, m % q, q);
                *c = ModQ::add(scaled, r % q, q);
            }
        }
        poly
    }

    /// Recovers `⌊t·x/q⌉ mod t` per coefficient of a coefficient-domain phase.
    pub fn scale_down(&self, phase: &Poly) -> Vec<u64> {
        debug_assert!(!phase.is_ntt(), "phase must be in coefficient domain");
        let n = self.dimension();
        let k = self.ntt.crt_count();
        let coeffs = phase.coeffs();
        let crt = self.ntt.crt();

        let mut residues = vec![0u64; k];
        (0..n)
            .map(|j| {
                for (i, r) in residues.iter_mut().enumerate() {
                    *r = coeffs[i * n + j];
                }
                crt.scale_and_round(&residues, self.t)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MODULUS_CHAIN;

    #[test]
    fn test_scale_round_trip_without_noise() {
        let t = 1048583;
        for k in 1..=3 {
            let bfv = BfvContext::new(64, &MODULUS_CHAIN[..k], t, 3.2);
            let message: Vec<u64> = (0..64u64).map(|i| (i * 7919 + 3) % t).collect();
            let scaled = bfv.scale_up(&message);
            assert_eq!(bfv.scale_down(&scaled), message);
        }
    }

    #[test]
    fn test_scaled_sum_wraps_mod_t() {
        let t = 4099;
        let bfv = BfvContext::new(32, &MODULUS_CHAIN[..1], t, 3.2);
        let mut a = bfv.scale_up(&[t - 1, 5]);
        let b = bfv.scale_up(&[2, 7]);
        a.add_assign(&b, bfv.ntt());
        let decoded = bfv.scale_down(&a);
        assert_eq!(&decoded[..2], &[1, 12]);
    }
}
