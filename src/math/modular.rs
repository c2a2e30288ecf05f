//! Modular arithmetic operations

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = a + b;
        if sum >= q {
            sum - q
        } else {
            sum
        }
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Convert a signed integer to its representation in Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            let abs = val.unsigned_abs();
            ModQ::negate(abs % q, q)
        }
    }

    /// Convert from Z_q to signed representation in [-q/2, q/2)
    #[inline]
    pub fn to_signed(val: u64, q: u64) -> i64 {
        if val <= q / 2 {
            val as i64
        } else {
            -((q - val) as i64)
        }
    }

    /// Square-and-multiply exponentiation
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            base = Self::mul(base, base, q);
            exp >>= 1;
        }
        result
    }

    /// Inverse via extended Euclid; `None` when `gcd(a, q) != 1`.
    pub fn inv(a: u64, q: u64) -> Option<u64> {
        let mut t: i128 = 0;
        let mut new_t: i128 = 1;
        let mut r: i128 = q as i128;
        let mut new_r: i128 = (a % q) as i128;

        while new_r != 0 {
            let quotient = r / new_r;
            (t, new_t) = (new_t, t - quotient * new_t);
            (r, new_r) = (new_r, r - quotient * new_r);
        }

        if r != 1 {
            return None;
        }
        if t < 0 {
            t += q as i128;
        }
        Some(t as u64)
    }

    /// Deterministic Miller-Rabin, exact for every `u64`.
    pub fn is_prime(n: u64) -> bool {
        const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

        if n < 2 {
            return false;
        }
        for &p in WITNESSES.iter() {
            if n % p == 0 {
                return n == p;
            }
        }

        let s = (n - 1).trailing_zeros();
        let d = (n - 1) >> s;

        'witness: for &a in WITNESSES.iter() {
            let mut x = Self::pow(a, d, n);
            if x == 1 || x == n - 1 {
                continue;
            }
            for _ in 1..s {
                x = Self::mul(x, x, n);
                if x == n - 1 {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    /// Smallest prime strictly greater than `n`.
    pub fn next_prime(n: u64) -> Option<u64> {
        let mut candidate = n.checked_add(1)?;
        while !Self::is_prime(candidate) {
            candidate = candidate.checked_add(1)?;
        }
        Some(candidate)
    }
}
