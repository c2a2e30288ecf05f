//! Parameter derivation for SealPIR
//!
//! Everything the client and server must agree on is a pure function of five
//! inputs: element count, element size, ring degree N, plaintext bit width and
//! recursion dimension d. [`PirParams::derive`] computes the database layout
//! and the HE setup, and rejects combinations whose analytic noise estimate
//! does not fit the decryption budget.

use serde::{Deserialize, Serialize};

use crate::ks::GadgetVector;
use crate::math::gaussian::DEFAULT_SIGMA;
use crate::math::ModQ;
use crate::pir::error::{invalid_params, Result};
use crate::rlwe::{expansion_galois_elements, BfvContext};

/// 60-bit NTT-friendly primes, all ≡ 1 (mod 2^15)
///
/// Supports negacyclic NTTs up to N = 16384. A ring of degree N uses a prefix
/// of this chain, see [`moduli_for_degree`].
pub const MODULUS_CHAIN: [u64; 4] = [
    1152921504606748673,
    1152921504606683137,
    1152921504606584833,
    1152921504605962241,
];

/// Smallest supported ring degree
pub const MIN_POLY_DEGREE: usize = 2048;

/// Largest supported ring degree
pub const MAX_POLY_DEGREE: usize = 16384;

/// Largest supported recursion dimension
pub const MAX_DIMENSION: u32 = 8;

/// Largest plaintext bit width
pub const MAX_PLAIN_BITS: u32 = 32;

/// Largest serialized reply the deriver accepts, in bytes (1 GiB)
///
/// The server holds the whole reply in memory while contracting, so
/// parameter sets above this are rejected instead of exhausting memory.
pub const MAX_REPLY_BYTES: usize = 1 << 30;

/// Largest gadget base tried by the deriver, as log2
pub const MAX_GADGET_BITS: u32 = 20;

/// Number of standard deviations the noise must stay within.
const NOISE_TAIL: f64 = 8.0;

/// How the client lays out its selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryLayout {
    /// One selector per dimension, ⌈extent/N⌉ ciphertexts each
    #[default]
    PerDimension,

    /// All selectors in a single ciphertext at offsets Σ previous extents
    ///
    /// Requires Σ extents ≤ N. Expansion runs once over the whole vector.
    Packed,
}

/// Primes of [`MODULUS_CHAIN`] used for ring degree `n`
pub fn moduli_for_degree(n: usize) -> &'static [u64] {
    let count = match n {
        0..=2048 => 1,
        2049..=4096 => 2,
        4097..=8192 => 3,
        _ => 4,
    };
    &MODULUS_CHAIN[..count]
}

/// Number of doubling rounds to expand a selector covering `m` slots: ⌈log2 m⌉
pub fn expansion_rounds(m: usize) -> u32 {
    m.max(1).next_power_of_two().trailing_zeros()
}

/// Derived PIR parameters
///
/// Construct through [`PirParams::derive`] or [`PirParamsBuilder`]. Client and
/// server must hold identical values; [`PirParams::validate`] checks that a
/// deserialized copy still matches its own derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirParams {
    /// Number of database elements
    pub element_count: usize,

    /// Size of every element in bytes
    pub element_size: usize,

    /// Ring degree N (power of two)
    pub poly_degree: usize,

    /// Bits of data carried per plaintext coefficient
    pub plain_bits: u32,

    /// Recursion dimension d
    pub dimension: u32,

    /// ⌈element_size·8 / plain_bits⌉
    pub coefficients_per_element: usize,

    /// Elements sharing one plaintext row
    pub elements_per_plaintext: usize,

    /// Plaintexts per element; 1 unless elements exceed one plaintext
    pub columns: usize,

    /// Plaintext rows before padding to the hypercube
    pub plaintext_count: usize,

    /// Hypercube shape, dimension 0 most significant
    pub extents: Vec<usize>,

    /// Selector layout
    pub layout: QueryLayout,

    /// RNS primes of the ciphertext modulus q
    pub moduli: Vec<u64>,

    /// Plaintext modulus t, the smallest prime above 2^plain_bits
    pub plain_modulus: u64,

    /// log2 of the key-switching gadget base
    pub gadget_base_bits: u32,

    /// Error distribution standard deviation
    pub sigma: f64,
}

impl PirParams {
    /// Derive parameters with the default layout and error width
    pub fn derive(
        element_count: usize,
        element_size: usize,
        poly_degree: usize,
        plain_bits: u32,
        dimension: u32,
    ) -> Result<Self> {
        PirParamsBuilder::new(element_count, element_size)
            .poly_degree(poly_degree)
            .plain_bits(plain_bits)
            .dimension(dimension)
            .build()
    }

    /// Builder seeded with this parameter set's inputs
    pub fn to_builder(&self) -> PirParamsBuilder {
        PirParamsBuilder {
            element_count: self.element_count,
            element_size: self.element_size,
            poly_degree: self.poly_degree,
            plain_bits: self.plain_bits,
            dimension: self.dimension,
            layout: self.layout,
            sigma: self.sigma,
        }
    }

    /// Re-derive from the inputs and check every derived field matches
    pub fn validate(&self) -> Result<()> {
        let derived = self.to_builder().build()?;
        if &derived != self {
            return Err(invalid_params!(
                "derived fields do not match the inputs they were derived from"
            ));
        }
        Ok(())
    }

    /// Plaintext rows in the padded hypercube (Π extents)
    pub fn hypercube_size(&self) -> usize {
        self.extents.iter().product()
    }

    /// Bytes carried by one plaintext: ⌊N·plain_bits/8⌋
    pub fn bytes_per_plaintext(&self) -> usize {
        bytes_per_plaintext(self.poly_degree, self.plain_bits)
    }

    /// Plaintexts produced by decomposing one ciphertext
    pub fn expansion_ratio(&self) -> usize {
        expansion_ratio(&self.moduli, self.plain_bits)
    }

    /// Ciphertexts in a reply: columns · expansion_ratio^(d-1)
    pub fn reply_count(&self) -> usize {
        self.columns * self.expansion_ratio().pow(self.dimension - 1)
    }

    /// Ciphertexts covering dimension `dim` in the per-dimension layout
    pub fn dimension_query_count(&self, dim: usize) -> usize {
        self.extents[dim].div_ceil(self.poly_degree)
    }

    /// Ciphertexts in a query
    pub fn query_count(&self) -> usize {
        match self.layout {
            QueryLayout::PerDimension => (0..self.extents.len())
                .map(|dim| self.dimension_query_count(dim))
                .sum(),
            QueryLayout::Packed => 1,
        }
    }

    /// Expansion rounds the server runs for the most demanding selector
    pub fn max_expansion_rounds(&self) -> u32 {
        max_expansion_rounds(&self.extents, self.layout, self.poly_degree)
    }

    /// Galois elements the client must provide keys for
    pub fn galois_elements(&self) -> Vec<usize> {
        expansion_galois_elements(self.poly_degree, self.max_expansion_rounds())
    }

    /// Row index of the plaintext holding element `index`
    pub fn plaintext_index(&self, index: usize) -> usize {
        index / self.elements_per_plaintext
    }

    /// Position of element `index` inside its plaintext row
    pub fn plaintext_offset(&self, index: usize) -> usize {
        index % self.elements_per_plaintext
    }

    /// Serialized size of one ciphertext in bytes
    pub fn ciphertext_size(&self) -> usize {
        ciphertext_size(self.poly_degree, self.moduli.len())
    }

    /// Serialized size of a full reply in bytes
    pub fn reply_size(&self) -> usize {
        self.reply_count() * self.ciphertext_size()
    }

    /// BFV context for these parameters
    pub fn bfv_context(&self) -> BfvContext {
        BfvContext::new(
            self.poly_degree,
            &self.moduli,
            self.plain_modulus,
            self.sigma,
        )
    }

    /// Key-switching gadget for these parameters
    pub fn gadget(&self) -> GadgetVector {
        GadgetVector::new(self.gadget_base_bits, &self.moduli)
    }

    /// Remaining noise margin in bits: log2(q/2t) − log2(8·σ_est)
    pub fn noise_margin_bits(&self) -> f64 {
        let gadget = self.gadget();
        let std = estimated_noise_std(
            &self.extents,
            self.layout,
            self.poly_degree,
            self.plain_bits,
            gadget.len(),
            self.gadget_base_bits,
            self.sigma,
        );
        noise_budget(&self.moduli, self.plain_modulus).log2() - (NOISE_TAIL * std).log2()
    }
}

/// Builder for [`PirParams`] with optional knobs
///
/// Defaults: N = 4096, plain_bits = 20, d = 2, per-dimension layout and
/// σ = 3.2.
///
/// # Example
///
/// ```
/// use sealpir::params::{PirParamsBuilder, QueryLayout};
///
/// let params = PirParamsBuilder::new(100, 288)
///     .layout(QueryLayout::Packed)
///     .build()
///     .unwrap();
/// assert_eq!(params.query_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PirParamsBuilder {
    element_count: usize,
    element_size: usize,
    poly_degree: usize,
    plain_bits: u32,
    dimension: u32,
    layout: QueryLayout,
    sigma: f64,
}

impl PirParamsBuilder {
    pub fn new(element_count: usize, element_size: usize) -> Self {
        Self {
            element_count,
            element_size,
            poly_degree: 4096,
            plain_bits: 20,
            dimension: 2,
            layout: QueryLayout::PerDimension,
            sigma: DEFAULT_SIGMA,
        }
    }

    pub fn poly_degree(mut self, poly_degree: usize) -> Self {
        self.poly_degree = poly_degree;
        self
    }

    pub fn plain_bits(mut self, plain_bits: u32) -> Self {
        self.plain_bits = plain_bits;
        self
    }

    pub fn dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn layout(mut self, layout: QueryLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn build(self) -> Result<PirParams> {
        let Self {
            element_count,
            element_size,
            poly_degree: n,
            plain_bits,
            dimension,
            layout,
            sigma,
        } = self;

        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(invalid_params!(
                "dimension must be in 1..={}, got {}",
                MAX_DIMENSION,
                dimension
            ));
        }
        if !n.is_power_of_two() || !(MIN_POLY_DEGREE..=MAX_POLY_DEGREE).contains(&n) {
            return Err(invalid_params!(
                "poly_degree must be a power of two in [{}, {}], got {}",
                MIN_POLY_DEGREE,
                MAX_POLY_DEGREE,
                n
            ));
        }
        if plain_bits == 0 || plain_bits > MAX_PLAIN_BITS {
            return Err(invalid_params!(
                "plain_bits must be in 1..={}, got {}",
                MAX_PLAIN_BITS,
                plain_bits
            ));
        }
        if element_count == 0 {
            return Err(invalid_params!("element_count must be positive"));
        }
        if element_size == 0 {
            return Err(invalid_params!("element_size must be positive"));
        }
        if element_count.checked_mul(element_size).is_none() {
            return Err(invalid_params!(
                "database of {} x {} bytes overflows",
                element_count,
                element_size
            ));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(invalid_params!("sigma must be positive, got {}", sigma));
        }

        let coefficients_per_element = element_size
            .checked_mul(8)
            .map(|bits| bits.div_ceil(plain_bits as usize))
            .ok_or_else(|| invalid_params!("element_size {} too large", element_size))?;

        let (elements_per_plaintext, columns) = if coefficients_per_element <= n {
            (n / coefficients_per_element, 1)
        } else {
            (1, element_size.div_ceil(bytes_per_plaintext(n, plain_bits)))
        };
        let plaintext_count = element_count.div_ceil(elements_per_plaintext);
        let extents = hypercube_extents(plaintext_count, dimension);

        if layout == QueryLayout::Packed {
            let total: usize = extents.iter().sum();
            if total > n {
                return Err(invalid_params!(
                    "packed layout needs Σ extents ≤ N, got {} > {}",
                    total,
                    n
                ));
            }
        }

        let moduli = moduli_for_degree(n).to_vec();
        let plain_modulus = ModQ::next_prime(1u64 << plain_bits)
            .ok_or_else(|| invalid_params!("no prime above 2^{}", plain_bits))?;

        let reply_bytes = expansion_ratio(&moduli, plain_bits)
            .checked_pow(dimension - 1)
            .and_then(|count| count.checked_mul(columns))
            .and_then(|count| count.checked_mul(ciphertext_size(n, moduli.len())));
        match reply_bytes {
            Some(bytes) if bytes <= MAX_REPLY_BYTES => {}
            _ => {
                return Err(invalid_params!(
                    "reply exceeds {} bytes for N = {}, d = {}",
                    MAX_REPLY_BYTES,
                    n,
                    dimension
                ))
            }
        }

        let budget = noise_budget(&moduli, plain_modulus);
        let gadget_base_bits = (1..=MAX_GADGET_BITS)
            .rev()
            .find(|&bits| {
                let gadget = GadgetVector::new(bits, &moduli);
                let std = estimated_noise_std(
                    &extents,
                    layout,
                    n,
                    plain_bits,
                    gadget.len(),
                    bits,
                    sigma,
                );
                NOISE_TAIL * std < budget
            })
            .ok_or_else(|| {
                invalid_params!(
                    "noise estimate exceeds the budget for N = {}, plain_bits = {}, extents {:?}",
                    n,
                    plain_bits,
                    extents
                )
            })?;

        Ok(PirParams {
            element_count,
            element_size,
            poly_degree: n,
            plain_bits,
            dimension,
            coefficients_per_element,
            elements_per_plaintext,
            columns,
            plaintext_count,
            extents,
            layout,
            moduli,
            plain_modulus,
            gadget_base_bits,
            sigma,
        })
    }
}

fn bytes_per_plaintext(n: usize, plain_bits: u32) -> usize {
    n * plain_bits as usize / 8
}

fn ciphertext_size(n: usize, prime_count: usize) -> usize {
    2 * prime_count * n * 8
}

fn expansion_ratio(moduli: &[u64], plain_bits: u32) -> usize {
    let chunks: u32 = moduli
        .iter()
        .map(|&q| (u64::BITS - q.leading_zeros()).div_ceil(plain_bits))
        .sum();
    2 * chunks as usize
}

/// Largest r with r^d ≤ x
fn integer_root(x: usize, d: u32) -> usize {
    let fits = |r: usize| r.checked_pow(d).is_some_and(|p| p <= x);
    let mut r = (x as f64).powf(1.0 / d as f64).floor() as usize;
    while r > 0 && !fits(r) {
        r -= 1;
    }
    while fits(r + 1) {
        r += 1;
    }
    r
}

/// Near-cubic shape with Π extents ≥ `plaintext_count`
fn hypercube_extents(plaintext_count: usize, dimension: u32) -> Vec<usize> {
    let d = dimension as usize;
    let root = integer_root(plaintext_count, dimension).max(1);
    let mut extents = vec![root; d];
    let mut next = 0;
    while extents.iter().product::<usize>() < plaintext_count {
        extents[next] += 1;
        next = (next + 1) % d;
    }
    extents
}

fn max_expansion_rounds(extents: &[usize], layout: QueryLayout, n: usize) -> u32 {
    match layout {
        QueryLayout::PerDimension => extents
            .iter()
            .map(|&e| expansion_rounds(e.min(n)))
            .max()
            .unwrap_or(0),
        QueryLayout::Packed => expansion_rounds(extents.iter().sum()),
    }
}

/// q / 2t
fn noise_budget(moduli: &[u64], plain_modulus: u64) -> f64 {
    let q: f64 = moduli.iter().map(|&p| p as f64).product();
    q / (2.0 * plain_modulus as f64)
}

/// Standard deviation of the reply noise, worst dimension
///
/// Key switching adds ℓ·N·(B²/3)·σ² per rotation; l expansion rounds give
/// 4^l·σ² + v_ks·(4^l − 1)/3; contracting n selectors against plaintexts with
/// coefficients below 2^plain_bits multiplies by n·N·2^(2·plain_bits)/3.
fn estimated_noise_std(
    extents: &[usize],
    layout: QueryLayout,
    n: usize,
    plain_bits: u32,
    gadget_len: usize,
    base_bits: u32,
    sigma: f64,
) -> f64 {
    let sigma2 = sigma * sigma;
    let ring = n as f64;
    let v_ks = gadget_len as f64 * ring * (2f64.powi(2 * base_bits as i32) / 3.0) * sigma2;
    let packed_rounds = expansion_rounds(extents.iter().sum());

    extents
        .iter()
        .map(|&extent| {
            let rounds = match layout {
                QueryLayout::PerDimension => expansion_rounds(extent.min(n)),
                QueryLayout::Packed => packed_rounds,
            };
            let four_l = 4f64.powi(rounds as i32);
            let v_l = four_l * sigma2 + v_ks * (four_l - 1.0) / 3.0;
            let v = extent as f64 * ring * (2f64.powi(2 * plain_bits as i32) / 3.0) * v_l;
            v.sqrt()
        })
        .fold(0.0, f64::max)
}
