//! Database encoding for PIR
//!
//! Encodes database elements as plaintext polynomial coefficients.
//!
//! # Byte Packing
//!
//! A plaintext row holds `elements_per_plaintext` consecutive elements as one
//! byte stream. The stream is read least-significant bit first and cut into
//! `plain_bits`-wide coefficients:
//!
//! ```text
//! bytes:  b0 b1 b2 ...      (bit j of the stream = (b[j/8] >> j%8) & 1)
//! coeffs: c0 = bits[0..w), c1 = bits[w..2w), ...
//! ```
//!
//! When one element needs more than N coefficients, every element gets its
//! own row and is split across `columns` plaintexts of
//! ⌊N·plain_bits/8⌋ bytes each.
//!
//! # Layout
//!
//! Rows form a hypercube with shape `extents`, row-major with dimension 0
//! most significant. Rows past `plaintext_count` are zero padding.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::math::{NttContext, Poly};
use crate::params::PirParams;

use super::error::{PirError, Result};

/// Pack a byte stream into `plain_bits`-wide coefficients, LSB first
///
/// The output has exactly `coeff_count` entries; missing trailing
/// coefficients are zero.
pub fn bytes_to_coeffs(bytes: &[u8], plain_bits: u32, coeff_count: usize) -> Vec<u64> {
    debug_assert!((1..=32).contains(&plain_bits));
    let mask = (1u64 << plain_bits) - 1;
    let mut out = Vec::with_capacity(coeff_count);
    let mut acc = 0u64;
    let mut acc_bits = 0u32;

    for &byte in bytes {
        acc |= (byte as u64) << acc_bits;
        acc_bits += 8;
        while acc_bits >= plain_bits {
            out.push(acc & mask);
            acc >>= plain_bits;
            acc_bits -= plain_bits;
        }
    }
    if acc_bits > 0 {
        out.push(acc);
    }
    debug_assert!(out.len() <= coeff_count, "byte stream exceeds plaintext");
    out.resize(coeff_count, 0);
    out
}

/// Unpack `plain_bits`-wide coefficients into `byte_count` bytes, LSB first
///
/// Inverse of [`bytes_to_coeffs`]. Bits above `plain_bits` are ignored.
pub fn coeffs_to_bytes(coeffs: &[u64], plain_bits: u32, byte_count: usize) -> Vec<u8> {
    debug_assert!((1..=32).contains(&plain_bits));
    let mask = (1u64 << plain_bits) - 1;
    let mut out = Vec::with_capacity(byte_count);
    let mut acc = 0u64;
    let mut acc_bits = 0u32;

    for &c in coeffs {
        acc |= (c & mask) << acc_bits;
        acc_bits += plain_bits;
        while acc_bits >= 8 {
            if out.len() == byte_count {
                return out;
            }
            out.push(acc as u8);
            acc >>= 8;
            acc_bits -= 8;
        }
    }
    if acc_bits > 0 && out.len() < byte_count {
        out.push(acc as u8);
    }
    out.resize(byte_count, 0);
    out
}

/// Bytes of plaintext row `row`, column `column`, taken from the raw database
fn row_bytes<'a>(raw: &'a [u8], params: &PirParams, row: usize, column: usize) -> &'a [u8] {
    let size = params.element_size;
    if row >= params.plaintext_count {
        return &[];
    }
    if params.columns == 1 {
        let first = row * params.elements_per_plaintext;
        let last = (first + params.elements_per_plaintext).min(params.element_count);
        &raw[first * size..last * size]
    } else {
        let element = &raw[row * size..(row + 1) * size];
        let chunk = params.bytes_per_plaintext();
        let start = (column * chunk).min(size);
        let end = ((column + 1) * chunk).min(size);
        &element[start..end]
    }
}

fn encode_row(raw: &[u8], params: &PirParams, row: usize, column: usize, ctx: &NttContext) -> Poly {
    let coeffs = bytes_to_coeffs(
        row_bytes(raw, params, row, column),
        params.plain_bits,
        params.poly_degree,
    );
    Poly::from_small(&coeffs, ctx)
}

/// Server-side plaintext database
///
/// Each plaintext is stored once. Rows changed since the last
/// [`EncodedDatabase::preprocess`] are dirty and held in coefficient form;
/// every other row is in NTT form.
#[derive(Debug, Clone)]
pub struct EncodedDatabase {
    params: PirParams,
    /// [column][row]
    plaintexts: Vec<Vec<Poly>>,
    dirty: BTreeSet<usize>,
    loaded: bool,
}

impl EncodedDatabase {
    /// Empty (all-zero) database shaped for `params`
    pub fn new(params: &PirParams, ctx: &NttContext) -> Self {
        let rows = params.hypercube_size();
        let mut zero = Poly::zero(ctx);
        zero.to_ntt(ctx);
        Self {
            params: params.clone(),
            plaintexts: vec![vec![zero; rows]; params.columns],
            dirty: BTreeSet::new(),
            loaded: false,
        }
    }

    fn check_shape(&self, raw: &[u8], element_count: usize, element_size: usize) -> Result<()> {
        if element_count != self.params.element_count || element_size != self.params.element_size
        {
            return Err(PirError::InvalidDatabase(format!(
                "expected {} elements of {} bytes, got {} of {}",
                self.params.element_count, self.params.element_size, element_count, element_size
            )));
        }
        let expected = element_count * element_size;
        if raw.len() != expected {
            return Err(PirError::InvalidDatabase(format!(
                "expected {} bytes, got {}",
                expected,
                raw.len()
            )));
        }
        Ok(())
    }

    /// Replace the whole database
    ///
    /// Every row becomes dirty.
    pub fn load(
        &mut self,
        raw: &[u8],
        element_count: usize,
        element_size: usize,
        ctx: &NttContext,
    ) -> Result<()> {
        self.check_shape(raw, element_count, element_size)?;

        let params = &self.params;
        let rows = params.hypercube_size();
        self.plaintexts = (0..params.columns)
            .map(|column| {
                (0..rows)
                    .into_par_iter()
                    .map(|row| encode_row(raw, params, row, column, ctx))
                    .collect()
            })
            .collect();
        self.dirty = (0..rows).collect();
        self.loaded = true;

        info!(
            elements = element_count,
            element_size,
            plaintexts = rows * self.params.columns,
            "loaded database"
        );
        Ok(())
    }

    /// Re-encode the plaintext row holding element `index` from `raw`
    ///
    /// All checks happen before anything is modified.
    pub fn update(
        &mut self,
        raw: &[u8],
        element_count: usize,
        element_size: usize,
        index: usize,
        ctx: &NttContext,
    ) -> Result<()> {
        self.check_shape(raw, element_count, element_size)?;
        if index >= element_count {
            return Err(PirError::IndexOutOfRange {
                index,
                element_count,
            });
        }
        if !self.loaded {
            return Err(PirError::InvalidDatabase(
                "update before any database was loaded".into(),
            ));
        }

        let row = self.params.plaintext_index(index);
        for column in 0..self.params.columns {
            self.plaintexts[column][row] = encode_row(raw, &self.params, row, column, ctx);
        }
        self.dirty.insert(row);

        debug!(index, row, "updated element");
        Ok(())
    }

    /// Convert dirty rows to NTT form in place
    ///
    /// Returns the number of rows converted; a second call returns 0.
    pub fn preprocess(&mut self, ctx: &NttContext) -> usize {
        if self.dirty.is_empty() {
            return 0;
        }
        let dirty = std::mem::take(&mut self.dirty);

        for column in self.plaintexts.iter_mut() {
            column
                .par_iter_mut()
                .enumerate()
                .filter(|(row, _)| dirty.contains(row))
                .for_each(|(_, poly)| poly.to_ntt(ctx));
        }

        info!(rows = dirty.len(), "preprocessed database");
        dirty.len()
    }

    /// Whether evaluation would see stale or missing NTT forms
    pub fn is_stale(&self) -> bool {
        !self.loaded || !self.dirty.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Rows awaiting preprocessing
    pub fn dirty_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.dirty.iter().copied()
    }

    /// Plaintext at `column`, `row`; coefficient form while the row is dirty
    pub fn plaintext(&self, column: usize, row: usize) -> &Poly {
        &self.plaintexts[column][row]
    }

    /// Plaintexts of one column in hypercube order
    ///
    /// All in NTT form once [`EncodedDatabase::is_stale`] is false.
    pub fn preprocessed_column(&self, column: usize) -> &[Poly] {
        &self.plaintexts[column]
    }

    pub fn params(&self) -> &PirParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_bytes() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(333).collect();
        for bits in [1u32, 7, 8, 12, 20, 32] {
            let n = (bytes.len() * 8).div_ceil(bits as usize) + 3;
            let coeffs = bytes_to_coeffs(&bytes, bits, n);
            assert_eq!(coeffs.len(), n);
            assert!(coeffs.iter().all(|&c| c < (1u64 << bits)));
            assert_eq!(coeffs_to_bytes(&coeffs, bits, bytes.len()), bytes, "bits = {}", bits);
        }
    }

    #[test]
    fn test_lsb_first_order() {
        // 0x34, 0x12 → bits 0x1234 → 12-bit chunks 0x234, 0x1
        assert_eq!(bytes_to_coeffs(&[0x34, 0x12], 12, 3), vec![0x234, 0x1, 0]);
        assert_eq!(coeffs_to_bytes(&[0x234, 0x1], 12, 2), vec![0x34, 0x12]);
    }

    fn small_params() -> PirParams {
        PirParams::derive(70, 100, 2048, 12, 2).unwrap()
    }

    fn raw_database(params: &PirParams, salt: u8) -> Vec<u8> {
        (0..params.element_count * params.element_size)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(salt))
            .collect()
    }

    #[test]
    fn test_load_packs_rows() {
        let params = small_params();
        let ctx = params.bfv_context().ntt().clone();
        let raw = raw_database(&params, 0);
        let mut db = EncodedDatabase::new(&params, &ctx);
        assert!(db.is_stale());

        db.load(&raw, params.element_count, params.element_size, &ctx)
            .unwrap();
        assert_eq!(db.dirty_rows().count(), params.hypercube_size());

        let epp = params.elements_per_plaintext;
        let row0 = db.plaintext(0, 0).row(0, &ctx);
        let bytes = coeffs_to_bytes(row0, params.plain_bits, epp * params.element_size);
        assert_eq!(bytes, &raw[..epp * params.element_size]);

        let padding = params.hypercube_size() - 1;
        assert!(padding >= params.plaintext_count);
        assert!(db.plaintext(0, padding).coeffs().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_preprocess_clears_dirty_rows() {
        let params = small_params();
        let ctx = params.bfv_context().ntt().clone();
        let mut db = EncodedDatabase::new(&params, &ctx);
        db.load(&raw_database(&params, 1), 70, 100, &ctx).unwrap();
        let mut expected = db.plaintext(0, 1).clone();
        assert!(!expected.is_ntt());
        expected.to_ntt(&ctx);

        assert_eq!(db.preprocess(&ctx), params.hypercube_size());
        assert!(!db.is_stale());
        assert_eq!(db.preprocess(&ctx), 0);

        assert_eq!(&db.preprocessed_column(0)[1], &expected);
        assert!(db.preprocessed_column(0).iter().all(Poly::is_ntt));
    }

    #[test]
    fn test_update_marks_single_row() {
        let params = small_params();
        let ctx = params.bfv_context().ntt().clone();
        let mut db = EncodedDatabase::new(&params, &ctx);
        let mut raw = raw_database(&params, 2);
        db.load(&raw, 70, 100, &ctx).unwrap();
        db.preprocess(&ctx);

        let index = 69;
        raw[index * 100..(index + 1) * 100].fill(0xAB);
        db.update(&raw, 70, 100, index, &ctx).unwrap();
        let row = params.plaintext_index(index);
        assert_eq!(db.dirty_rows().collect::<Vec<_>>(), vec![row]);
        assert!(db.is_stale());

        // only the dirty row waits in coefficient form
        let column = db.preprocessed_column(0);
        assert!(!column[row].is_ntt());
        assert_eq!(column.iter().filter(|p| p.is_ntt()).count(), column.len() - 1);
        let offset = params.plaintext_offset(index);
        let bytes = coeffs_to_bytes(
            column[row].row(0, &ctx),
            params.plain_bits,
            (offset + 1) * 100,
        );
        assert_eq!(&bytes[offset * 100..], &[0xAB; 100][..]);

        assert_eq!(db.preprocess(&ctx), 1);
        assert!(db.preprocessed_column(0)[row].is_ntt());
    }

    #[test]
    fn test_update_validation_leaves_state() {
        let params = small_params();
        let ctx = params.bfv_context().ntt().clone();
        let mut db = EncodedDatabase::new(&params, &ctx);
        let raw = raw_database(&params, 3);
        assert!(!db.is_loaded());

        assert!(matches!(
            db.update(&raw, 70, 100, 0, &ctx),
            Err(PirError::InvalidDatabase(_))
        ));

        assert!(!db.is_loaded());
        db.load(&raw, 70, 100, &ctx).unwrap();
        assert!(db.is_loaded());
        db.preprocess(&ctx);
        assert!(matches!(
            db.update(&raw, 70, 100, 70, &ctx),
            Err(PirError::IndexOutOfRange {
                index: 70,
                element_count: 70
            })
        ));
        assert!(matches!(
            db.load(&raw[1..], 70, 100, &ctx),
            Err(PirError::InvalidDatabase(_))
        ));
        assert!(matches!(
            db.load(&raw, 69, 100, &ctx),
            Err(PirError::InvalidDatabase(_))
        ));
        assert!(!db.is_stale());
    }

    #[test]
    fn test_columns_split_large_elements() {
        let params = PirParams::derive(3, 5000, 2048, 12, 1).unwrap();
        assert_eq!(params.columns, 2);
        let ctx = params.bfv_context().ntt().clone();
        let raw: Vec<u8> = (0..3 * 5000).map(|i| (i % 251) as u8).collect();
        let mut db = EncodedDatabase::new(&params, &ctx);
        db.load(&raw, 3, 5000, &ctx).unwrap();

        let chunk = params.bytes_per_plaintext();
        let mut element = coeffs_to_bytes(db.plaintext(0, 2).row(0, &ctx), 12, chunk);
        element.extend(coeffs_to_bytes(db.plaintext(1, 2).row(0, &ctx), 12, chunk));
        assert_eq!(&element[..5000], &raw[2 * 5000..3 * 5000]);
    }
}
