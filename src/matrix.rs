//! Row-major sparse matrices with plain or compacted column storage.
//!
//! A [`SparseMatrix`] owns:
//!
//! - the row-length encoding ([`RowLengths`]) and its materialized
//!   [`RowIndex`], giving O(1) access to the extent of every row;
//! - the column/value storage ([`Storage`]), either plain parallel arrays or
//!   packed `(destination, dictionary index)` entries with a value
//!   dictionary.
//!
//! Matrices are built once and are read-only afterwards.
//!
//! # Examples
//!
//! ```
//! use sparse_rs::config::BuildConfig;
//! use sparse_rs::matrix::SparseMatrix;
//!
//! let entries = [(0, 1, 0.4), (0, 2, 0.6), (1, 1, 1.0)];
//! let m = SparseMatrix::build(3, &entries, &BuildConfig::default()).unwrap();
//! assert_eq!(m.nnz(), 3);
//! assert!(m.is_compact());
//! assert_eq!(m.transition_prob(0, 2).unwrap(), Some(0.6));
//! ```

use std::fmt::{self, Debug};

use log::{debug, info};

use crate::codec::{ColumnCodec, Fit};
use crate::config::BuildConfig;
use crate::dictionary::ValueDictionary;
use crate::error::{try_vec, Result, SparseError};
use crate::rows::{RowIndex, RowLengths};
use crate::utils::format_memory;

/// Column/value storage of a sparse matrix.
#[derive(Clone)]
pub enum Storage {
    /// Parallel destination and weight arrays.
    Plain { cols: Vec<u32>, values: Vec<f64> },
    /// Packed destination and dictionary index per entry.
    Compact {
        cols: Vec<u32>,
        dictionary: Vec<f64>,
        codec: ColumnCodec,
    },
}

impl Storage {
    /// Destination and weight of entry `j`.
    #[inline]
    pub fn decode(&self, j: usize) -> (usize, f64) {
        match self {
            Storage::Plain { cols, values } => (cols[j] as usize, values[j]),
            Storage::Compact {
                cols,
                dictionary,
                codec,
            } => {
                let (dst, k) = codec.decode(cols[j]);
                (dst as usize, dictionary[k as usize])
            }
        }
    }

    /// Destination of entry `j`.
    #[inline]
    pub fn destination(&self, j: usize) -> usize {
        match self {
            Storage::Plain { cols, .. } => cols[j] as usize,
            Storage::Compact { cols, codec, .. } => codec.destination(cols[j]) as usize,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::Plain { cols, .. } | Storage::Compact { cols, .. } => cols.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_compact(&self) -> bool {
        matches!(self, Storage::Compact { .. })
    }

    pub fn mem_bytes(&self) -> usize {
        match self {
            Storage::Plain { cols, values } => cols.len() * 4 + values.len() * 8,
            Storage::Compact {
                cols, dictionary, ..
            } => cols.len() * 4 + dictionary.len() * 8,
        }
    }

    /// Tries to build the compacted form. Returns `None` if the distinct
    /// weights do not fit next to destinations in `0..num_cols`.
    fn compact(
        entries: &[(usize, usize, f64)],
        order: &[usize],
        num_cols: usize,
        column_bits: u32,
    ) -> Result<Option<Self>> {
        let (dict, indices) = ValueDictionary::from_values(order.iter().map(|&e| entries[e].2));
        let codec = match dict.fit(num_cols, column_bits) {
            Fit::Fits(codec) => codec,
            Fit::TooWide {
                dictionary_bits,
                state_bits,
                column_bits,
            } => {
                debug!(
                    "cannot compact: {} distinct values ({} bits) and {} states ({} bits) exceed {} bits",
                    dict.len(),
                    dictionary_bits,
                    num_cols,
                    state_bits,
                    column_bits
                );
                return Ok(None);
            }
        };
        debug!("compacting: {} distinct values, shift = {}", dict.len(), codec.shift());

        let mut cols = try_vec("compact columns", order.len())?;
        cols.extend(
            order
                .iter()
                .zip(&indices)
                .map(|(&e, &k)| codec.encode(entries[e].1 as u32, k)),
        );
        let mut dictionary = try_vec("value dictionary", dict.len())?;
        dictionary.extend_from_slice(dict.values());
        Ok(Some(Storage::Compact {
            cols,
            dictionary,
            codec,
        }))
    }

    fn plain(entries: &[(usize, usize, f64)], order: &[usize]) -> Result<Self> {
        let mut cols = try_vec("columns", order.len())?;
        let mut values = try_vec("values", order.len())?;
        for &e in order {
            cols.push(entries[e].1 as u32);
            values.push(entries[e].2);
        }
        Ok(Storage::Plain { cols, values })
    }
}

impl Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Plain { cols, .. } => f.debug_struct("Plain").field("nnz", &cols.len()).finish(),
            Storage::Compact {
                cols,
                dictionary,
                codec,
            } => f
                .debug_struct("Compact")
                .field("nnz", &cols.len())
                .field("dictionary", &dictionary.len())
                .field("shift", &codec.shift())
                .finish(),
        }
    }
}

/// A sparse matrix in row-major order.
#[derive(Clone)]
pub struct SparseMatrix {
    num_rows: usize,
    num_cols: usize,
    lengths: RowLengths,
    index: RowIndex,
    storage: Storage,
}

impl SparseMatrix {
    /// Builds an `n`×`n` matrix from `(source, destination, weight)` entries.
    ///
    /// Entries of a row are stored in the order they appear in `entries`.
    /// The compacted form is attempted first when `config.compact` is set.
    pub fn build(n: usize, entries: &[(usize, usize, f64)], config: &BuildConfig) -> Result<Self> {
        Self::build_rect(n, n, entries, config)
    }

    /// Builds a matrix whose rows are not necessarily states (for example
    /// choice-rows), while columns are always states in `0..num_cols`.
    pub(crate) fn build_rect(
        num_rows: usize,
        num_cols: usize,
        entries: &[(usize, usize, f64)],
        config: &BuildConfig,
    ) -> Result<Self> {
        config.validate()?;
        if num_cols > u32::MAX as usize {
            return Err(SparseError::TooManyStates { n: num_cols });
        }

        let mut lengths = try_vec("row lengths", num_rows)?;
        lengths.resize(num_rows, 0usize);
        for &(src, dst, _) in entries {
            if src >= num_rows {
                return Err(SparseError::StateOutOfRange {
                    state: src,
                    num_states: num_rows,
                });
            }
            if dst >= num_cols {
                return Err(SparseError::StateOutOfRange {
                    state: dst,
                    num_states: num_cols,
                });
            }
            lengths[src] += 1;
        }
        let row_lengths = RowLengths::from_lengths(&lengths, config.row_encoding)?;

        // Stable bucket sort of entries by row.
        let mut next = try_vec("row cursor", num_rows)?;
        let mut offset = 0;
        for &len in &lengths {
            next.push(offset);
            offset += len;
        }
        let mut order = try_vec("row order", entries.len())?;
        order.resize(entries.len(), 0usize);
        for (e, &(src, _, _)) in entries.iter().enumerate() {
            order[next[src]] = e;
            next[src] += 1;
        }
        drop(next);
        drop(lengths);

        let compact = if config.compact {
            Storage::compact(entries, &order, num_cols, config.column_bits)?
        } else {
            None
        };
        let storage = match compact {
            Some(storage) => storage,
            None => Storage::plain(entries, &order)?,
        };
        drop(order);

        let index = RowIndex::build(&row_lengths)?;
        index.check(entries.len())?;

        let matrix = Self {
            num_rows,
            num_cols,
            lengths: row_lengths,
            index,
            storage,
        };
        info!(
            "Sparse matrix: {} rows, {} non-zeros, compact = {}, counts = {} [{}]",
            matrix.num_rows,
            matrix.nnz(),
            matrix.is_compact(),
            matrix.uses_counts(),
            format_memory(matrix.mem_kb())
        );
        Ok(matrix)
    }

    /// Number of rows (states, or choice-rows for nondeterministic models).
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of states a destination may refer to.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.storage.len()
    }

    pub fn is_compact(&self) -> bool {
        self.storage.is_compact()
    }

    pub fn uses_counts(&self) -> bool {
        self.lengths.uses_counts()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn row_lengths(&self) -> &RowLengths {
        &self.lengths
    }

    pub fn row_index(&self) -> &RowIndex {
        &self.index
    }

    /// Memory used by the matrix, in KB.
    pub fn mem_kb(&self) -> f64 {
        let bytes = self.storage.mem_bytes() + self.lengths.mem_bytes() + self.index.mem_bytes();
        bytes as f64 / 1024.0
    }

    pub(crate) fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.num_rows {
            return Err(SparseError::StateOutOfRange {
                state: row,
                num_states: self.num_rows,
            });
        }
        Ok(())
    }
}

impl Debug for SparseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrix")
            .field("rows", &self.num_rows)
            .field("cols", &self.num_cols)
            .field("counts", &self.uses_counts())
            .field("storage", &self.storage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::RowEncoding;

    fn chain(config: &BuildConfig) -> SparseMatrix {
        let entries = [(0, 1, 0.4), (1, 1, 1.0), (0, 2, 0.6)];
        SparseMatrix::build(3, &entries, config).unwrap()
    }

    #[test]
    fn test_build_compact() {
        let m = chain(&BuildConfig::default());
        assert!(m.is_compact());
        assert!(m.uses_counts());
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_index().lo(), &[0, 2, 3]);
        assert_eq!(m.row_index().hi(), &[2, 3, 3]);
        // Row order follows insertion order within a row.
        assert_eq!(m.storage().decode(0), (1, 0.4));
        assert_eq!(m.storage().decode(1), (2, 0.6));
        assert_eq!(m.storage().decode(2), (1, 1.0));
    }

    #[test]
    fn test_build_plain() {
        let m = chain(&BuildConfig::default().with_compact(false));
        assert!(!m.is_compact());
        assert_eq!(m.storage().decode(1), (2, 0.6));
        assert_eq!(m.storage().destination(2), 1);
    }

    #[test]
    fn test_compact_fallback() {
        // 4 states need 2 bits, 8 distinct values need 3 bits: 5 > 4.
        let entries: Vec<_> = (0..8).map(|i| (i % 4, (i + 1) % 4, 1.0 / (i + 2) as f64)).collect();
        let config = BuildConfig::default().with_column_bits(4);
        let m = SparseMatrix::build(4, &entries, &config).unwrap();
        assert!(!m.is_compact());

        let config = BuildConfig::default().with_column_bits(5);
        let m = SparseMatrix::build(4, &entries, &config).unwrap();
        assert!(m.is_compact());
    }

    #[test]
    fn test_forced_starts() {
        let m = chain(&BuildConfig::default().with_row_encoding(RowEncoding::Starts));
        assert!(!m.uses_counts());
        assert_eq!(m.row_index().lo(), &[0, 2, 3]);
        assert_eq!(m.row_index().hi(), &[2, 3, 3]);
    }

    #[test]
    fn test_out_of_range_entry() {
        let err = SparseMatrix::build(2, &[(0, 2, 1.0)], &BuildConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SparseError::StateOutOfRange {
                state: 2,
                num_states: 2
            }
        ));
        let err = SparseMatrix::build(2, &[(5, 0, 1.0)], &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, SparseError::StateOutOfRange { state: 5, .. }));
    }

    #[test]
    fn test_invalid_width() {
        let config = BuildConfig::default().with_column_bits(40);
        let err = SparseMatrix::build(1, &[], &config).unwrap_err();
        assert!(matches!(err, SparseError::InvalidColumnWidth(40)));
    }

    #[test]
    fn test_empty() {
        let m = SparseMatrix::build(0, &[], &BuildConfig::default()).unwrap();
        assert_eq!(m.num_rows(), 0);
        assert_eq!(m.nnz(), 0);
        assert!(m.storage().is_empty());
    }

    #[test]
    fn test_debug() {
        let m = chain(&BuildConfig::default());
        let s = format!("{:?}", m);
        assert!(s.contains("Compact"));
        assert!(m.mem_kb() > 0.0);
    }
}
