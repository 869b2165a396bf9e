//! Row-length encodings and materialized row boundaries.
//!
//! Rows of variable length are delimited either by one byte per row
//! ([`RowLengths::Counts`], valid while no row exceeds 255 entries) or by
//! `n + 1` absolute offsets ([`RowLengths::Starts`]). Either way, [`RowIndex`]
//! turns them into `lo`/`hi` arrays so that row `i` is `lo[i]..hi[i]`.
//!
//! The same machinery groups choice-rows under states in
//! [`NdSparseMatrix`][crate::nondet::NdSparseMatrix].

use std::ops::Range;

use log::debug;

use crate::config::RowEncoding;
use crate::error::{try_vec, Result, SparseError};

/// Maximum row length representable in the counts form.
pub const MAX_COUNT: usize = u8::MAX as usize;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RowLengths {
    /// Number of entries of each row.
    Counts(Vec<u8>),
    /// Offset of the first entry of each row, plus the total at the end.
    Starts(Vec<usize>),
}

impl RowLengths {
    /// Encodes the given row lengths according to `policy`.
    pub fn from_lengths(lengths: &[usize], policy: RowEncoding) -> Result<Self> {
        let longest = lengths
            .iter()
            .enumerate()
            .max_by_key(|&(_, &len)| len)
            .map(|(row, &len)| (row, len));
        let use_counts = match policy {
            RowEncoding::Auto => longest.map_or(true, |(_, len)| len <= MAX_COUNT),
            RowEncoding::Counts => {
                if let Some((row, len)) = longest.filter(|&(_, len)| len > MAX_COUNT) {
                    return Err(SparseError::RowTooLong { row, len });
                }
                true
            }
            RowEncoding::Starts => false,
        };
        debug!(
            "row lengths: {} rows, longest {:?}, using {}",
            lengths.len(),
            longest,
            if use_counts { "counts" } else { "starts" }
        );

        if use_counts {
            let mut counts = try_vec("row counts", lengths.len())?;
            counts.extend(lengths.iter().map(|&len| len as u8));
            Ok(RowLengths::Counts(counts))
        } else {
            let mut starts = try_vec("row starts", lengths.len() + 1)?;
            let mut total = 0;
            starts.push(0);
            for &len in lengths {
                total += len;
                starts.push(total);
            }
            Ok(RowLengths::Starts(starts))
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            RowLengths::Counts(counts) => counts.len(),
            RowLengths::Starts(starts) => starts.len().saturating_sub(1),
        }
    }

    pub fn uses_counts(&self) -> bool {
        matches!(self, RowLengths::Counts(_))
    }

    /// Offset of the first entry of `row`.
    ///
    /// This is a prefix sum in the counts form, so it is linear in `row`;
    /// prefer [`RowIndex`] for repeated lookups.
    pub fn first_entry(&self, row: usize) -> usize {
        match self {
            RowLengths::Counts(counts) => counts[..row].iter().map(|&c| c as usize).sum(),
            RowLengths::Starts(starts) => starts[row],
        }
    }

    pub fn mem_bytes(&self) -> usize {
        match self {
            RowLengths::Counts(counts) => counts.len(),
            RowLengths::Starts(starts) => starts.len() * std::mem::size_of::<usize>(),
        }
    }
}

/// Materialized row boundaries: row `i` occupies `lo[i]..hi[i]`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RowIndex {
    lo: Vec<usize>,
    hi: Vec<usize>,
}

impl RowIndex {
    pub fn build(lengths: &RowLengths) -> Result<Self> {
        let n = lengths.num_rows();
        let mut lo = try_vec("row index (lo)", n)?;
        let mut hi = try_vec("row index (hi)", n)?;
        match lengths {
            RowLengths::Counts(counts) => {
                let mut h = 0;
                for &c in counts {
                    lo.push(h);
                    h += c as usize;
                    hi.push(h);
                }
            }
            RowLengths::Starts(starts) => {
                for w in starts.windows(2) {
                    lo.push(w[0]);
                    hi.push(w[1]);
                }
            }
        }
        Ok(Self { lo, hi })
    }

    /// Checks that the last row ends exactly at `nnz`.
    pub fn check(&self, nnz: usize) -> Result<()> {
        let found = self.hi.last().copied().unwrap_or(0);
        if found != nnz {
            return Err(SparseError::InconsistentIndex {
                expected: nnz,
                found,
            });
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self) -> &[usize] {
        &self.lo
    }

    pub fn hi(&self) -> &[usize] {
        &self.hi
    }

    #[inline]
    pub fn range(&self, row: usize) -> Range<usize> {
        self.lo[row]..self.hi[row]
    }

    #[inline]
    pub fn len(&self, row: usize) -> usize {
        self.hi[row] - self.lo[row]
    }

    pub fn mem_bytes(&self) -> usize {
        2 * self.lo.len() * std::mem::size_of::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn assert_invariants(index: &RowIndex, nnz: usize) {
        let n = index.num_rows();
        if n > 0 {
            assert_eq!(index.lo()[0], 0);
        }
        for i in 0..n {
            assert!(index.lo()[i] <= index.hi()[i]);
            if i + 1 < n {
                assert_eq!(index.hi()[i], index.lo()[i + 1]);
            }
        }
        index.check(nnz).unwrap();
    }

    #[test]
    fn test_counts() {
        let lengths = RowLengths::from_lengths(&[2, 0, 3, 1], RowEncoding::Auto).unwrap();
        assert_eq!(lengths, RowLengths::Counts(vec![2, 0, 3, 1]));
        let index = RowIndex::build(&lengths).unwrap();
        assert_eq!(index.lo(), &[0, 2, 2, 5]);
        assert_eq!(index.hi(), &[2, 2, 5, 6]);
        assert_eq!(index.range(2), 2..5);
        assert_eq!(index.len(1), 0);
        assert_invariants(&index, 6);
    }

    #[test]
    fn test_starts() {
        let lengths = RowLengths::from_lengths(&[2, 0, 3, 1], RowEncoding::Starts).unwrap();
        assert_eq!(lengths, RowLengths::Starts(vec![0, 2, 2, 5, 6]));
        assert_eq!(lengths.num_rows(), 4);
        let index = RowIndex::build(&lengths).unwrap();
        assert_invariants(&index, 6);
    }

    #[test]
    fn test_counts_and_starts_agree() {
        let lens: Vec<usize> = (0..100).map(|i| (i * 37) % 256).collect();
        let nnz = lens.iter().sum();
        let counts = RowLengths::from_lengths(&lens, RowEncoding::Counts).unwrap();
        let starts = RowLengths::from_lengths(&lens, RowEncoding::Starts).unwrap();
        let a = RowIndex::build(&counts).unwrap();
        let b = RowIndex::build(&starts).unwrap();
        assert_eq!(a, b);
        assert_invariants(&a, nnz);
        for row in [0, 1, 50, 99] {
            assert_eq!(counts.first_entry(row), starts.first_entry(row));
            assert_eq!(counts.first_entry(row), a.lo()[row]);
        }
    }

    #[test]
    fn test_auto_falls_back_to_starts() {
        let lengths = RowLengths::from_lengths(&[1, 256, 0], RowEncoding::Auto).unwrap();
        assert!(!lengths.uses_counts());
        let index = RowIndex::build(&lengths).unwrap();
        assert_eq!(index.range(1), 1..257);
        assert_invariants(&index, 257);
    }

    #[test]
    fn test_forced_counts_too_long() {
        let err = RowLengths::from_lengths(&[1, 300], RowEncoding::Counts).unwrap_err();
        assert!(matches!(err, SparseError::RowTooLong { row: 1, len: 300 }));
    }

    #[test]
    fn test_empty() {
        let lengths = RowLengths::from_lengths(&[], RowEncoding::Auto).unwrap();
        assert_eq!(lengths.num_rows(), 0);
        let index = RowIndex::build(&lengths).unwrap();
        assert_eq!(index.num_rows(), 0);
        index.check(0).unwrap();
        assert!(index.check(1).is_err());
    }

    #[test]
    fn test_inconsistent() {
        let index = RowIndex::build(&RowLengths::Counts(vec![1, 2])).unwrap();
        let err = index.check(4).unwrap_err();
        assert!(matches!(
            err,
            SparseError::InconsistentIndex {
                expected: 4,
                found: 3
            }
        ));
    }
}
