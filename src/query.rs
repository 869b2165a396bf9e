//! Per-state queries over a built [`SparseMatrix`].
//!
//! All queries scan the extent `lo[src]..hi[src]` of a single row and decode
//! entries through [`Storage::decode`], so they work the same way for plain and
//! compacted storage.
//!
//! # Example
//!
//! ```
//! use sparse_rs::config::BuildConfig;
//! use sparse_rs::matrix::SparseMatrix;
//!
//! let entries = [(0, 1, 0.4), (0, 2, 0.6), (1, 1, 1.0)];
//! let m = SparseMatrix::build(3, &entries, &BuildConfig::default()).unwrap();
//!
//! assert_eq!(m.transition_prob(0, 1).unwrap(), Some(0.4));
//! assert_eq!(m.transition_prob(0, 0).unwrap(), None);
//!
//! let succ: Vec<_> = m.successors(0).unwrap().collect();
//! assert_eq!(succ, vec![1, 2]);
//!
//! assert!(m.is_final_state(1).unwrap()); // self-loop only
//! assert!(m.is_final_state(2).unwrap()); // no transitions
//! assert!(!m.is_final_state(0).unwrap());
//! ```

use std::iter::FusedIterator;
use std::ops::Range;

use crate::error::Result;
use crate::matrix::{SparseMatrix, Storage};

impl SparseMatrix {
    /// Weight of the transition `src -> dst`, or `None` if there is none.
    ///
    /// Entries of a row are not ordered, so the row is scanned linearly and the
    /// first entry for `dst` wins.
    pub fn transition_prob(&self, src: usize, dst: usize) -> Result<Option<f64>> {
        self.check_row(src)?;
        Ok(self.row_unchecked(src).find(|&(d, _)| d == dst).map(|(_, w)| w))
    }

    /// Destinations of `src` in storage order, self-loop included.
    ///
    /// The returned iterator decodes entries on the fly; calling this again
    /// decodes the row again.
    pub fn successors(&self, src: usize) -> Result<Successors<'_>> {
        self.check_row(src)?;
        Ok(Successors {
            storage: self.storage(),
            range: self.row_index().range(src),
        })
    }

    /// Destinations of `src`, collected.
    pub fn successor_states(&self, src: usize) -> Result<Vec<usize>> {
        Ok(self.successors(src)?.collect())
    }

    /// `(destination, weight)` pairs of row `src` in storage order.
    pub fn row(&self, src: usize) -> Result<RowEntries<'_>> {
        self.check_row(src)?;
        Ok(self.row_unchecked(src))
    }

    pub(crate) fn row_unchecked(&self, src: usize) -> RowEntries<'_> {
        RowEntries {
            storage: self.storage(),
            range: self.row_index().range(src),
        }
    }

    /// A state is final if it has no transitions, or if its only transition
    /// is a self-loop.
    pub fn is_final_state(&self, src: usize) -> Result<bool> {
        self.check_row(src)?;
        let range = self.row_index().range(src);
        Ok(match range.len() {
            0 => true,
            1 => self.storage().destination(range.start) == src,
            _ => false,
        })
    }

    /// Probability of following `path` step by step.
    ///
    /// The first state contributes nothing; a missing step makes the result
    /// `0.0`. Paths with fewer than two states have probability `1.0`.
    pub fn path_prob(&self, path: &[usize]) -> Result<f64> {
        if let Some(&first) = path.first() {
            self.check_row(first)?;
        }
        let mut prob = 1.0;
        for step in path.windows(2) {
            match self.transition_prob(step[0], step[1])? {
                Some(w) => prob *= w,
                None => return Ok(0.0),
            }
        }
        Ok(prob)
    }
}

/// Iterator over the destinations of a row.
///
/// Created by [`SparseMatrix::successors()`].
#[derive(Clone)]
pub struct Successors<'a> {
    storage: &'a Storage,
    range: Range<usize>,
}

impl Iterator for Successors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let j = self.range.next()?;
        Some(self.storage.destination(j))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for Successors<'_> {}
impl FusedIterator for Successors<'_> {}

/// Iterator over the `(destination, weight)` entries of a row.
///
/// Created by [`SparseMatrix::row()`].
#[derive(Clone)]
pub struct RowEntries<'a> {
    storage: &'a Storage,
    range: Range<usize>,
}

impl Iterator for RowEntries<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let j = self.range.next()?;
        Some(self.storage.decode(j))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for RowEntries<'_> {}
impl FusedIterator for RowEntries<'_> {}
