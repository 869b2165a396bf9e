//! Enumeration of reachable states.
//!
//! An [`Odd`] assigns each reachable state a dense index in `0..n`. States are
//! given as bit-vectors over the row variables (first variable is the most
//! significant bit) and indexed in increasing numeric order, which is the order
//! in which a depth-first walk of an offset-labelled decision diagram visits
//! them.

use std::fmt;

/// Reachable-state enumeration over `num_bits` state bits.
#[derive(Clone, Eq, PartialEq)]
pub struct Odd {
    num_bits: usize,
    states: Vec<u64>,
}

impl Odd {
    /// Creates an enumeration of the given reachable states.
    ///
    /// Duplicates are merged.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > 63` or if some state does not fit in `num_bits`.
    pub fn new(num_bits: usize, states: impl IntoIterator<Item = u64>) -> Self {
        assert!(num_bits <= 63, "State encodings must have at most 63 bits");
        let mut states: Vec<u64> = states.into_iter().collect();
        states.sort_unstable();
        states.dedup();
        if let Some(&max) = states.last() {
            assert!(
                max >> num_bits == 0,
                "State {} does not fit in {} bits",
                max,
                num_bits
            );
        }
        Self { num_bits, states }
    }

    /// Creates an enumeration of all `2^num_bits` states.
    pub fn full(num_bits: usize) -> Self {
        Self::new(num_bits, 0..1u64 << num_bits)
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Encodings of the reachable states, by index.
    pub fn states(&self) -> &[u64] {
        &self.states
    }

    /// Encoding of the state with the given index.
    pub fn state(&self, index: usize) -> Option<u64> {
        self.states.get(index).copied()
    }

    /// Index of the state with the given encoding, if it is reachable.
    pub fn index_of(&self, state: u64) -> Option<usize> {
        self.states.binary_search(&state).ok()
    }

    /// Reachable states `s` with `s & mask == value`, as `(index, encoding)`.
    ///
    /// The leading run of fixed bits narrows the search to a contiguous range
    /// of indices; the remaining fixed bits are checked one state at a time.
    pub fn matching(&self, mask: u64, value: u64) -> impl Iterator<Item = (usize, u64)> + '_ {
        let full = if self.num_bits == 0 { 0 } else { u64::MAX >> (64 - self.num_bits) };
        let mask = mask & full;
        let prefix = (mask | !full).leading_ones() as usize - (64 - self.num_bits);
        let shift = self.num_bits - prefix;
        let range = if prefix == 0 {
            0..self.states.len()
        } else {
            let key = value >> shift;
            let lo = self.states.partition_point(|&s| (s >> shift) < key);
            let hi = self.states.partition_point(|&s| (s >> shift) <= key);
            lo..hi
        };
        self.states[range.clone()]
            .iter()
            .zip(range)
            .filter(move |&(&s, _)| s & mask == value & mask)
            .map(|(&s, i)| (i, s))
    }
}

impl fmt::Debug for Odd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Odd")
            .field("num_bits", &self.num_bits)
            .field("num_states", &self.states.len())
            .finish()
    }
}
