//! Error type shared by construction, queries and export.

use crate::types::Var;

/// Errors raised while building, querying or exporting a sparse matrix.
///
/// Compaction being infeasible is not an error (the plain form is used
/// instead), and neither is a missing transition in a probability lookup.
#[derive(Debug, thiserror::Error)]
pub enum SparseError {
    /// An allocation failed during construction.
    #[error("out of memory while allocating {what} ({requested} elements)")]
    OutOfMemory { what: &'static str, requested: usize },

    /// A query was issued against an empty (never built or released) slot.
    #[error("no sparse matrix has been built")]
    NoMatrix,

    #[error("state {state} is out of range (matrix has {num_states} states)")]
    StateOutOfRange { state: usize, num_states: usize },

    #[error("choice {choice} is out of range (state {state} has {num_choices} choices)")]
    ChoiceOutOfRange {
        state: usize,
        choice: usize,
        num_choices: usize,
    },

    /// The counts row encoding was forced, but a row does not fit in a byte.
    #[error("row {row} has {len} entries, too many for the counts encoding")]
    RowTooLong { row: usize, len: usize },

    /// The materialized row index does not end at the number of non-zeros.
    #[error("inconsistent row index: expected {expected} non-zeros, found {found}")]
    InconsistentIndex { expected: usize, found: usize },

    #[error("relation mentions variable {0} outside of the given orderings")]
    UnknownVariable(Var),

    #[error("column width must be in the range 2..=32, got {0}")]
    InvalidColumnWidth(u32),

    #[error("invalid action label value {value}")]
    InvalidActionLabel { value: f64 },

    #[error("{n} states do not fit into 32-bit column indices")]
    TooManyStates { n: usize },

    /// Row and column orderings, or an ordering and the state enumeration,
    /// disagree on the number of bits per state.
    #[error("orderings disagree: expected {expected} variables, found {found}")]
    OrderingMismatch { expected: usize, found: usize },

    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SparseError>;

/// Reserves exactly `len` elements in a fresh vector, reporting failure as
/// [`SparseError::OutOfMemory`] instead of aborting.
pub(crate) fn try_vec<T>(what: &'static str, len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| SparseError::OutOfMemory { what, requested: len })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = SparseError::StateOutOfRange {
            state: 7,
            num_states: 3,
        };
        assert_eq!(e.to_string(), "state 7 is out of range (matrix has 3 states)");
        assert_eq!(SparseError::NoMatrix.to_string(), "no sparse matrix has been built");
        assert_eq!(
            SparseError::UnknownVariable(Var::new(9)).to_string(),
            "relation mentions variable x9 outside of the given orderings"
        );
    }

    #[test]
    fn test_try_vec() {
        let v: Vec<u32> = try_vec("cols", 16).unwrap();
        assert!(v.capacity() >= 16);
        assert!(v.is_empty());

        let e = try_vec::<u64>("cols", usize::MAX).unwrap_err();
        assert!(matches!(e, SparseError::OutOfMemory { what: "cols", .. }));
    }
}
