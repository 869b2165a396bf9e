//! Symbolic relations given as decision-diagram paths.
//!
//! A [`Relation`] is the list of paths from the root of a (multi-terminal)
//! decision diagram to its non-zero terminals. Each [`Path`] is a cube of
//! literals and the terminal value it reaches; variables that do not occur in
//! the cube are don't-cares.
//!
//! # Example
//!
//! ```
//! use sparse_rs::relation::Relation;
//! use sparse_rs::types::{Lit, VarOrder};
//!
//! // One state bit: row variable x1, column variable x2.
//! let rows = VarOrder::from_ids([1]);
//! let cols = VarOrder::from_ids([2]);
//!
//! // From state 0, go to either state with probability 0.5.
//! let mut trans = Relation::new();
//! trans.add_path([Lit::from(-1)], 0.5);
//! assert_eq!(trans.len(), 1);
//!
//! // The same, written out per transition.
//! let explicit = Relation::from_transitions(&rows, &cols, [(0, 0, 0.5), (0, 1, 0.5)]);
//! assert_eq!(explicit.len(), 2);
//! ```

use std::fmt;

use crate::types::{Lit, VarOrder};

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub cube: Vec<Lit>,
    pub value: f64,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, lit) in self.cube.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", lit)?;
        }
        write!(f, "] -> {}", self.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Relation {
    paths: Vec<Path>,
}

impl Relation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path to a terminal with the given value.
    ///
    /// Paths to the zero terminal are not part of the relation and are ignored.
    pub fn add_path(&mut self, cube: impl IntoIterator<Item = Lit>, value: f64) {
        if value == 0.0 {
            return;
        }
        self.paths.push(Path {
            cube: cube.into_iter().collect(),
            value,
        });
    }

    /// Builds a relation with one fully specified path per
    /// `(source, destination, value)` triple, where source and destination are
    /// state encodings over `rows` and `cols`.
    pub fn from_transitions(
        rows: &VarOrder,
        cols: &VarOrder,
        transitions: impl IntoIterator<Item = (u64, u64, f64)>,
    ) -> Self {
        let mut relation = Self::new();
        for (src, dst, value) in transitions {
            let cube = cube_of(rows, src).chain(cube_of(cols, dst));
            relation.add_path(cube, value);
        }
        relation
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Extend<Path> for Relation {
    fn extend<I: IntoIterator<Item = Path>>(&mut self, iter: I) {
        for path in iter {
            self.add_path(path.cube, path.value);
        }
    }
}

impl FromIterator<Path> for Relation {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        let mut relation = Self::new();
        relation.extend(iter);
        relation
    }
}

/// Literals fixing the variables of `order` to the bits of `value`
/// (first variable is the most significant bit).
pub fn cube_of(order: &VarOrder, value: u64) -> impl Iterator<Item = Lit> + '_ {
    let k = order.len();
    order
        .vars()
        .iter()
        .enumerate()
        .map(move |(p, &var)| Lit::new(var, (value >> (k - 1 - p)) & 1 == 1))
}
