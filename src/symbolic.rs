//! Building sparse matrices from symbolic relations.
//!
//! A [`MatrixBuilder`] knows which decision-diagram variables encode the
//! source state (row variables), the destination state (column variables) and,
//! for nondeterministic models, the choice (nondeterminism variables). It
//! expands the paths of a [`Relation`] over their don't-care bits, maps source
//! and destination encodings to dense indices through an [`Odd`], and hands
//! the resulting entries to [`SparseMatrix`] or [`NdSparseMatrix`].
//!
//! Expanded entries are sorted by source, choice and destination. When several
//! paths cover the same entry, the first one wins.
//!
//! # Example
//!
//! ```
//! use sparse_rs::odd::Odd;
//! use sparse_rs::relation::Relation;
//! use sparse_rs::symbolic::MatrixBuilder;
//! use sparse_rs::types::{Lit, VarOrder};
//!
//! let rows = VarOrder::from_ids([1, 3]);
//! let cols = VarOrder::from_ids([2, 4]);
//! let odd = Odd::new(2, [0, 1, 2]);
//!
//! // From state 0 (x1=0, x3=0), move to any state with x2=0.
//! let mut trans = Relation::new();
//! trans.add_path([Lit::from(-1), Lit::from(-3), Lit::from(-2)], 0.5);
//!
//! let m = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap();
//! assert_eq!(m.successor_states(0).unwrap(), vec![0, 1]);
//! ```

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::BuildConfig;
use crate::error::{try_vec, Result, SparseError};
use crate::matrix::SparseMatrix;
use crate::nondet::NdSparseMatrix;
use crate::odd::Odd;
use crate::relation::{Path, Relation};
use crate::types::{Lit, VarOrder};

/// `(source, choice encoding, destination, weight)`
type Expanded = (usize, u64, usize, f64);

/// Fixed bits of one component of a path.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
struct Pattern {
    mask: u64,
    value: u64,
}

impl Pattern {
    /// Sets bit `pos` (counted from the most significant of `width` bits).
    /// Returns `false` if the bit was already fixed to the opposite value.
    fn fix(&mut self, pos: usize, width: usize, positive: bool) -> bool {
        let bit = 1u64 << (width - 1 - pos);
        let value = if positive { bit } else { 0 };
        if self.mask & bit != 0 {
            return self.value & bit == value;
        }
        self.mask |= bit;
        self.value |= value;
        true
    }

    /// All `width`-bit values agreeing with this pattern, in increasing order.
    fn completions(self, width: usize) -> impl Iterator<Item = u64> {
        let full = if width == 0 { 0 } else { u64::MAX >> (64 - width) };
        let free = !self.mask & full;
        let value = self.value;
        let mut sub = Some(0u64);
        std::iter::from_fn(move || {
            let current = sub?;
            sub = if current == free {
                None
            } else {
                Some(current.wrapping_sub(free) & free)
            };
            Some(value | current)
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Component {
    Row,
    Col,
    Nondet,
}

/// Builds sparse matrices from relations over fixed variable orderings.
#[derive(Debug, Clone)]
pub struct MatrixBuilder<'a> {
    rows: &'a VarOrder,
    cols: &'a VarOrder,
    nondet: Option<&'a VarOrder>,
    odd: &'a Odd,
    config: BuildConfig,
}

impl<'a> MatrixBuilder<'a> {
    pub fn new(rows: &'a VarOrder, cols: &'a VarOrder, odd: &'a Odd) -> Self {
        Self {
            rows,
            cols,
            nondet: None,
            odd,
            config: BuildConfig::default(),
        }
    }

    /// Sets the variables encoding nondeterministic choices.
    pub fn nondet(mut self, vars: &'a VarOrder) -> Self {
        self.nondet = Some(vars);
        self
    }

    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_states(&self) -> usize {
        self.odd.num_states()
    }

    fn check_orderings(&self) -> Result<()> {
        if self.cols.len() != self.rows.len() {
            return Err(SparseError::OrderingMismatch {
                expected: self.rows.len(),
                found: self.cols.len(),
            });
        }
        if self.odd.num_bits() != self.rows.len() {
            return Err(SparseError::OrderingMismatch {
                expected: self.rows.len(),
                found: self.odd.num_bits(),
            });
        }
        if let Some(nondet) = self.nondet {
            if nondet.len() > 63 {
                return Err(SparseError::OrderingMismatch {
                    expected: 63,
                    found: nondet.len(),
                });
            }
        }
        Ok(())
    }

    fn classify(&self, lit: Lit) -> Option<(Component, usize, usize)> {
        let var = lit.var();
        if let Some(p) = self.rows.position(var) {
            return Some((Component::Row, p, self.rows.len()));
        }
        if let Some(p) = self.cols.position(var) {
            return Some((Component::Col, p, self.cols.len()));
        }
        let nondet = self.nondet?;
        nondet.position(var).map(|p| (Component::Nondet, p, nondet.len()))
    }

    /// Fixed bits of the row, column and choice components of `path`, or
    /// `None` if the cube is contradictory.
    fn patterns(&self, path: &Path) -> Result<Option<[Pattern; 3]>> {
        let mut patterns = [Pattern::default(); 3];
        for &lit in &path.cube {
            let (component, pos, width) = self
                .classify(lit)
                .ok_or(SparseError::UnknownVariable(lit.var()))?;
            if !patterns[component as usize].fix(pos, width, lit.is_positive()) {
                return Ok(None);
            }
        }
        Ok(Some(patterns))
    }

    fn nondet_width(&self) -> usize {
        self.nondet.map_or(0, |v| v.len())
    }

    /// Expands every path of `relation` into sorted, duplicate-free entries.
    ///
    /// With `with_cols == false` the destination is ignored and reported as 0.
    fn expand(&self, relation: &Relation, with_cols: bool) -> Result<Vec<Expanded>> {
        self.check_orderings()?;
        let width = self.nondet_width();
        let mut entries = Vec::new();
        for path in relation.paths() {
            let Some([row, col, nd]) = self.patterns(path)? else {
                debug!("skipping contradictory path {}", path);
                continue;
            };
            for (src, _) in self.odd.matching(row.mask, row.value) {
                for choice in nd.completions(width) {
                    if with_cols {
                        for (dst, _) in self.odd.matching(col.mask, col.value) {
                            entries.push((src, choice, dst, path.value));
                        }
                    } else {
                        entries.push((src, choice, 0, path.value));
                    }
                }
            }
        }

        entries.sort_by_key(|&(src, choice, dst, _)| (src, choice, dst));
        let before = entries.len();
        entries.dedup_by_key(|&mut (src, choice, dst, _)| (src, choice, dst));
        if entries.len() < before {
            warn!(
                "{} entries covered by more than one path were dropped",
                before - entries.len()
            );
        }
        Ok(entries)
    }

    /// Replaces the weights of `trans` by those of `rewards`, dropping entries
    /// without a reward.
    fn combine(&self, trans: &[Expanded], rewards: &Relation) -> Result<Vec<Expanded>> {
        let rewards: HashMap<(usize, u64, usize), f64> = self
            .expand(rewards, true)?
            .into_iter()
            .map(|(src, choice, dst, w)| ((src, choice, dst), w))
            .collect();
        let combined: Vec<_> = trans
            .iter()
            .filter_map(|&(src, choice, dst, _)| {
                rewards
                    .get(&(src, choice, dst))
                    .map(|&w| (src, choice, dst, w))
            })
            .collect();
        debug!("sub-matrix keeps {} rewarded entries", combined.len());
        Ok(combined)
    }

    fn to_matrix(&self, entries: &[Expanded]) -> Result<SparseMatrix> {
        if self.nondet_width() > 0 {
            warn!("building a deterministic matrix; choices are merged per state");
        }
        let entries: Vec<_> = entries.iter().map(|&(src, _, dst, w)| (src, dst, w)).collect();
        SparseMatrix::build(self.num_states(), &entries, &self.config)
    }

    /// Builds the matrix of `trans`.
    pub fn build(&self, trans: &Relation) -> Result<SparseMatrix> {
        let entries = self.expand(trans, true)?;
        self.to_matrix(&entries)
    }

    /// Builds a matrix with the structure of `trans` and the weights of
    /// `rewards`. Transitions without a reward are left out.
    pub fn build_sub(&self, trans: &Relation, rewards: &Relation) -> Result<SparseMatrix> {
        let entries = self.expand(trans, true)?;
        let entries = self.combine(&entries, rewards)?;
        self.to_matrix(&entries)
    }

    /// Local choice index of every `(state, choice encoding)` pair present in
    /// `entries`. Choices of a state are numbered by increasing encoding.
    fn choice_numbering(entries: &[Expanded]) -> HashMap<(usize, u64), usize> {
        let mut numbering = HashMap::new();
        let mut last: Option<(usize, u64)> = None;
        let mut next = 0;
        for &(src, choice, _, _) in entries {
            match last {
                Some((s, c)) if s == src && c == choice => continue,
                Some((s, _)) if s == src => next += 1,
                _ => next = 0,
            }
            numbering.insert((src, choice), next);
            last = Some((src, choice));
        }
        numbering
    }

    /// Builds a nondeterministic matrix from `entries`, with the choices of
    /// each state taken from `grouping`. Every entry must belong to a choice
    /// present in `grouping`.
    fn to_nd_matrix(&self, grouping: &[Expanded], entries: &[Expanded]) -> Result<NdSparseMatrix> {
        let numbering = Self::choice_numbering(grouping);
        let mut num_choices = try_vec("choice counts", self.num_states())?;
        num_choices.resize(self.num_states(), 0usize);
        for (&(src, _), &k) in &numbering {
            num_choices[src] = num_choices[src].max(k + 1);
        }
        let entries: Vec<_> = entries
            .iter()
            .map(|&(src, choice, dst, w)| (src, numbering[&(src, choice)], dst, w))
            .collect();
        NdSparseMatrix::build_grouped(&num_choices, &entries, &self.config)
    }

    /// Builds the nondeterministic matrix of `trans`.
    pub fn build_nd(&self, trans: &Relation) -> Result<NdSparseMatrix> {
        let entries = self.expand(trans, true)?;
        self.to_nd_matrix(&entries, &entries)
    }

    /// Nondeterministic counterpart of [`build_sub`][Self::build_sub].
    ///
    /// Choices are those of `trans`, so choice `k` of a state here is choice
    /// `k` of the same state in [`build_nd`][Self::build_nd]. A choice without
    /// any rewarded transition is an empty choice-row.
    pub fn build_sub_nd(&self, trans: &Relation, rewards: &Relation) -> Result<NdSparseMatrix> {
        let trans = self.expand(trans, true)?;
        let entries = self.combine(&trans, rewards)?;
        self.to_nd_matrix(&trans, &entries)
    }

    /// Attaches action labels to a matrix built from `trans` by
    /// [`build_nd`][Self::build_nd].
    ///
    /// `actions` is a relation over row and nondeterminism variables whose
    /// values are 1-based action labels; column literals are ignored. Choices
    /// not covered by `actions` stay unlabelled.
    pub fn add_actions(&self, matrix: &mut NdSparseMatrix, trans: &Relation, actions: &Relation) -> Result<()> {
        let numbering = Self::choice_numbering(&self.expand(trans, true)?);
        let without_cols: Relation = actions
            .paths()
            .iter()
            .map(|path| Path {
                cube: path
                    .cube
                    .iter()
                    .copied()
                    .filter(|&lit| self.cols.position(lit.var()).is_none())
                    .collect(),
                value: path.value,
            })
            .collect();

        let mut labels = Vec::new();
        for (src, choice, _, value) in self.expand(&without_cols, false)? {
            if !(value >= 1.0 && value.fract() == 0.0 && value <= u32::MAX as f64) {
                return Err(SparseError::InvalidActionLabel { value });
            }
            match numbering.get(&(src, choice)) {
                Some(&k) => labels.push((src, k, value as u32 - 1)),
                None => debug!("no choice {} in state {} for action {}", choice, src, value),
            }
        }
        matrix.set_actions(labels)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Var;

    #[test]
    fn test_pattern_completions() {
        let p = Pattern {
            mask: 0b010,
            value: 0b010,
        };
        let all: Vec<_> = p.completions(3).collect();
        assert_eq!(all, vec![0b010, 0b011, 0b110, 0b111]);

        let fixed = Pattern {
            mask: 0b11,
            value: 0b01,
        };
        assert_eq!(fixed.completions(2).collect::<Vec<_>>(), vec![0b01]);
        assert_eq!(Pattern::default().completions(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_pattern_contradiction() {
        let mut p = Pattern::default();
        assert!(p.fix(0, 2, true));
        assert!(p.fix(0, 2, true));
        assert!(!p.fix(0, 2, false));
        assert_eq!(p, Pattern { mask: 0b10, value: 0b10 });
    }

    fn orders() -> (VarOrder, VarOrder) {
        (VarOrder::from_ids([1, 3]), VarOrder::from_ids([2, 4]))
    }

    #[test]
    fn test_dont_cares_expand() {
        let (rows, cols) = orders();
        let odd = Odd::full(2);
        let mut trans = Relation::new();
        // Every state with x3=1 goes to state 0.
        trans.add_path([Lit::from(3), Lit::from(-2), Lit::from(-4)], 1.0);
        let m = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.transition_prob(1, 0).unwrap(), Some(1.0));
        assert_eq!(m.transition_prob(3, 0).unwrap(), Some(1.0));
        assert!(m.is_final_state(0).unwrap());
    }

    #[test]
    fn test_unreachable_skipped() {
        let (rows, cols) = orders();
        let odd = Odd::new(2, [0, 3]);
        let trans = Relation::from_transitions(&rows, &cols, [(0, 3, 0.5), (0, 1, 0.5), (3, 0, 1.0)]);
        let m = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap();
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.transition_prob(0, 1).unwrap(), Some(0.5));
        assert_eq!(m.transition_prob(1, 0).unwrap(), Some(1.0));
    }

    #[test]
    fn test_overlapping_paths_first_wins() {
        let (rows, cols) = orders();
        let odd = Odd::full(2);
        let mut trans = Relation::new();
        trans.add_path([Lit::from(-1), Lit::from(-3), Lit::from(-2), Lit::from(-4)], 0.25);
        trans.add_path([Lit::from(-1), Lit::from(-3)], 0.75);
        let m = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap();
        assert_eq!(m.successor_states(0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(m.transition_prob(0, 0).unwrap(), Some(0.25));
        assert_eq!(m.transition_prob(0, 2).unwrap(), Some(0.75));
    }

    #[test]
    fn test_contradictory_path_skipped() {
        let (rows, cols) = orders();
        let odd = Odd::full(2);
        let mut trans = Relation::new();
        trans.add_path([Lit::from(1), Lit::from(-1)], 1.0);
        let m = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap();
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_unknown_variable() {
        let (rows, cols) = orders();
        let odd = Odd::full(2);
        let mut trans = Relation::new();
        trans.add_path([Lit::from(7)], 1.0);
        let err = MatrixBuilder::new(&rows, &cols, &odd).build(&trans).unwrap_err();
        assert!(matches!(err, SparseError::UnknownVariable(v) if v == Var::new(7)));
    }

    #[test]
    fn test_ordering_mismatch() {
        let rows = VarOrder::from_ids([1, 3]);
        let cols = VarOrder::from_ids([2]);
        let odd = Odd::full(2);
        let err = MatrixBuilder::new(&rows, &cols, &odd)
            .build(&Relation::new())
            .unwrap_err();
        assert!(matches!(err, SparseError::OrderingMismatch { expected: 2, found: 1 }));

        let cols = VarOrder::from_ids([2, 4]);
        let odd = Odd::full(3);
        let err = MatrixBuilder::new(&rows, &cols, &odd)
            .build(&Relation::new())
            .unwrap_err();
        assert!(matches!(err, SparseError::OrderingMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_build_sub() {
        let (rows, cols) = orders();
        let odd = Odd::full(2);
        let trans = Relation::from_transitions(&rows, &cols, [(0, 1, 0.5), (0, 2, 0.5), (1, 1, 1.0)]);
        let rewards = Relation::from_transitions(&rows, &cols, [(0, 1, 3.0), (1, 1, 2.0), (2, 2, 9.0)]);
        let m = MatrixBuilder::new(&rows, &cols, &odd)
            .build_sub(&trans, &rewards)
            .unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.transition_prob(0, 1).unwrap(), Some(3.0));
        assert_eq!(m.transition_prob(0, 2).unwrap(), None);
        assert_eq!(m.transition_prob(1, 1).unwrap(), Some(2.0));
        assert_eq!(m.transition_prob(2, 2).unwrap(), None);
    }

    // One state bit (row x1, col x2), one choice bit (x5).
    fn mdp() -> (VarOrder, VarOrder, VarOrder, Odd, Relation) {
        let rows = VarOrder::from_ids([1]);
        let cols = VarOrder::from_ids([2]);
        let nondet = VarOrder::from_ids([5]);
        let odd = Odd::full(1);
        let mut trans = Relation::new();
        // State 0, choice x5=1: stay. Choice x5=0: go to 1.
        trans.add_path([Lit::from(-1), Lit::from(5), Lit::from(-2)], 1.0);
        trans.add_path([Lit::from(-1), Lit::from(-5), Lit::from(2)], 1.0);
        // State 1, choice x5=1 only: split.
        trans.add_path([Lit::from(1), Lit::from(5)], 0.5);
        (rows, cols, nondet, odd, trans)
    }

    #[test]
    fn test_build_nd() {
        let (rows, cols, nondet, odd, trans) = mdp();
        let m = MatrixBuilder::new(&rows, &cols, &odd)
            .nondet(&nondet)
            .build_nd(&trans)
            .unwrap();
        assert_eq!(m.num_states(), 2);
        assert_eq!(m.num_choices(0).unwrap(), 2);
        assert_eq!(m.num_choices(1).unwrap(), 1);
        // Choices ordered by encoding: x5=0 first.
        assert_eq!(m.choice(0, 0).unwrap().collect::<Vec<_>>(), vec![(1, 1.0)]);
        assert_eq!(m.choice(0, 1).unwrap().collect::<Vec<_>>(), vec![(0, 1.0)]);
        assert_eq!(
            m.choice(1, 0).unwrap().collect::<Vec<_>>(),
            vec![(0, 0.5), (1, 0.5)]
        );
    }

    #[test]
    fn test_nondet_vars_require_ordering() {
        let (rows, cols, _, odd, trans) = mdp();
        let err = MatrixBuilder::new(&rows, &cols, &odd).build_nd(&trans).unwrap_err();
        assert!(matches!(err, SparseError::UnknownVariable(v) if v == Var::new(5)));
    }

    #[test]
    fn test_add_actions() {
        let (rows, cols, nondet, odd, trans) = mdp();
        let builder = MatrixBuilder::new(&rows, &cols, &odd).nondet(&nondet);
        let mut m = builder.build_nd(&trans).unwrap();

        let mut actions = Relation::new();
        // State 0, choice x5=1 -> label 2; state 1, choice x5=1 -> label 1.
        actions.add_path([Lit::from(-1), Lit::from(5), Lit::from(-2)], 2.0);
        actions.add_path([Lit::from(1), Lit::from(5)], 1.0);
        // State 1, choice x5=0 does not exist.
        actions.add_path([Lit::from(1), Lit::from(-5)], 3.0);
        builder.add_actions(&mut m, &trans, &actions).unwrap();

        assert_eq!(m.choice_action(0, 0).unwrap(), None);
        assert_eq!(m.choice_action(0, 1).unwrap(), Some(1));
        assert_eq!(m.choice_action(1, 0).unwrap(), Some(0));
        // First choice of state 0 is unlabelled.
        assert_eq!(m.action_index(0, 1).unwrap(), None);
        assert_eq!(m.action_index(1, 0).unwrap(), Some(0));
    }

    #[test]
    fn test_invalid_action_label() {
        let (rows, cols, nondet, odd, trans) = mdp();
        let builder = MatrixBuilder::new(&rows, &cols, &odd).nondet(&nondet);
        let mut m = builder.build_nd(&trans).unwrap();
        let mut actions = Relation::new();
        actions.add_path([Lit::from(1)], 1.5);
        let err = builder.add_actions(&mut m, &trans, &actions).unwrap_err();
        assert!(matches!(err, SparseError::InvalidActionLabel { value } if value == 1.5));
        assert!(m.actions().is_none());
    }

    #[test]
    fn test_build_sub_nd() {
        let (rows, cols, nondet, odd, trans) = mdp();
        let mut rewards = Relation::new();
        // Reward only the split choice of state 1, towards state 0.
        rewards.add_path([Lit::from(1), Lit::from(5), Lit::from(-2)], 4.0);
        let m = MatrixBuilder::new(&rows, &cols, &odd)
            .nondet(&nondet)
            .build_sub_nd(&trans, &rewards)
            .unwrap();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.num_choices(0).unwrap(), 2);
        assert_eq!(m.choice(0, 0).unwrap().len(), 0);
        assert_eq!(m.choice(0, 1).unwrap().len(), 0);
        assert_eq!(m.choice(1, 0).unwrap().collect::<Vec<_>>(), vec![(0, 4.0)]);
    }

    #[test]
    fn test_sub_nd_keeps_choice_alignment() {
        let (rows, cols, nondet, odd, trans) = mdp();
        let mut rewards = Relation::new();
        // Reward only the second choice of state 0 (x5=1, stay in 0).
        rewards.add_path([Lit::from(-1), Lit::from(5), Lit::from(-2)], 4.0);
        let builder = MatrixBuilder::new(&rows, &cols, &odd).nondet(&nondet);
        let full = builder.build_nd(&trans).unwrap();
        let sub = builder.build_sub_nd(&trans, &rewards).unwrap();

        for state in 0..2 {
            assert_eq!(sub.num_choices(state).unwrap(), full.num_choices(state).unwrap());
            assert_eq!(sub.choice_range(state).unwrap(), full.choice_range(state).unwrap());
        }
        assert_eq!(full.choice(0, 0).unwrap().collect::<Vec<_>>(), vec![(1, 1.0)]);
        assert_eq!(sub.choice(0, 0).unwrap().len(), 0);
        assert_eq!(full.choice(0, 1).unwrap().collect::<Vec<_>>(), vec![(0, 1.0)]);
        assert_eq!(sub.choice(0, 1).unwrap().collect::<Vec<_>>(), vec![(0, 4.0)]);

        // Every rewarded destination is a destination of the same choice.
        for state in 0..2 {
            for k in 0..full.num_choices(state).unwrap() {
                let dsts: Vec<_> = full.choice(state, k).unwrap().map(|(d, _)| d).collect();
                assert!(sub.choice(state, k).unwrap().all(|(d, _)| dsts.contains(&d)));
            }
        }
    }
}
