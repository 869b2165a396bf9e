//! Sparse matrices for nondeterministic models (MDPs).
//!
//! An [`NdSparseMatrix`] stores one row per (state, choice) pair. The
//! choice-rows of a state are contiguous, and a second row-length encoding
//! over states groups them, exactly as a [`SparseMatrix`] groups entries
//! into rows:
//!
//! ```text
//! state:        0          1     2
//! choice-rows:  [r0 r1]    [r2]  []
//! entries:      r0 -> ..., r1 -> ..., r2 -> ...
//! ```
//!
//! Each choice-row may carry an action label. Labels are optional and are
//! attached after construction.

use std::fmt::{self, Debug};
use std::ops::Range;

use log::{debug, info};

use crate::config::BuildConfig;
use crate::error::{try_vec, Result, SparseError};
use crate::matrix::SparseMatrix;
use crate::query::RowEntries;
use crate::rows::{RowIndex, RowLengths};
use crate::utils::format_memory;

pub struct NdSparseMatrix {
    num_states: usize,
    choices: SparseMatrix,
    groups: RowLengths,
    group_index: RowIndex,
    actions: Option<Vec<Option<u32>>>,
}

impl NdSparseMatrix {
    /// Builds a matrix over `n` states from `(state, choice, destination, weight)`
    /// entries, where `choice` is the local index of the choice within its
    /// state.
    ///
    /// A state has `1 + max(choice)` choice-rows; choices without entries are
    /// empty rows.
    pub fn build(
        n: usize,
        entries: &[(usize, usize, usize, f64)],
        config: &BuildConfig,
    ) -> Result<Self> {
        let mut num_choices = try_vec("choice counts", n)?;
        num_choices.resize(n, 0usize);
        for &(state, choice, _, _) in entries {
            if state >= n {
                return Err(SparseError::StateOutOfRange {
                    state,
                    num_states: n,
                });
            }
            let count = choice.checked_add(1).ok_or(SparseError::ChoiceOutOfRange {
                state,
                choice,
                num_choices: usize::MAX,
            })?;
            num_choices[state] = num_choices[state].max(count);
        }
        Self::build_grouped(&num_choices, entries, config)
    }

    /// Builds a matrix whose state `s` has exactly `num_choices[s]` choice-rows,
    /// some of which may be empty.
    pub fn build_grouped(
        num_choices: &[usize],
        entries: &[(usize, usize, usize, f64)],
        config: &BuildConfig,
    ) -> Result<Self> {
        let n = num_choices.len();
        for &(state, choice, _, _) in entries {
            let Some(&count) = num_choices.get(state) else {
                return Err(SparseError::StateOutOfRange {
                    state,
                    num_states: n,
                });
            };
            if choice >= count {
                return Err(SparseError::ChoiceOutOfRange {
                    state,
                    choice,
                    num_choices: count,
                });
            }
        }
        let total: usize = num_choices.iter().sum();
        debug!("nondeterministic matrix: {} states, {} choice-rows", n, total);

        let groups = RowLengths::from_lengths(num_choices, config.row_encoding)?;
        let group_index = RowIndex::build(&groups)?;
        group_index.check(total)?;

        let mut rows = try_vec("choice-row entries", entries.len())?;
        rows.extend(
            entries
                .iter()
                .map(|&(state, choice, dst, w)| (group_index.lo()[state] + choice, dst, w)),
        );
        let choices = SparseMatrix::build_rect(total, n, &rows, config)?;

        let matrix = Self {
            num_states: n,
            choices,
            groups,
            group_index,
            actions: None,
        };
        info!(
            "ND sparse matrix: {} states, {} choices, {} non-zeros [{}]",
            matrix.num_states,
            matrix.num_choice_rows(),
            matrix.nnz(),
            format_memory(matrix.mem_kb())
        );
        Ok(matrix)
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Total number of choice-rows over all states.
    pub fn num_choice_rows(&self) -> usize {
        self.choices.num_rows()
    }

    pub fn nnz(&self) -> usize {
        self.choices.nnz()
    }

    /// The underlying matrix over choice-rows.
    pub fn matrix(&self) -> &SparseMatrix {
        &self.choices
    }

    /// The state-level grouping of choice-rows.
    pub fn choice_groups(&self) -> &RowLengths {
        &self.groups
    }

    pub fn mem_kb(&self) -> f64 {
        let actions = self.actions.as_ref().map_or(0, |a| a.len() * 8);
        let bytes = self.groups.mem_bytes() + self.group_index.mem_bytes() + actions;
        self.choices.mem_kb() + bytes as f64 / 1024.0
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.num_states {
            return Err(SparseError::StateOutOfRange {
                state,
                num_states: self.num_states,
            });
        }
        Ok(())
    }

    /// Choice-rows of `state`.
    pub fn choice_range(&self, state: usize) -> Result<Range<usize>> {
        self.check_state(state)?;
        Ok(self.group_index.range(state))
    }

    pub fn num_choices(&self, state: usize) -> Result<usize> {
        self.check_state(state)?;
        Ok(self.group_index.len(state))
    }

    fn choice_row(&self, state: usize, choice: usize) -> Result<usize> {
        let rows = self.choice_range(state)?;
        if choice >= rows.len() {
            return Err(SparseError::ChoiceOutOfRange {
                state,
                choice,
                num_choices: rows.len(),
            });
        }
        Ok(rows.start + choice)
    }

    /// `(destination, weight)` entries of the given choice of `state`.
    pub fn choice(&self, state: usize, choice: usize) -> Result<RowEntries<'_>> {
        let row = self.choice_row(state, choice)?;
        self.choices.row(row)
    }

    /// Sets the action labels from `(state, choice, action)` triples.
    ///
    /// Replaces any previous labels. Choice-rows not mentioned stay
    /// unlabelled.
    pub fn set_actions(&mut self, labels: impl IntoIterator<Item = (usize, usize, u32)>) -> Result<()> {
        let total = self.num_choice_rows();
        let mut actions = try_vec("actions", total)?;
        actions.resize(total, None);
        for (state, choice, action) in labels {
            let row = self.choice_row(state, choice)?;
            actions[row] = Some(action);
        }
        debug!(
            "attached {} action labels to {} choice-rows",
            actions.iter().filter(|a| a.is_some()).count(),
            total
        );
        self.actions = Some(actions);
        Ok(())
    }

    /// Action labels per choice-row, if any were attached.
    pub fn actions(&self) -> Option<&[Option<u32>]> {
        self.actions.as_deref()
    }

    /// Action label of the *first* choice of `state`.
    ///
    /// The first choice-row is located through the state-level counts or
    /// starts, and its label is returned whatever the choice argument is. Use
    /// [`choice_action`][Self::choice_action] for the label of a specific
    /// choice. Returns `None` when no labels are attached, when the row is
    /// unlabelled, or when `state` has no choices.
    pub fn action_index(&self, state: usize, _choice: usize) -> Result<Option<u32>> {
        self.check_state(state)?;
        let Some(actions) = &self.actions else {
            return Ok(None);
        };
        if self.group_index.len(state) == 0 {
            return Ok(None);
        }
        let first = self.groups.first_entry(state);
        Ok(actions[first])
    }

    /// Action label of the given choice of `state`.
    pub fn choice_action(&self, state: usize, choice: usize) -> Result<Option<u32>> {
        let row = self.choice_row(state, choice)?;
        Ok(self.actions.as_ref().and_then(|a| a[row]))
    }
}

impl Debug for NdSparseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdSparseMatrix")
            .field("states", &self.num_states)
            .field("choices", &self.choices)
            .field("counts", &self.groups.uses_counts())
            .field("actions", &self.actions.is_some())
            .finish()
    }
}
