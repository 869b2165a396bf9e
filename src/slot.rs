//! A replaceable "current matrix" slot.
//!
//! [`MatrixSlot`] holds at most one matrix at a time. Building into the slot
//! drops the previous matrix first; [`free`][MatrixSlot::free] empties it.
//! Queries against an empty slot fail with [`SparseError::NoMatrix`].
//!
//! Handles returned by [`current`][MatrixSlot::current] are reference-counted
//! and stay valid after the slot moves on to another matrix.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, error};

use crate::error::{Result, SparseError};
use crate::matrix::SparseMatrix;
use crate::relation::Relation;
use crate::symbolic::MatrixBuilder;

#[derive(Debug, Default)]
pub struct MatrixSlot {
    current: RefCell<Option<Rc<SparseMatrix>>>,
    last_error: RefCell<Option<String>>,
}

impl MatrixSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matrix with `build` and installs it.
    ///
    /// The previous matrix is released before building. On failure the slot
    /// stays empty and the error message is recorded.
    pub fn build_with<F>(&self, build: F) -> Result<Rc<SparseMatrix>>
    where
        F: FnOnce() -> Result<SparseMatrix>,
    {
        self.free();
        let matrix = build().map_err(|e| {
            error!("sparse matrix construction failed: {}", e);
            e
        });
        self.record(matrix).map(|m| self.install(m))
    }

    /// Records the message of a failed operation as the last error.
    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            *self.last_error.borrow_mut() = Some(e.to_string());
        }
        result
    }

    /// Builds the matrix of `trans` into the slot.
    pub fn build(&self, builder: &MatrixBuilder<'_>, trans: &Relation) -> Result<Rc<SparseMatrix>> {
        self.build_with(|| builder.build(trans))
    }

    /// Builds the reward sub-matrix of `trans` into the slot.
    pub fn build_sub(
        &self,
        builder: &MatrixBuilder<'_>,
        trans: &Relation,
        rewards: &Relation,
    ) -> Result<Rc<SparseMatrix>> {
        self.build_with(|| builder.build_sub(trans, rewards))
    }

    /// Installs an already built matrix, replacing the current one.
    pub fn install(&self, matrix: SparseMatrix) -> Rc<SparseMatrix> {
        let matrix = Rc::new(matrix);
        if self.current.replace(Some(Rc::clone(&matrix))).is_some() {
            debug!("replaced current sparse matrix");
        }
        matrix
    }

    /// Releases the current matrix, if any.
    pub fn free(&self) {
        if self.current.borrow_mut().take().is_some() {
            debug!("released current sparse matrix");
        }
    }

    pub fn is_built(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn current(&self) -> Result<Rc<SparseMatrix>> {
        self.current.borrow().clone().ok_or(SparseError::NoMatrix)
    }

    /// Message of the most recent failed build or query.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn transition_prob(&self, src: usize, dst: usize) -> Result<Option<f64>> {
        self.record(self.current().and_then(|m| m.transition_prob(src, dst)))
    }

    pub fn successor_states(&self, src: usize) -> Result<Vec<usize>> {
        self.record(self.current().and_then(|m| m.successor_states(src)))
    }

    pub fn is_final_state(&self, src: usize) -> Result<bool> {
        self.record(self.current().and_then(|m| m.is_final_state(src)))
    }
}
