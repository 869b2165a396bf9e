//! # sparse-rs: Sparse transition matrices for probabilistic model checking
//!
//! **`sparse-rs`** turns a symbolically encoded transition relation into an
//! explicit, row-major sparse matrix and answers per-state queries against it:
//! transition probability lookup, successor enumeration and the final-state
//! test used by simulation, steady-state detection and reward computation.
//!
//! ## Storage
//!
//! A [`SparseMatrix`][crate::matrix::SparseMatrix] keeps its entries in one of
//! two forms:
//!
//! - **Plain**: parallel arrays of destination states and weights.
//! - **Compact**: a single `u32` per entry packing the destination together
//!   with an index into a dictionary of distinct weights. Models with few
//!   distinct probabilities (most of them) shrink considerably.
//!
//! The compact form is tried first and silently replaced by the plain one when
//! the dictionary does not fit next to the destination index.
//!
//! Row boundaries are stored either as one byte per row (when no row has more
//! than 255 entries) or as absolute offsets, and are materialized into
//! `lo`/`hi` arrays for constant-time row lookup.
//!
//! ## Basic Usage
//!
//! ```rust
//! use sparse_rs::config::BuildConfig;
//! use sparse_rs::matrix::SparseMatrix;
//!
//! let entries = [(0, 1, 0.4), (0, 2, 0.6), (1, 1, 1.0)];
//! let m = SparseMatrix::build(3, &entries, &BuildConfig::default()).unwrap();
//!
//! assert!(m.is_compact());
//! assert_eq!(m.transition_prob(0, 2).unwrap(), Some(0.6));
//! assert_eq!(m.transition_prob(0, 0).unwrap(), None);
//! assert_eq!(m.successor_states(0).unwrap(), vec![1, 2]);
//! assert!(m.is_final_state(1).unwrap());
//! ```
//!
//! ## Core Components
//!
//! - **[`matrix`]** and **[`query`]**: the sparse matrix and its queries.
//! - **[`nondet`]**: matrices with a choice dimension, for MDPs.
//! - **[`symbolic`]**: building matrices from decision-diagram paths over an
//!   [`Odd`][crate::odd::Odd] state enumeration.
//! - **[`slot`]**: a single replaceable "current matrix".
//! - **[`export`]**: `.tra` text output.

pub mod codec;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod export;
pub mod matrix;
pub mod nondet;
pub mod odd;
pub mod query;
pub mod relation;
pub mod rows;
pub mod slot;
pub mod symbolic;
pub mod types;
pub mod utils;
