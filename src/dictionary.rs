//! Deduplication of transition weights for the compacted storage form.

use std::collections::HashMap;

use crate::codec::{ColumnCodec, Fit};

/// Ordered set of distinct weights, in first-seen order.
///
/// Weights are compared by bit pattern, so the dictionary always hands back
/// exactly the value that was inserted. `-0.0` and `0.0` are merged.
#[derive(Debug, Clone, Default)]
pub struct ValueDictionary {
    values: Vec<f64>,
    index: HashMap<u64, u32>,
}

fn key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl ValueDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from `values`, returning it together with the
    /// dictionary index of every occurrence.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> (Self, Vec<u32>) {
        let mut dict = Self::new();
        let indices = values.into_iter().map(|v| dict.insert(v)).collect();
        (dict, indices)
    }

    /// Returns the index of `value`, adding it if it is new.
    pub fn insert(&mut self, value: f64) -> u32 {
        let next = self.values.len() as u32;
        let i = *self.index.entry(key(value)).or_insert(next);
        if i == next {
            self.values.push(value);
        }
        i
    }

    pub fn get(&self, index: u32) -> Option<f64> {
        self.values.get(index as usize).copied()
    }

    pub fn index_of(&self, value: f64) -> Option<u32> {
        self.index.get(&key(value)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Checks whether this dictionary can be packed next to destinations in
    /// `0..num_states` within `column_bits`.
    pub fn fit(&self, num_states: usize, column_bits: u32) -> Fit {
        ColumnCodec::fit(num_states, self.len(), column_bits)
    }
}
