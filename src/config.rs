//! Build-time configuration of sparse matrices.

use crate::error::{Result, SparseError};

/// Which row-length encoding to use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RowEncoding {
    /// Counts when every row has at most 255 entries, starts otherwise.
    #[default]
    Auto,
    /// Force one byte per row. Fails if some row is longer than 255.
    Counts,
    /// Force `n + 1` absolute offsets.
    Starts,
}

/// Configuration options for building sparse matrices.
///
/// # Examples
///
/// ```
/// use sparse_rs::config::{BuildConfig, RowEncoding};
///
/// let config = BuildConfig::default()
///     .with_compact(false)
///     .with_row_encoding(RowEncoding::Starts);
/// assert!(!config.compact);
/// assert_eq!(config.column_bits, 32);
/// ```
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Try the compacted (dictionary) form first (default: true)
    pub compact: bool,
    /// Total width of a packed column entry, in bits (default: 32)
    pub column_bits: u32,
    /// Row-length encoding policy (default: auto)
    pub row_encoding: RowEncoding,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compact: true,
            column_bits: 32,
            row_encoding: RowEncoding::Auto,
        }
    }
}

impl BuildConfig {
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_column_bits(mut self, bits: u32) -> Self {
        self.column_bits = bits;
        self
    }

    pub fn with_row_encoding(mut self, row_encoding: RowEncoding) -> Self {
        self.row_encoding = row_encoding;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(2..=32).contains(&self.column_bits) {
            return Err(SparseError::InvalidColumnWidth(self.column_bits));
        }
        Ok(())
    }
}
