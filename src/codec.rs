//! Packed column entries of the compacted storage form.
//!
//! A compacted column entry stores a destination state and an index into the
//! value dictionary in a single word:
//!
//! ```text
//! raw = (destination << shift) | dictionary_index
//! ```
//!
//! The low `shift` bits hold the dictionary index, the remaining
//! `column_bits - shift` bits hold the destination.

/// Number of bits required to represent every index in `0..count`.
pub fn bits_for(count: usize) -> u32 {
    if count <= 1 {
        0
    } else {
        usize::BITS - (count - 1).leading_zeros()
    }
}

/// Encoder/decoder for packed column entries.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ColumnCodec {
    shift: u32,
    mask: u32,
}

/// Outcome of checking whether a dictionary can be packed next to the
/// destination field.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fit {
    Fits(ColumnCodec),
    TooWide {
        /// Bits needed for the dictionary index.
        dictionary_bits: u32,
        /// Bits needed for the destination index.
        state_bits: u32,
        /// Bits available.
        column_bits: u32,
    },
}

impl Fit {
    pub fn codec(self) -> Option<ColumnCodec> {
        match self {
            Fit::Fits(codec) => Some(codec),
            Fit::TooWide { .. } => None,
        }
    }
}

impl ColumnCodec {
    /// Checks whether `num_values` dictionary entries and destinations in
    /// `0..num_states` can share a `column_bits`-wide entry.
    ///
    /// Both fields get at least one bit.
    pub fn fit(num_states: usize, num_values: usize, column_bits: u32) -> Fit {
        let dictionary_bits = bits_for(num_values).max(1);
        let state_bits = bits_for(num_states).max(1);
        if column_bits > 32 || dictionary_bits + state_bits > column_bits {
            return Fit::TooWide {
                dictionary_bits,
                state_bits,
                column_bits,
            };
        }
        Fit::Fits(ColumnCodec {
            shift: dictionary_bits,
            mask: (1u32 << dictionary_bits) - 1,
        })
    }

    pub fn shift(self) -> u32 {
        self.shift
    }

    pub fn mask(self) -> u32 {
        self.mask
    }

    /// Number of distinct values addressable by the dictionary field.
    pub fn capacity(self) -> usize {
        1usize << self.shift
    }

    #[inline]
    pub fn encode(self, destination: u32, value_index: u32) -> u32 {
        debug_assert!(value_index <= self.mask);
        (destination << self.shift) | value_index
    }

    #[inline]
    pub fn destination(self, raw: u32) -> u32 {
        raw >> self.shift
    }

    #[inline]
    pub fn value_index(self, raw: u32) -> u32 {
        raw & self.mask
    }

    #[inline]
    pub fn decode(self, raw: u32) -> (u32, u32) {
        (self.destination(raw), self.value_index(raw))
    }
}
