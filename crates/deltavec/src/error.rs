#![forbid(unsafe_code)]

//! Errors raised by mutating operations.
//!
//! Every failure is reported synchronously to the caller of the offending
//! operation; nothing is ever delivered through the snapshot or event
//! channels. A failed call leaves the sequence untouched and the instance
//! fully usable, so re-invoking after correcting the arguments is always
//! safe.

use std::ops::Range;

/// Precondition violations from mutating operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// An index was outside the valid bounds for the operation.
    IndexOutOfBounds { index: usize, len: usize },
    /// A range had `start > end` or extended past the sequence length.
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },
    /// The operation requires a non-empty sequence.
    Empty,
}

impl std::fmt::Display for MutationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::RangeOutOfBounds { start, end, len } => {
                write!(f, "range {start}..{end} out of bounds for length {len}")
            }
            Self::Empty => write!(f, "operation requires a non-empty sequence"),
        }
    }
}

impl std::error::Error for MutationError {}

impl MutationError {
    /// Check that `range` is a valid contiguous sub-range of a sequence
    /// of length `len` (including the empty range at either end).
    pub(crate) fn check_range(range: &Range<usize>, len: usize) -> Result<(), Self> {
        if range.start > range.end || range.end > len {
            return Err(Self::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }
}
