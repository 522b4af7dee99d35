#![forbid(unsafe_code)]

//! Change descriptions for sequence mutations.
//!
//! A [`ChangeSet`] records exactly which positions one committed mutation
//! touched, as three disjoint index lists: inserted, deleted, updated.
//! Consumers (e.g. a list renderer) can apply the reported indices
//! incrementally instead of diffing two full snapshots.
//!
//! # Invariants
//!
//! 1. At least one of the three lists is non-empty. A no-op mutation never
//!    produces a `ChangeSet`; constructors return `None` instead.
//! 2. Indices within each list are ascending.
//! 3. Inserted indices are post-mutation positions; deleted indices are
//!    pre-mutation positions.
//!
//! # Index arithmetic
//!
//! All contiguous-range replacements (splice, range assignment, and
//! predicate-based removal, which is a whole-range splice) share one
//! formula, implemented by [`ChangeSet::for_splice`]:
//!
//! ```text
//! inserted = range.start .. range.start + (new_len - old_len) + range.len()
//! deleted  = range.start .. range.end
//! ```
//!
//! The inserted range is reported literally, not minimized: replacing a
//! 3-element range with 1 element still reports a 1-wide inserted range at
//! `range.start` plus the full 3-wide deleted range. Consumers rely on the
//! reported shape being exactly this.

use std::ops::Range;

/// Which positions a single committed mutation touched.
///
/// Constructed by the mutating operations of
/// [`ObservableVec`](crate::vec::ObservableVec) and delivered through its
/// event channel. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSet {
    inserted: Vec<usize>,
    deleted: Vec<usize>,
    updated: Vec<usize>,
}

impl ChangeSet {
    /// A change that inserted the given half-open index range.
    ///
    /// Returns `None` for an empty range (no event).
    #[must_use]
    pub fn for_insert(range: Range<usize>) -> Option<Self> {
        if range.is_empty() {
            return None;
        }
        Some(Self {
            inserted: range.collect(),
            deleted: Vec::new(),
            updated: Vec::new(),
        })
    }

    /// A change that deleted the given half-open index range.
    ///
    /// Indices are pre-mutation positions. Returns `None` for an empty
    /// range.
    #[must_use]
    pub fn for_delete(range: Range<usize>) -> Option<Self> {
        if range.is_empty() {
            return None;
        }
        Some(Self {
            inserted: Vec::new(),
            deleted: range.collect(),
            updated: Vec::new(),
        })
    }

    /// A change that updated a single index in place.
    #[must_use]
    pub fn for_update(index: usize) -> Self {
        Self {
            inserted: Vec::new(),
            deleted: Vec::new(),
            updated: vec![index],
        }
    }

    /// The shared splice formula: the change produced by replacing
    /// `range` (within a sequence of `old_len` elements) such that the
    /// sequence now holds `new_len` elements.
    ///
    /// Reports `inserted = range.start .. range.start + (new_len -
    /// old_len) + range.len()` and `deleted = range`, literally. Returns
    /// `None` when both lists would be empty (empty range replaced by
    /// nothing).
    #[must_use]
    pub fn for_splice(old_len: usize, new_len: usize, range: Range<usize>) -> Option<Self> {
        // new_len = old_len - range.len() + replacement_len, so this sum
        // never underflows.
        let inserted_len = new_len + range.len() - old_len;
        let inserted: Vec<usize> = (range.start..range.start + inserted_len).collect();
        let deleted: Vec<usize> = range.collect();
        if inserted.is_empty() && deleted.is_empty() {
            return None;
        }
        Some(Self {
            inserted,
            deleted,
            updated: Vec::new(),
        })
    }

    /// Post-mutation positions of newly inserted elements, ascending.
    #[must_use]
    pub fn inserted(&self) -> &[usize] {
        &self.inserted
    }

    /// Pre-mutation positions of removed elements, ascending.
    #[must_use]
    pub fn deleted(&self) -> &[usize] {
        &self.deleted
    }

    /// Positions of elements replaced in place, ascending.
    #[must_use]
    pub fn updated(&self) -> &[usize] {
        &self.updated
    }

    /// Total number of reported indices across all three lists.
    ///
    /// Always at least 1.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
