#![forbid(unsafe_code)]

//! Thread-safe observable vector with exact-diff change notification.
//!
//! [`ObservableVec<T>`] behaves like a shared `Vec<T>` whose every
//! structural change is described precisely to observers: after each
//! committed mutation it publishes the full new contents on a snapshot
//! channel and a [`ChangeSet`] naming the touched indices on an event
//! channel.
//!
//! # Concurrency
//!
//! One mutex guards the storage and the lazily created channel handles.
//! The critical section covers only the in-memory edit and index
//! computation; channel notification happens outside it, so a slow
//! subscriber never blocks a concurrent mutation's commit. Publication is
//! still totally ordered: each event-producing mutation takes a ticket
//! inside the critical section and a condvar gate releases publications in
//! ticket order, snapshot before event within each mutation.
//!
//! # Read consistency policy
//!
//! Reads (`len`, `get`, `snapshot`, `iter`, ...) briefly acquire the same
//! lock and copy out, so they always observe a fully committed state and
//! never a mid-edit one. [`ObservableVec::iter`] iterates a point-in-time
//! snapshot taken when it is called; call it again to observe later
//! mutations.
//!
//! # Invariants
//!
//! 1. Every committed structural change publishes exactly one snapshot
//!    and one [`ChangeSet`] (if the respective channel exists); no-op
//!    mutations publish nothing.
//! 2. Subscribers observe snapshots and events in commit order, and for
//!    one mutation the snapshot always precedes its event.
//! 3. A failed precondition leaves the storage byte-for-byte unchanged
//!    and publishes nothing.

use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::change::ChangeSet;
use crate::channel::{EventHub, LatestCell, lock_unpoisoned};
use crate::error::MutationError;

/// Releases snapshot/event publications in commit order.
///
/// Tickets are issued under the state lock; waiting happens after it is
/// released, so a slow subscriber delays later publications but never a
/// commit.
struct PublishGate {
    turn: Mutex<u64>,
    ready: Condvar,
}

impl PublishGate {
    fn new() -> Self {
        Self {
            turn: Mutex::new(0),
            ready: Condvar::new(),
        }
    }

    fn wait_for(&self, ticket: u64) {
        let mut turn = lock_unpoisoned(&self.turn);
        while *turn != ticket {
            turn = self.ready.wait(turn).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn advance(&self) {
        *lock_unpoisoned(&self.turn) += 1;
        self.ready.notify_all();
    }
}

/// Mutex-guarded interior: storage plus the lazily created channels.
struct State<T> {
    items: Vec<T>,
    snapshots: Option<Arc<LatestCell<Vec<T>>>>,
    events: Option<Arc<EventHub<ChangeSet>>>,
    /// Publication tickets issued so far.
    tickets: u64,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    gate: PublishGate,
}

/// A shared, observable, growable sequence.
///
/// Cloning an `ObservableVec` creates a new handle to the **same**
/// storage and channels; there is no value-copy of the observability
/// state. Elements must be `Clone` because snapshots hand full copies of
/// the contents to subscribers.
pub struct ObservableVec<T> {
    shared: Arc<Shared<T>>,
}

// Manual Clone: shares the same Arc.
impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ObservableVec")
            .field("items", &state.items)
            .field("snapshot_channel", &state.snapshots.is_some())
            .field("event_channel", &state.events.is_some())
            .finish()
    }
}

impl<T> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for ObservableVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> ObservableVec<T> {
    /// Create an empty sequence with no channels attached.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a sequence owning `items`. No channels are attached.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items,
                    snapshots: None,
                    events: None,
                    tickets: 0,
                }),
                gate: PublishGate::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        lock_unpoisoned(&self.shared.state)
    }

    /// Number of elements currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the sequence holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// The range of currently valid element indices, `0..len`.
    #[must_use]
    pub fn indices(&self) -> Range<usize> {
        0..self.lock().items.len()
    }

    /// Whether any element satisfies `predicate`. Pure query: no
    /// mutation, no event.
    pub fn any(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.lock().items.iter().any(|item| predicate(item))
    }
}

impl<T: Clone> ObservableVec<T> {
    /// Create a sequence holding `count` copies of `value`.
    #[must_use]
    pub fn repeating(value: T, count: usize) -> Self {
        Self::from_vec(vec![value; count])
    }

    // -- observation ------------------------------------------------------

    /// The snapshot channel, created on first call.
    ///
    /// Subscribing to the returned cell immediately replays the current
    /// full contents, then delivers the full contents again after every
    /// committed mutation. Concurrent first calls create the channel
    /// exactly once; every call returns the same handle.
    pub fn snapshots(&self) -> Arc<LatestCell<Vec<T>>> {
        let mut state = self.lock();
        if let Some(cell) = &state.snapshots {
            return Arc::clone(cell);
        }
        let cell = Arc::new(LatestCell::new(state.items.clone()));
        state.snapshots = Some(Arc::clone(&cell));
        debug!(len = state.items.len(), "snapshot channel created");
        cell
    }

    /// The event channel, created on first call.
    ///
    /// Subscribers receive a [`ChangeSet`] for every mutation committed
    /// after they subscribe; there is no replay of earlier events.
    /// Concurrent first calls create the channel exactly once.
    pub fn events(&self) -> Arc<EventHub<ChangeSet>> {
        let mut state = self.lock();
        if let Some(hub) = &state.events {
            return Arc::clone(hub);
        }
        let hub = Arc::new(EventHub::new());
        state.events = Some(Arc::clone(&hub));
        debug!("event channel created");
        hub
    }

    /// Commit path shared by every mutation: consume the state guard,
    /// and if the mutation produced a change and any channel exists,
    /// publish snapshot then event in commit order.
    fn finish(&self, mut state: MutexGuard<'_, State<T>>, change: Option<ChangeSet>, op: &'static str) {
        let Some(change) = change else { return };
        let len = state.items.len();
        let snapshot = state
            .snapshots
            .as_ref()
            .map(|cell| (Arc::clone(cell), state.items.clone()));
        let events = state.events.as_ref().map(Arc::clone);
        if snapshot.is_none() && events.is_none() {
            trace!(op, len, "mutation committed, no observers");
            return;
        }
        let ticket = state.tickets;
        state.tickets += 1;
        drop(state);

        self.shared.gate.wait_for(ticket);
        if let Some((cell, contents)) = snapshot {
            cell.publish(contents);
        }
        if let Some(hub) = events {
            hub.publish(&change);
        }
        self.shared.gate.advance();
        trace!(op, len, touched = change.touched(), "mutation published");
    }

    // -- mutation ---------------------------------------------------------

    /// Append one element. Reports `inserted = [old_len]`.
    pub fn push(&self, value: T) {
        let mut state = self.lock();
        let index = state.items.len();
        state.items.push(value);
        self.finish(state, ChangeSet::for_insert(index..index + 1), "push");
    }

    /// Append every element of `items`. Reports `inserted = [old_len,
    /// new_len)`; an empty iterator publishes nothing.
    pub fn append(&self, items: impl IntoIterator<Item = T>) {
        let added: Vec<T> = items.into_iter().collect();
        if added.is_empty() {
            return;
        }
        let mut state = self.lock();
        let old_len = state.items.len();
        state.items.extend(added);
        let new_len = state.items.len();
        self.finish(state, ChangeSet::for_insert(old_len..new_len), "append");
    }

    /// Insert `value` at `index` (`0 ..= len`). Reports `inserted =
    /// [index]`.
    pub fn insert(&self, index: usize, value: T) -> Result<(), MutationError> {
        let mut state = self.lock();
        let len = state.items.len();
        if index > len {
            return Err(MutationError::IndexOutOfBounds { index, len });
        }
        state.items.insert(index, value);
        self.finish(state, ChangeSet::for_insert(index..index + 1), "insert");
        Ok(())
    }

    /// Insert every element of `items` starting at `index` (`0 ..= len`).
    /// Reports `inserted = [index, index + n)`; an empty iterator passes
    /// the bounds check and publishes nothing.
    pub fn insert_all(
        &self,
        index: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Result<(), MutationError> {
        let added: Vec<T> = items.into_iter().collect();
        let mut state = self.lock();
        let len = state.items.len();
        if index > len {
            return Err(MutationError::IndexOutOfBounds { index, len });
        }
        if added.is_empty() {
            return Ok(());
        }
        let count = added.len();
        state.items.splice(index..index, added);
        self.finish(state, ChangeSet::for_insert(index..index + count), "insert_all");
        Ok(())
    }

    /// Remove and return the last element.
    ///
    /// Reports `deleted = [new_len]`, i.e. the index of the removed tail
    /// slot measured after removal. Fails with [`MutationError::Empty`]
    /// on an empty sequence.
    pub fn remove_last(&self) -> Result<T, MutationError> {
        let mut state = self.lock();
        let Some(value) = state.items.pop() else {
            return Err(MutationError::Empty);
        };
        let index = state.items.len();
        self.finish(state, ChangeSet::for_delete(index..index + 1), "remove_last");
        Ok(value)
    }

    /// Non-failing variant of [`remove_last`](Self::remove_last):
    /// returns `None` on an empty sequence and publishes nothing.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        let value = state.items.pop()?;
        let index = state.items.len();
        self.finish(state, ChangeSet::for_delete(index..index + 1), "pop");
        Some(value)
    }

    /// Remove and return the element at `index` (`0 .. len`). Reports
    /// `deleted = [index]`.
    pub fn remove(&self, index: usize) -> Result<T, MutationError> {
        let mut state = self.lock();
        let len = state.items.len();
        if index >= len {
            return Err(MutationError::IndexOutOfBounds { index, len });
        }
        let value = state.items.remove(index);
        self.finish(state, ChangeSet::for_delete(index..index + 1), "remove");
        Ok(value)
    }

    /// Remove every element. Reports `deleted = [0, old_len)`; an
    /// already-empty sequence publishes nothing.
    pub fn clear(&self) {
        let mut state = self.lock();
        let old_len = state.items.len();
        state.items.clear();
        self.finish(state, ChangeSet::for_delete(0..old_len), "clear");
    }

    /// Replace `range` with the elements of `replacement`.
    ///
    /// Reports the literal splice formula (see
    /// [`ChangeSet::for_splice`]): `inserted = [range.start, range.start
    /// + n)` where `n` is the replacement length, `deleted = range`.
    /// Publishes nothing when both lists are empty.
    pub fn splice(
        &self,
        range: Range<usize>,
        replacement: impl IntoIterator<Item = T>,
    ) -> Result<(), MutationError> {
        let replacement: Vec<T> = replacement.into_iter().collect();
        let mut state = self.lock();
        let old_len = state.items.len();
        MutationError::check_range(&range, old_len)?;
        state.items.splice(range.clone(), replacement);
        let new_len = state.items.len();
        self.finish(state, ChangeSet::for_splice(old_len, new_len, range), "splice");
        Ok(())
    }

    /// Range assignment. Identical semantics and reporting to
    /// [`splice`](Self::splice); kept as a separate entry point to mirror
    /// subscript-style range writes.
    pub fn set_range(
        &self,
        range: Range<usize>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<(), MutationError> {
        self.splice(range, values)
    }

    /// Write `value` at `index`.
    ///
    /// For `index < len` this replaces in place and reports `updated =
    /// [index]`. Writing exactly at `index == len` extends the sequence
    /// instead of failing and reports `inserted = [index]`.
    pub fn set(&self, index: usize, value: T) -> Result<(), MutationError> {
        let mut state = self.lock();
        let len = state.items.len();
        if index == len {
            state.items.push(value);
            self.finish(state, ChangeSet::for_insert(index..index + 1), "set");
            return Ok(());
        }
        if index > len {
            return Err(MutationError::IndexOutOfBounds { index, len });
        }
        state.items[index] = value;
        self.finish(state, Some(ChangeSet::for_update(index)), "set");
        Ok(())
    }

    /// Remove every element satisfying `predicate`; returns how many were
    /// removed.
    ///
    /// The predicate runs exactly once per element present when the call
    /// starts. Reporting uses the whole-range splice formula: `inserted =
    /// [0, new_len)`, `deleted = [0, old_len)`. Removing nothing
    /// publishes nothing.
    pub fn remove_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let mut state = self.lock();
        let old_len = state.items.len();
        state.items.retain(|item| !predicate(item));
        let new_len = state.items.len();
        if new_len == old_len {
            return 0;
        }
        self.finish(
            state,
            ChangeSet::for_splice(old_len, new_len, 0..old_len),
            "remove_where",
        );
        old_len - new_len
    }

    /// Insert `value` immediately after the first element satisfying
    /// `predicate`, or append it when nothing matches. Returns the
    /// insertion index, which is also the single reported inserted index.
    pub fn insert_after(&self, value: T, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let mut state = self.lock();
        let index = match state.items.iter().position(|item| predicate(item)) {
            Some(found) => found + 1,
            None => state.items.len(),
        };
        state.items.insert(index, value);
        self.finish(state, ChangeSet::for_insert(index..index + 1), "insert_after");
        index
    }

    /// Insert `value` immediately before the first element satisfying
    /// `predicate`, or append it when nothing matches. Returns the
    /// insertion index.
    pub fn insert_before(&self, value: T, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let mut state = self.lock();
        let index = match state.items.iter().position(|item| predicate(item)) {
            Some(found) => found,
            None => state.items.len(),
        };
        state.items.insert(index, value);
        self.finish(state, ChangeSet::for_insert(index..index + 1), "insert_before");
        index
    }

    // -- reads ------------------------------------------------------------

    /// A clone of the element at `index`, or `None` out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.lock().items.get(index).cloned()
    }

    /// A clone of the first element.
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.lock().items.first().cloned()
    }

    /// A clone of the last element.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.lock().items.last().cloned()
    }

    /// A full copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    /// Iterate a point-in-time snapshot of the contents.
    ///
    /// The iterator owns its copy: concurrent mutations do not affect it,
    /// and calling `iter()` again observes the then-current state.
    #[must_use]
    pub fn iter(&self) -> Iter<T> {
        Iter {
            inner: self.snapshot().into_iter(),
        }
    }
}

impl<T: Clone> IntoIterator for &ObservableVec<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over a point-in-time snapshot of an
/// [`ObservableVec`].
#[derive(Debug)]
pub struct Iter<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<T> {}

impl<T> DoubleEndedIterator for Iter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Subscription;
    use std::sync::Mutex;

    /// Subscribe to the event channel, recording every ChangeSet.
    fn record_events<T: Clone>(
        vec: &ObservableVec<T>,
    ) -> (Arc<Mutex<Vec<ChangeSet>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let sub = vec
            .events()
            .subscribe(move |change: &ChangeSet| log2.lock().unwrap().push(change.clone()));
        (log, sub)
    }

    fn sv(items: &[&str]) -> ObservableVec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn push_reports_old_tail_index() {
        let vec = ObservableVec::new();
        let (log, _sub) = record_events(&vec);

        vec.push(10);
        vec.push(20);

        assert_eq!(vec.snapshot(), vec![10, 20]);
        let log = log.lock().unwrap();
        assert_eq!(log[0], ChangeSet::for_insert(0..1).unwrap());
        assert_eq!(log[1], ChangeSet::for_insert(1..2).unwrap());
    }

    #[test]
    fn append_reports_inserted_range() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);

        vec.append([2, 3, 4]);
        assert_eq!(vec.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_insert(1..4).unwrap());
    }

    #[test]
    fn append_empty_publishes_nothing() {
        let vec: ObservableVec<i32> = ObservableVec::new();
        let (log, _sub) = record_events(&vec);
        vec.append([]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn insert_within_and_at_end() {
        let vec = sv(&["a", "c"]);
        let (log, _sub) = record_events(&vec);

        vec.insert(1, "b".into()).unwrap();
        vec.insert(3, "d".into()).unwrap();

        assert_eq!(vec.snapshot(), vec!["a", "b", "c", "d"]);
        let log = log.lock().unwrap();
        assert_eq!(log[0], ChangeSet::for_insert(1..2).unwrap());
        assert_eq!(log[1], ChangeSet::for_insert(3..4).unwrap());
    }

    #[test]
    fn insert_out_of_bounds_fails_cleanly() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);

        let err = vec.insert(5, 9).unwrap_err();
        assert_eq!(err, MutationError::IndexOutOfBounds { index: 5, len: 1 });
        assert_eq!(vec.snapshot(), vec![1]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn insert_all_reports_contiguous_range() {
        let vec = ObservableVec::from_vec(vec![1, 4]);
        let (log, _sub) = record_events(&vec);

        vec.insert_all(1, [2, 3]).unwrap();
        assert_eq!(vec.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_insert(1..3).unwrap());
    }

    #[test]
    fn insert_all_empty_checks_bounds_but_publishes_nothing() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);

        vec.insert_all(0, []).unwrap();
        assert!(log.lock().unwrap().is_empty());

        let err = vec.insert_all(9, []).unwrap_err();
        assert_eq!(err, MutationError::IndexOutOfBounds { index: 9, len: 1 });
    }

    #[test]
    fn remove_last_reports_post_removal_index() {
        let vec = ObservableVec::from_vec(vec![7, 8, 9]);
        let (log, _sub) = record_events(&vec);

        assert_eq!(vec.remove_last().unwrap(), 9);
        assert_eq!(vec.snapshot(), vec![7, 8]);
        // Index of the removed tail slot, measured after removal.
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_delete(2..3).unwrap());
    }

    #[test]
    fn remove_last_on_empty_fails_without_publishing() {
        let vec: ObservableVec<i32> = ObservableVec::new();
        let (log, _sub) = record_events(&vec);

        assert_eq!(vec.remove_last().unwrap_err(), MutationError::Empty);
        assert!(vec.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn pop_is_the_non_failing_variant() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);

        assert_eq!(vec.pop(), Some(1));
        assert_eq!(vec.pop(), None);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], ChangeSet::for_delete(0..1).unwrap());
    }

    #[test]
    fn remove_middle_element() {
        let vec = sv(&["a", "b", "c"]);
        let (log, _sub) = record_events(&vec);

        assert_eq!(vec.remove(1).unwrap(), "b");
        assert_eq!(vec.snapshot(), vec!["a", "c"]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_delete(1..2).unwrap());
    }

    #[test]
    fn remove_out_of_bounds() {
        let vec = ObservableVec::from_vec(vec![1]);
        assert_eq!(
            vec.remove(1).unwrap_err(),
            MutationError::IndexOutOfBounds { index: 1, len: 1 }
        );
    }

    #[test]
    fn clear_reports_whole_old_range() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3]);
        let (log, _sub) = record_events(&vec);

        vec.clear();
        assert!(vec.is_empty());
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_delete(0..3).unwrap());

        // Clearing again is a no-op.
        vec.clear();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn splice_matches_table_formula() {
        let vec = sv(&["a", "b", "c", "d"]);
        let (log, _sub) = record_events(&vec);

        vec.splice(1..3, ["x".to_string(), "y".to_string(), "z".to_string()])
            .unwrap();
        assert_eq!(vec.snapshot(), vec!["a", "x", "y", "z", "d"]);

        let log = log.lock().unwrap();
        assert_eq!(log[0].inserted(), &[1, 2, 3]);
        assert_eq!(log[0].deleted(), &[1, 2]);
    }

    #[test]
    fn splice_invalid_range_fails_cleanly() {
        let vec = ObservableVec::from_vec(vec![1, 2]);
        let err = vec.splice(1..5, [9]).unwrap_err();
        assert_eq!(
            err,
            MutationError::RangeOutOfBounds {
                start: 1,
                end: 5,
                len: 2
            }
        );
        assert_eq!(vec.snapshot(), vec![1, 2]);
    }

    #[test]
    fn splice_empty_range_with_nothing_publishes_nothing() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);
        vec.splice(1..1, []).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn set_range_uses_the_splice_formula() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3, 4]);
        let (log, _sub) = record_events(&vec);

        vec.set_range(1..3, [9]).unwrap();
        assert_eq!(vec.snapshot(), vec![1, 9, 4]);

        let log = log.lock().unwrap();
        assert_eq!(log[0].inserted(), &[1]);
        assert_eq!(log[0].deleted(), &[1, 2]);
    }

    #[test]
    fn set_updates_in_place() {
        let vec = ObservableVec::from_vec(vec![1, 2]);
        let (log, _sub) = record_events(&vec);

        vec.set(0, 9).unwrap();
        assert_eq!(vec.snapshot(), vec![9, 2]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_update(0));
    }

    #[test]
    fn set_at_len_extends_instead_of_failing() {
        let vec = ObservableVec::from_vec(vec![1]);
        let (log, _sub) = record_events(&vec);

        vec.set(1, 2).unwrap();
        assert_eq!(vec.snapshot(), vec![1, 2]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_insert(1..2).unwrap());
    }

    #[test]
    fn set_past_len_fails() {
        let vec = ObservableVec::from_vec(vec![1]);
        assert_eq!(
            vec.set(2, 9).unwrap_err(),
            MutationError::IndexOutOfBounds { index: 2, len: 1 }
        );
    }

    #[test]
    fn remove_where_reports_full_range_splice() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3, 4, 5, 6]);
        let (log, _sub) = record_events(&vec);

        let removed = vec.remove_where(|n| n % 2 == 0);
        assert_eq!(removed, 3);
        assert_eq!(vec.snapshot(), vec![1, 3, 5]);

        let log = log.lock().unwrap();
        assert_eq!(log[0].inserted(), &[0, 1, 2]);
        assert_eq!(log[0].deleted(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn remove_where_no_match_publishes_nothing() {
        let vec = ObservableVec::from_vec(vec![1, 3, 5]);
        let (log, _sub) = record_events(&vec);

        assert_eq!(vec.remove_where(|n| *n > 100), 0);
        assert_eq!(vec.snapshot(), vec![1, 3, 5]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn remove_where_predicate_runs_once_per_element() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3]);
        let mut calls = 0;
        vec.remove_where(|_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 3);
    }

    #[test]
    fn insert_after_first_match() {
        let vec = sv(&["a", "b", "c"]);
        let (log, _sub) = record_events(&vec);

        let index = vec.insert_after("x".into(), |s| s == "b");
        assert_eq!(index, 2);
        assert_eq!(vec.snapshot(), vec!["a", "b", "x", "c"]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_insert(2..3).unwrap());
    }

    #[test]
    fn insert_after_without_match_appends() {
        let vec = sv(&["a", "b"]);
        let index = vec.insert_after("x".into(), |s| s == "zzz");
        assert_eq!(index, 2);
        assert_eq!(vec.snapshot(), vec!["a", "b", "x"]);
    }

    #[test]
    fn insert_before_first_match() {
        let vec = sv(&["a", "b", "c"]);
        let (log, _sub) = record_events(&vec);

        let index = vec.insert_before("x".into(), |s| s == "b");
        assert_eq!(index, 1);
        assert_eq!(vec.snapshot(), vec!["a", "x", "b", "c"]);
        assert_eq!(log.lock().unwrap()[0], ChangeSet::for_insert(1..2).unwrap());
    }

    #[test]
    fn insert_before_without_match_appends() {
        let vec: ObservableVec<i32> = ObservableVec::new();
        let index = vec.insert_before(1, |_| true);
        assert_eq!(index, 0);
        assert_eq!(vec.snapshot(), vec![1]);
    }

    #[test]
    fn any_is_a_pure_query() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3]);
        let (log, _sub) = record_events(&vec);

        assert!(vec.any(|n| *n == 2));
        assert!(!vec.any(|n| *n == 7));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn snapshots_replays_current_contents() {
        let vec = ObservableVec::new();
        vec.push(1);
        vec.push(2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = vec
            .snapshots()
            .subscribe(move |s: &Vec<i32>| seen2.lock().unwrap().push(s.clone()));

        // Late subscriber sees the mutated contents, not the empty start.
        assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2]]);

        vec.push(3);
        assert_eq!(seen.lock().unwrap().last().unwrap(), &vec![1, 2, 3]);
    }

    #[test]
    fn channel_accessors_are_idempotent() {
        let vec = ObservableVec::from_vec(vec![1]);
        assert!(Arc::ptr_eq(&vec.snapshots(), &vec.snapshots()));
        assert!(Arc::ptr_eq(&vec.events(), &vec.events()));
    }

    #[test]
    fn snapshot_precedes_event_within_one_mutation() {
        #[derive(Debug, PartialEq)]
        enum Seen {
            Snapshot(usize),
            Event,
        }

        let vec = ObservableVec::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = Arc::clone(&log);
        let _snap_sub = vec
            .snapshots()
            .subscribe(move |s: &Vec<i32>| l1.lock().unwrap().push(Seen::Snapshot(s.len())));
        let l2 = Arc::clone(&log);
        let _event_sub = vec
            .events()
            .subscribe(move |_: &ChangeSet| l2.lock().unwrap().push(Seen::Event));

        vec.push(1);
        vec.push(2);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                Seen::Snapshot(0), // replay at subscribe time
                Seen::Snapshot(1),
                Seen::Event,
                Seen::Snapshot(2),
                Seen::Event,
            ]
        );
    }

    #[test]
    fn clone_shares_storage_and_channels() {
        let a = ObservableVec::from_vec(vec![1]);
        let b = a.clone();
        let (log, _sub) = record_events(&a);

        b.push(2);
        assert_eq!(a.snapshot(), vec![1, 2]);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn constructors() {
        let empty: ObservableVec<u8> = ObservableVec::default();
        assert!(empty.is_empty());

        let filled = ObservableVec::repeating(7, 3);
        assert_eq!(filled.snapshot(), vec![7, 7, 7]);

        let from: ObservableVec<i32> = vec![1, 2].into();
        assert_eq!(from.len(), 2);

        let collected: ObservableVec<i32> = (0..3).collect();
        assert_eq!(collected.snapshot(), vec![0, 1, 2]);
    }

    #[test]
    fn iter_is_a_restartable_snapshot() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3]);
        let mut iter = vec.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next(), Some(1));

        // Mutation does not disturb the running iterator.
        vec.push(4);
        assert_eq!(iter.collect::<Vec<_>>(), vec![2, 3]);

        // Restarting observes the new state.
        assert_eq!(vec.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!((&vec).into_iter().rev().next(), Some(4));
    }

    #[test]
    fn reads() {
        let vec = ObservableVec::from_vec(vec![10, 20, 30]);
        assert_eq!(vec.len(), 3);
        assert_eq!(vec.get(1), Some(20));
        assert_eq!(vec.get(9), None);
        assert_eq!(vec.first(), Some(10));
        assert_eq!(vec.last(), Some(30));
        assert_eq!(vec.indices(), 0..3);
    }

    #[test]
    fn debug_format() {
        let vec = ObservableVec::from_vec(vec![1]);
        let dbg = format!("{vec:?}");
        assert!(dbg.contains("ObservableVec"));
        assert!(dbg.contains("snapshot_channel: false"));
        let _ = vec.snapshots();
        assert!(format!("{vec:?}").contains("snapshot_channel: true"));
    }
}
