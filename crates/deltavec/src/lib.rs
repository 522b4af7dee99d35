#![forbid(unsafe_code)]

//! deltavec: a thread-safe observable vector with exact per-mutation diffs.
//!
//! # Role
//! [`ObservableVec<T>`] is an ordered, growable collection that behaves
//! like a shared `Vec<T>` but additionally tells observers exactly what
//! each structural change did. After every committed mutation it
//! publishes, in order:
//!
//! 1. the full new contents on the **snapshot channel** (a
//!    [`LatestCell`], which also replays the current contents to every
//!    new subscriber), then
//! 2. a [`ChangeSet`] on the **event channel** (an [`EventHub`], no
//!    replay) naming the inserted, deleted, and updated indices.
//!
//! Downstream consumers such as list renderers can apply the reported
//! indices incrementally instead of diffing two snapshots themselves.
//! The reported indices follow fixed per-operation rules, not a minimal
//! edit script; see the [`change`] module docs for the arithmetic.
//!
//! # Concurrency
//! One mutex serializes mutations; channel notification happens outside
//! the critical section, ordered by a ticket gate so all subscribers see
//! one total order matching commit order. Reads lock briefly and copy.
//! Details in the [`vec`] module docs.
//!
//! # Example
//! ```
//! use deltavec::ObservableVec;
//!
//! let items = ObservableVec::from_vec(vec![1, 2, 3]);
//! let _sub = items.events().subscribe(|change| {
//!     println!("inserted at {:?}", change.inserted());
//! });
//! items.push(4); // prints "inserted at [3]"
//! ```

pub mod change;
pub mod channel;
pub mod error;
pub mod vec;

pub use change::ChangeSet;
pub use channel::{EventHub, LatestCell, Subscription};
pub use error::MutationError;
pub use vec::{Iter, ObservableVec};
