#![forbid(unsafe_code)]

//! Broadcast channels for snapshots and change events.
//!
//! # Design
//!
//! Two callback-based broadcast primitives share one subscriber mechanism:
//!
//! - [`LatestCell<T>`]: a single-slot broadcast cell. It always holds the
//!   most recently published value, and `subscribe()` immediately replays
//!   that value to the new subscriber before any further publications.
//! - [`EventHub<T>`]: plain broadcast with no replay. A late subscriber
//!   only sees values published after it subscribed.
//!
//! Subscribers are stored as `Weak` callbacks; the strong reference lives
//! in the returned [`Subscription`] guard, so dropping the guard
//! unsubscribes. Dead entries are pruned lazily during notification.
//!
//! # Failure Modes
//!
//! - **Re-entrant publish/subscribe**: calling `publish()` or
//!   `subscribe()` on a channel from within one of that channel's own
//!   callbacks deadlocks on the internal mutex. This is intentional:
//!   re-entrant mutation of the subscriber graph indicates a design bug.
//! - **Subscriber leak**: `Subscription` guards held indefinitely keep
//!   their callbacks alive; dead weak references cost one vec slot until
//!   the next notification prunes them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A subscriber callback stored as a strong `Arc` in the guard, handed to
/// the channel as `Weak`.
type CallbackArc<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CallbackWeak<T> = Weak<dyn Fn(&T) + Send + Sync>;

/// Lock a mutex, discarding poison.
///
/// A panicking subscriber callback never runs while a channel or sequence
/// lock is held mid-edit, so a poisoned guard still protects a coherent
/// value.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Weak-callback registry shared by both channel types.
struct Subscribers<T> {
    entries: Vec<CallbackWeak<T>>,
}

impl<T> Subscribers<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register(&mut self, callback: &CallbackArc<T>) {
        self.entries.push(Arc::downgrade(callback));
    }

    /// Prune dead weak refs and collect live callbacks for invocation
    /// outside the lock.
    fn collect_live(&mut self) -> Vec<CallbackArc<T>> {
        self.entries.retain(|w| w.strong_count() > 0);
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the guard drops the strong callback reference; the channel's
/// `Weak` entry then fails to upgrade and is pruned on the next
/// notification. The callback is never invoked after the guard is
/// dropped.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Arc` alive.
    _guard: Box<dyn std::any::Any + Send + Sync>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Broadcast endpoint with no replay.
///
/// Subscribers receive only values published after they subscribed, in
/// registration order.
pub struct EventHub<T> {
    subscribers: Mutex<Subscribers<T>>,
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventHub<T> {
    /// Create an empty hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::new()),
        }
    }

    /// Register a callback for future publications.
    ///
    /// Returns a [`Subscription`] guard; dropping it unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let strong: CallbackArc<T> = Arc::new(callback);
        lock_unpoisoned(&self.subscribers).register(&strong);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `value` to every live subscriber in registration order.
    pub fn publish(&self, value: &T) {
        let callbacks = lock_unpoisoned(&self.subscribers).collect_live();
        for cb in &callbacks {
            cb(value);
        }
    }

    /// Number of registered subscribers, including dead entries not yet
    /// pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock_unpoisoned(&self.subscribers).len()
    }
}

impl<T> std::fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Shared interior for [`LatestCell<T>`]. Value and subscriber list live
/// under one lock so replay and publication agree on ordering.
struct LatestInner<T> {
    value: T,
    subscribers: Subscribers<T>,
}

/// Single-slot broadcast cell with replay.
///
/// Holds the latest published value. New subscribers immediately receive
/// the current value, then every subsequent publication.
pub struct LatestCell<T> {
    inner: Mutex<LatestInner<T>>,
}

impl<T: Clone> LatestCell<T> {
    /// Create a cell holding `value` with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(LatestInner {
                value,
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// A clone of the latest published value.
    #[must_use]
    pub fn get(&self) -> T {
        lock_unpoisoned(&self.inner).value.clone()
    }

    /// Register a callback and immediately replay the current value to it.
    ///
    /// The replay happens on the subscribing thread before this method
    /// returns. Returns a [`Subscription`] guard; dropping it
    /// unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let strong: CallbackArc<T> = Arc::new(callback);
        let replay = {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.subscribers.register(&strong);
            inner.value.clone()
        };
        strong(&replay);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Store `value` as the new latest value and deliver it to every live
    /// subscriber in registration order.
    pub fn publish(&self, value: T) {
        let (callbacks, value) = {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.value = value;
            (inner.subscribers.collect_live(), inner.value.clone())
        };
        for cb in &callbacks {
            cb(&value);
        }
    }

    /// Number of registered subscribers, including dead entries not yet
    /// pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock_unpoisoned(&self.inner).subscribers.len()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for LatestCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_unpoisoned(&self.inner);
        f.debug_struct("LatestCell")
            .field("value", &inner.value)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
