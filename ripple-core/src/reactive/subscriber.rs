//! Subscriber types for the reactive system.
//!
//! Multicasting signals (`writable`, `memo`) keep a [`SubscriberSet`] of the
//! callbacks currently attached to them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::signal::Callback;
use crate::error::Fire;

/// Unique identifier for a subscriber.
///
/// Each subscription to a multicasting signal gets a unique ID so that its
/// release can remove exactly that callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// One registered callback plus the flag its removal clears.
pub struct Entry<T> {
    live: Arc<AtomicBool>,
    callback: Callback<T>,
}

impl<T> Entry<T> {
    /// Deliver `fire` unless the subscription was removed in the meantime.
    pub fn notify(&self, fire: Fire<T>) {
        if self.live.load(Ordering::SeqCst) {
            (self.callback)(fire);
        }
    }
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Entries copied out of a [`SubscriberSet`] for notification.
pub type Snapshot<T> = SmallVec<[Entry<T>; 4]>;

/// The callbacks currently attached to a multicasting signal.
///
/// Iteration follows registration order. Notification always works on a
/// [`snapshot`](SubscriberSet::snapshot) taken under the owner's lock and
/// walked after the lock is dropped, so a callback may subscribe, release or
/// write while the notification is in progress. An entry removed during a
/// pass is skipped by the rest of that pass.
pub struct SubscriberSet<T> {
    entries: IndexMap<SubscriberId, Entry<T>>,
}

impl<T> SubscriberSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register a callback, returning the ID its release should remove.
    pub fn insert(&mut self, callback: Callback<T>) -> SubscriberId {
        let id = SubscriberId::new();
        let live = Arc::new(AtomicBool::new(true));
        self.entries.insert(id, Entry { live, callback });
        id
    }

    /// Remove a callback. Returns whether it was present.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        match self.entries.shift_remove(&id) {
            Some(entry) => {
                entry.live.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Copy the current entries out for notification.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.entries.values().cloned().collect()
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn snapshot_follows_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut set: SubscriberSet<i32> = SubscriberSet::new();

        for tag in 0..3 {
            let order = order.clone();
            set.insert(Arc::new(move |_| order.lock().push(tag)));
        }

        for entry in set.snapshot() {
            entry.notify(Ok(0));
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn removal_silences_taken_snapshot() {
        let calls = Arc::new(AtomicI32::new(0));
        let mut set: SubscriberSet<i32> = SubscriberSet::new();

        let calls_clone = calls.clone();
        let id = set.insert(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let snapshot = set.snapshot();
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());

        for entry in snapshot {
            entry.notify(Ok(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
