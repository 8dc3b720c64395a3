//! Writable cells.
//!
//! [`writable`] is the mutable source of a signal graph: a stored value, a
//! signal that fires it, and a [`Setter`] that replaces it.

use std::sync::Arc;

use parking_lot::Mutex;

use super::signal::{Callback, Release, Signal};
use super::subscriber::SubscriberSet;
use crate::equality::Structural;

struct Cell<T> {
    value: T,
    subscribers: SubscriberSet<T>,
}

/// Write half of a [`writable`] cell.
pub struct Setter<T> {
    cell: Arc<Mutex<Cell<T>>>,
}

/// Create a mutable cell.
///
/// Subscribing to the returned signal fires the current value synchronously
/// and then every value stored through the [`Setter`].
///
/// ```rust,ignore
/// let (name, set_name) = writable(String::from("placeholder"));
/// ```
pub fn writable<T>(initial: T) -> (Signal<T>, Setter<T>)
where
    T: Structural + Clone + Send + Sync + 'static,
{
    let cell = Arc::new(Mutex::new(Cell {
        value: initial,
        subscribers: SubscriberSet::new(),
    }));

    let shared = cell.clone();
    let signal = Signal::new(move |callback: Callback<T>| {
        let (id, current) = {
            let mut cell = shared.lock();
            let id = cell.subscribers.insert(callback.clone());
            (id, cell.value.clone())
        };
        callback(Ok(current));

        let cell = shared.clone();
        Release::new(move || {
            cell.lock().subscribers.remove(id);
        })
    });

    (signal, Setter { cell })
}

impl<T> Setter<T>
where
    T: Structural + Clone + Send + Sync + 'static,
{
    /// Store `value` if it shallow-differs from the current value and notify
    /// every subscriber registered at that moment, in registration order.
    ///
    /// Returns the stored value either way. A subscriber may call `set`
    /// again while being notified; the nested write runs its own
    /// notification pass to completion before the outer pass continues.
    pub fn set(&self, value: T) -> T {
        let snapshot = {
            let mut cell = self.cell.lock();
            if !cell.value.shallow_differs(&value) {
                return cell.value.clone();
            }
            cell.value = value.clone();
            cell.subscribers.snapshot()
        };

        for entry in snapshot {
            entry.notify(Ok(value.clone()));
        }
        value
    }

    /// Derive the next value from the current one and [`set`](Setter::set) it.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let cell = self.cell.lock();
            f(&cell.value)
        };
        self.set(next)
    }

    /// Read the stored value without subscribing.
    pub fn current(&self) -> T {
        self.cell.lock().value.clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.cell.lock().subscribers.len()
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(crate::Fire<T>) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |fire: crate::Fire<T>| sink.lock().push(fire.unwrap()))
    }

    #[test]
    fn subscribe_fires_current_value() {
        let (signal, set) = writable(1);
        set.set(2);

        let (seen, callback) = recorder::<i32>();
        let _release = signal.subscribe(callback);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn set_notifies_subscribers() {
        let (signal, set) = writable(0);
        let (seen, callback) = recorder::<i32>();
        let _release = signal.subscribe(callback);

        assert_eq!(set.set(1), 1);
        assert_eq!(set.set(2), 2);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn equal_write_is_silent() {
        let (signal, set) = writable(vec![1, 2]);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let _release = signal.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(set.set(vec![1, 2]), vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        set.set(vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_unregisters() {
        let (signal, set) = writable(0);
        let (seen, callback) = recorder::<i32>();

        let release = signal.subscribe(callback);
        assert_eq!(set.subscriber_count(), 1);
        release.release();
        assert_eq!(set.subscriber_count(), 0);

        set.set(5);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(set.current(), 5);
    }

    #[test]
    fn update_uses_current_value() {
        let (_, set) = writable(10);
        assert_eq!(set.update(|v| v + 5), 15);
        assert_eq!(set.current(), 15);
    }

    #[test]
    fn reentrant_write_during_notification() {
        let (signal, set) = writable(0);
        let (seen, callback) = recorder::<i32>();

        let set_clone = set.clone();
        let _bump = signal.subscribe(move |fire| {
            if fire == Ok(1) {
                set_clone.set(2);
            }
        });
        let _release = signal.subscribe(callback);

        set.set(1);
        // The nested write completes before the outer pass reaches the recorder.
        assert_eq!(*seen.lock(), vec![0, 2, 1]);
        assert_eq!(set.current(), 2);
    }

    #[test]
    fn release_during_notification_skips_later_subscriber() {
        let (signal, set) = writable(0);
        let pending: Arc<Mutex<Option<Release>>> = Arc::new(Mutex::new(None));

        let slot = pending.clone();
        let _first = signal.subscribe(move |fire| {
            if fire == Ok(1) {
                let release = slot.lock().take();
                drop(release);
            }
        });
        let (seen, callback) = recorder::<i32>();
        let second = signal.subscribe(callback);
        *pending.lock() = Some(second);

        set.set(1);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(set.subscriber_count(), 1);
    }
}
