//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. Subscribing hands it a
//! callback; the signal invokes that callback zero or more times (during the
//! `subscribe` call itself and/or later) and returns a [`Release`] handle.
//!
//! # How Signals Work
//!
//! 1. `subscribe` starts a subscription. Everything the signal allocates for
//!    it (upstream subscriptions, timers, queues) is owned by the returned
//!    `Release`.
//!
//! 2. Combinators are signals whose connect function subscribes to their
//!    inputs and re-fires derived values to their own callback.
//!
//! 3. Releasing (explicitly or by dropping the handle) silences the
//!    subscription for good and transitively releases everything it owns.
//!
//! # Thread Safety
//!
//! Signals are `Send + Sync` and may be fired from tokio worker threads.
//! No combinator holds a lock while invoking a callback, so a callback may
//! freely re-enter the signal graph.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Fire;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The callback a subscriber hands to a signal.
pub type Callback<T> = Arc<dyn Fn(Fire<T>) + Send + Sync>;

type Connect<T> = dyn Fn(Callback<T>) -> Release + Send + Sync;

/// A subscribable, possibly asynchronous value source.
///
/// # Type Parameters
///
/// - `T`: The type of value fired. Must be Clone + Send + Sync.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = writable(0);
///
/// let release = count.subscribe(|fire| println!("count: {:?}", fire));
/// set_count.set(5); // prints "count: Ok(5)"
///
/// release.release();
/// set_count.set(6); // prints nothing
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// Starts one subscription.
    connect: Arc<Connect<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a signal from its connect function.
    ///
    /// `connect` runs once per subscription. It may fire the callback
    /// synchronously any number of times before returning, and must return a
    /// `Release` that stops all further fires for that subscription.
    pub fn new<F>(connect: F) -> Self
    where
        F: Fn(Callback<T>) -> Release + Send + Sync + 'static,
    {
        Self {
            id: next_signal_id(),
            connect: Arc::new(connect),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Begin a subscription.
    pub fn subscribe<F>(&self, callback: F) -> Release
    where
        F: Fn(Fire<T>) + Send + Sync + 'static,
    {
        self.subscribe_with(Arc::new(callback))
    }

    /// Begin a subscription with an already shared callback.
    pub fn subscribe_with(&self, callback: Callback<T>) -> Release {
        (self.connect)(callback)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            connect: Arc::clone(&self.connect),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("id", &self.id).finish()
    }
}

/// Handle that ends a subscription.
///
/// Dropping the handle releases the subscription, just like calling
/// [`release`](Release::release). Because `release` consumes the handle, a
/// subscription can only be released once; there is nothing left to call a
/// second time.
#[must_use = "dropping a Release immediately ends the subscription"]
pub struct Release {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Release {
    /// Create a handle that runs `teardown` when released.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// A handle that releases every handle in `releases`, in order.
    pub fn all(releases: Vec<Release>) -> Self {
        Self::new(move || drop(releases))
    }

    /// End the subscription now.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.run();
    }
}

impl Debug for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Release")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
