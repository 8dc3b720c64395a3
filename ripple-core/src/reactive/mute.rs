//! Order-preserving value transforms.
//!
//! `mute` maps every upstream fire through a transform that may finish
//! immediately or later. Outputs are always delivered in upstream arrival
//! order, per subscription:
//!
//! - every upstream fire is assigned a sequence number;
//! - a finished output is parked until every lower sequence number has
//!   been delivered, then flushed in order.
//!
//! Superseded in-flight work is never cancelled. A slow early computation
//! holds back every later output, however fast, and the backlog grows
//! without bound while upstream outpaces the transform.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{error, trace, warn};

use super::signal::{Callback, Release, Signal};
use crate::error::{Fire, SignalError};

/// The result of a transform for one upstream value.
pub enum Mutation<U> {
    /// The output is available now.
    Ready(U),

    /// The output arrives when the future completes. An `Err` output is
    /// delivered as [`SignalError::Rejected`].
    Pending(BoxFuture<'static, Result<U, String>>),
}

impl<U> Mutation<U> {
    /// Wrap a future whose error type only needs to be displayable.
    pub fn pending<E, Fut>(future: Fut) -> Self
    where
        U: 'static,
        E: Display + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        Mutation::Pending(future.map(|output| output.map_err(|err| err.to_string())).boxed())
    }
}

/// Map every value through a synchronous transform.
pub fn mute<T, U, F>(upstream: &Signal<T>, transform: F) -> Signal<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    mute_with(upstream, move |value| Mutation::Ready(transform(value)))
}

/// Map every value through an asynchronous transform.
///
/// A transform that fails or panics yields an in-band
/// [`SignalError::Rejected`] at its position in the order, and the failure
/// is logged.
pub fn mute_async<T, U, E, F, Fut>(upstream: &Signal<T>, transform: F) -> Signal<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    E: Display + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
{
    mute_with(upstream, move |value| Mutation::pending(transform(value)))
}

/// Map every value through a transform that decides per value whether its
/// output is ready now or later.
///
/// Upstream `Err` fires skip the transform and keep their place in line.
pub fn mute_with<T, U, F>(upstream: &Signal<T>, transform: F) -> Signal<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(T) -> Mutation<U> + Send + Sync + 'static,
{
    let upstream = upstream.clone();
    let transform = Arc::new(transform);

    Signal::new(move |callback: Callback<U>| {
        let sequencer = Arc::new(Sequencer {
            queue: Mutex::new(Queue::default()),
            callback,
        });

        let transform = transform.clone();
        let arrivals = sequencer.clone();
        let inner = upstream.subscribe(move |fire: Fire<T>| {
            let mutation = match fire {
                Ok(value) => transform(value),
                Err(err) => {
                    arrivals.arrive_ready(Err(err));
                    return;
                }
            };
            match mutation {
                Mutation::Ready(output) => arrivals.arrive_ready(Ok(output)),
                Mutation::Pending(future) => arrivals.arrive_pending(future),
            }
        });

        Release::new(move || {
            inner.release();
            sequencer.shutdown();
        })
    })
}

struct Queue<U> {
    issued: u64,
    delivered: u64,
    parked: BTreeMap<u64, Fire<U>>,
    in_flight: HashMap<u64, AbortHandle>,
    flushing: bool,
    released: bool,
}

impl<U> Default for Queue<U> {
    fn default() -> Self {
        Self {
            issued: 0,
            delivered: 0,
            parked: BTreeMap::new(),
            in_flight: HashMap::new(),
            flushing: false,
            released: false,
        }
    }
}

/// Per-subscription ordering state.
struct Sequencer<U> {
    queue: Mutex<Queue<U>>,
    callback: Callback<U>,
}

impl<U> Sequencer<U>
where
    U: Clone + Send + Sync + 'static,
{
    fn arrive_ready(&self, fire: Fire<U>) {
        {
            let mut queue = self.queue.lock();
            if queue.released {
                return;
            }
            let seq = queue.issued;
            queue.issued += 1;
            queue.parked.insert(seq, fire);
        }
        self.flush();
    }

    fn arrive_pending(self: &Arc<Self>, future: BoxFuture<'static, Result<U, String>>) {
        let mut queue = self.queue.lock();
        if queue.released {
            return;
        }
        let seq = queue.issued;
        queue.issued += 1;

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(seq, "mute() transform pending outside a tokio runtime");
                queue.parked.insert(seq, Err(SignalError::NoRuntime("mute")));
                drop(queue);
                self.flush();
                return;
            }
        };

        // Spawned under the lock so the task cannot finish before it is tracked.
        let sequencer = self.clone();
        let task = handle.spawn(async move {
            let fire = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(failure)) => {
                    error!(seq, %failure, "mute() transform failed");
                    Err(SignalError::Rejected(failure))
                }
                Err(_) => {
                    error!(seq, "mute() transform panicked");
                    Err(SignalError::Rejected("transform panicked".to_string()))
                }
            };
            sequencer.complete(seq, fire);
        });
        queue.in_flight.insert(seq, task.abort_handle());
    }

    fn complete(&self, seq: u64, fire: Fire<U>) {
        {
            let mut queue = self.queue.lock();
            queue.in_flight.remove(&seq);
            if queue.released {
                return;
            }
            queue.parked.insert(seq, fire);
        }
        self.flush();
    }

    /// Deliver every parked output whose predecessors are all delivered.
    ///
    /// Only one caller flushes at a time; a fire that arrives during a flush
    /// (re-entrantly or from another task) is picked up by the running loop.
    fn flush(&self) {
        {
            let mut queue = self.queue.lock();
            if queue.flushing {
                return;
            }
            queue.flushing = true;
        }

        loop {
            let fire = {
                let mut queue = self.queue.lock();
                let next = queue.delivered;
                match queue.parked.remove(&next) {
                    Some(fire) if !queue.released => {
                        queue.delivered += 1;
                        fire
                    }
                    _ => {
                        queue.flushing = false;
                        return;
                    }
                }
            };
            (self.callback)(fire);
        }
    }

    fn shutdown(&self) {
        let mut queue = self.queue.lock();
        queue.released = true;
        queue.parked.clear();
        if !queue.in_flight.is_empty() {
            trace!(pending = queue.in_flight.len(), "mute() aborting in-flight transforms");
        }
        for (_, task) in queue.in_flight.drain() {
            task.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
