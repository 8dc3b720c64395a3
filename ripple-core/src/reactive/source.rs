//! Source combinators: guaranteed first values and future bridges.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tracing::{error, warn};

use super::signal::{Callback, Release, Signal};
use crate::error::{Fire, SignalError};

/// A signal that fires `value` once, synchronously, on every subscribe.
pub fn init<T>(value: T) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    Signal::new(move |callback: Callback<T>| {
        callback(Ok(value.clone()));
        Release::noop()
    })
}

/// Guarantee a synchronous first fire in front of `upstream`.
///
/// On subscribe, if `upstream` fires synchronously its value is delivered
/// and `value` is suppressed; otherwise a clone of `value` is fired as a
/// placeholder. Every later upstream fire passes through unchanged.
///
/// ```rust,ignore
/// // Empty list until the fetch resolves.
/// let peers = init_from(Vec::new(), &mute_async(&url, fetch_peers));
/// ```
pub fn init_from<T>(value: T, upstream: &Signal<T>) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    let upstream = upstream.clone();
    Signal::new(move |callback: Callback<T>| {
        let fired = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));

        let (fired_flag, released_flag) = (fired.clone(), released.clone());
        let downstream = callback.clone();
        let inner = upstream.subscribe(move |fire| {
            fired_flag.store(true, Ordering::SeqCst);
            if !released_flag.load(Ordering::SeqCst) {
                downstream(fire);
            }
        });

        if !fired.load(Ordering::SeqCst) {
            callback(Ok(value.clone()));
        }

        Release::new(move || {
            released.store(true, Ordering::SeqCst);
            inner.release();
        })
    })
}

type SharedFire<T> = Shared<BoxFuture<'static, Fire<T>>>;

/// Bridge a future into a one-shot signal.
///
/// The future is started by the first subscription and shared by all of
/// them; each subscriber receives its outcome once. A failure (an `Err`
/// output or a panic) is logged and delivered as
/// [`SignalError::SourceFailed`].
///
/// Releasing stops delivery to that subscriber. The shared future keeps
/// running while any other subscriber still waits on it.
pub fn when<T, E, Fut>(future: Fut) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
    E: Display + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let shared: SharedFire<T> = AssertUnwindSafe(future)
        .catch_unwind()
        .map(|outcome| {
            let failure = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err.to_string(),
                Err(_) => "future panicked".to_string(),
            };
            error!(%failure, "when() source failed");
            Err(SignalError::SourceFailed(failure))
        })
        .boxed()
        .shared();

    Signal::new(move |callback: Callback<T>| {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("when() subscribed outside a tokio runtime");
                callback(Err(SignalError::NoRuntime("when")));
                return Release::noop();
            }
        };

        let outcome = shared.clone();
        let task = handle.spawn(async move {
            callback(outcome.await);
        });
        let abort = task.abort_handle();
        Release::new(move || abort.abort())
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
