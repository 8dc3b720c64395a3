//! Consumers
//!
//! Ways to pull values out of a signal from ordinary (sync or async) code:
//! a synchronous peek with [`get`], a `Stream` with [`iter`], and futures
//! for the `n`-th fire ([`next`]) or the first fire matching a predicate
//! ([`until`]).
//!
//! Every consumer owns its subscription and releases it as soon as it has
//! what it needs, including when its future is dropped unfinished.

mod iter;
mod sync_check;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Fire, SignalError};
use crate::reactive::{InspectContext, Signal};

pub use iter::{iter, Iter};
pub use sync_check::{is_sync, is_sync_now};

struct Peek<T> {
    closed: bool,
    last: Option<Fire<T>>,
}

/// Read whatever `signal` fires synchronously on subscribe.
///
/// Subscribes, keeps the last synchronous fire, and releases immediately.
/// Returns `Ok(None)` for a signal with no synchronous fire and surfaces an
/// in-band error as `Err`. Fires that arrive after the subscription closed
/// are ignored.
pub fn get<T>(signal: &Signal<T>) -> Result<Option<T>, SignalError>
where
    T: Clone + Send + Sync + 'static,
{
    let peek = Arc::new(Mutex::new(Peek { closed: false, last: None }));
    let sink = peek.clone();
    let release = signal.subscribe(move |fire| {
        let mut peek = sink.lock();
        if !peek.closed {
            peek.last = Some(fire);
        }
    });
    peek.lock().closed = true;
    release.release();

    let last = peek.lock().last.take();
    last.transpose()
}

/// Resolve with the fire at zero-based index `n`.
///
/// `next(&sig, 0)` is the first fire, synchronous or not. An `Err` fire at
/// that index is returned as the error; earlier fires are discarded
/// whatever they are. The future stays pending until the signal fires
/// `n + 1` times; for `n == usize::MAX` that is never.
pub async fn next<T>(signal: &Signal<T>, n: usize) -> Result<T, SignalError>
where
    T: Clone + Send + Sync + 'static,
{
    let mut stream = iter(signal, n.checked_add(1));
    let mut skip = n;
    while let Some(fire) = stream.next().await {
        if skip == 0 {
            return fire;
        }
        skip -= 1;
    }
    unreachable!("iter() ended before reaching index {n}")
}

/// [`next`], with the subscription logged through `context`.
pub async fn next_inspected<T>(
    signal: &Signal<T>,
    n: usize,
    context: &InspectContext,
    name: Option<&str>,
) -> Result<T, SignalError>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    next(&context.inspect(signal, name), n).await
}

/// Resolve with the first value for which `predicate` holds.
///
/// `Err` fires are skipped. With a `timeout`, gives up with
/// [`SignalError::Timeout`] once it elapses; either way the subscription is
/// released when the future completes or is dropped.
pub async fn until<T, P>(
    signal: &Signal<T>,
    predicate: P,
    timeout: Option<Duration>,
) -> Result<T, SignalError>
where
    T: Clone + Send + Sync + 'static,
    P: Fn(&T) -> bool,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, first_match(signal, &predicate))
            .await
            .map_err(|_| SignalError::Timeout(limit))?,
        None => first_match(signal, &predicate).await,
    }
}

async fn first_match<T, P>(signal: &Signal<T>, predicate: &P) -> Result<T, SignalError>
where
    T: Clone + Send + Sync + 'static,
    P: Fn(&T) -> bool,
{
    let mut stream = iter(signal, None);
    while let Some(fire) = stream.next().await {
        match fire {
            Ok(value) if predicate(&value) => return Ok(value),
            Ok(_) => {}
            Err(err) => debug!(%err, "until() skipping error fire"),
        }
    }
    unreachable!("unbounded iter() ended")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
