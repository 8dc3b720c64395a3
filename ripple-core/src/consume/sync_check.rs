//! Synchronicity checks.
//!
//! A signal is *sync* when subscribing to it fires exactly one value before
//! `subscribe` returns and nothing afterwards. Sync signals can be read with
//! [`get`](super::get) without losing anything.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::error::SignalError;
use crate::reactive::Signal;

#[derive(Default)]
struct Tally {
    subscribed: AtomicBool,
    synchronous: AtomicUsize,
    late: AtomicBool,
    notify: Notify,
}

/// Watch `signal` for `grace` and report whether it behaved synchronously.
///
/// Returns `Ok(true)` for exactly one synchronous fire and no later fire,
/// `Ok(false)` for any other pattern, and [`SignalError::Silent`] when the
/// signal fired nothing at all within `grace`. Returns early as soon as a
/// late fire is seen.
pub async fn is_sync<T>(signal: &Signal<T>, grace: Duration) -> Result<bool, SignalError>
where
    T: Clone + Send + Sync + 'static,
{
    let tally = Arc::new(Tally::default());
    let watcher = tally.clone();
    let release = signal.subscribe(move |_fire| {
        if watcher.subscribed.load(Ordering::SeqCst) {
            watcher.late.store(true, Ordering::SeqCst);
            watcher.notify.notify_one();
        } else {
            watcher.synchronous.fetch_add(1, Ordering::SeqCst);
        }
    });
    tally.subscribed.store(true, Ordering::SeqCst);

    let _ = tokio::time::timeout(grace, tally.notify.notified()).await;
    release.release();

    let synchronous = tally.synchronous.load(Ordering::SeqCst);
    let late = tally.late.load(Ordering::SeqCst);
    debug!(synchronous, late, "is_sync() finished watching");

    if synchronous == 0 && !late {
        return Err(SignalError::Silent(grace));
    }
    Ok(synchronous == 1 && !late)
}

/// Report whether `signal` fires synchronously on subscribe.
///
/// Subscribes and releases at once, so it cannot tell a sync signal from
/// one that also fires later; use [`is_sync`] for that.
///
/// # Panics
///
/// Panics if the signal fires after its subscription was released.
pub fn is_sync_now<T>(signal: &Signal<T>) -> bool
where
    T: Clone + Send + Sync + 'static,
{
    let fired = Arc::new(AtomicBool::new(false));
    let released = Arc::new(AtomicBool::new(false));
    let (sink, closed) = (fired.clone(), released.clone());
    let release = signal.subscribe(move |_fire| {
        if closed.load(Ordering::SeqCst) {
            panic!("signal fired after its subscription was released");
        }
        sink.store(true, Ordering::SeqCst);
    });
    released.store(true, Ordering::SeqCst);
    release.release();
    fired.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{init, init_from, mute_async, when, writable, Callback, Release};

    const GRACE: Duration = Duration::from_millis(10);

    #[tokio::test(start_paused = true)]
    async fn init_is_sync() {
        assert_eq!(is_sync(&init(5), GRACE).await, Ok(true));
        assert!(is_sync_now(&init(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn writable_is_sync() {
        let (cell, _set) = writable(1);
        assert_eq!(is_sync(&cell, GRACE).await, Ok(true));
    }

    #[tokio::test(start_paused = true)]
    async fn async_map_is_not_sync() {
        let doubled = mute_async(&init(5), |n| async move { Ok::<_, String>(n * 2) });
        assert_eq!(is_sync(&doubled, GRACE).await, Ok(false));
        assert!(!is_sync_now(&doubled));
    }

    #[tokio::test(start_paused = true)]
    async fn double_sync_fire_is_not_sync() {
        let twice = Signal::new(|callback: Callback<i32>| {
            callback(Ok(1));
            callback(Ok(2));
            Release::noop()
        });
        assert_eq!(is_sync(&twice, GRACE).await, Ok(false));
        assert!(is_sync_now(&twice));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_then_async_fire_is_not_sync() {
        let late = when(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, String>(5)
        });
        let fronted = init_from(0, &late);
        assert_eq!(is_sync(&fronted, GRACE).await, Ok(false));
        assert!(is_sync_now(&fronted));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_signal_is_reported() {
        let pending = when(std::future::pending::<Result<i32, String>>());
        assert_eq!(is_sync(&pending, GRACE).await, Err(SignalError::Silent(GRACE)));
    }
}
