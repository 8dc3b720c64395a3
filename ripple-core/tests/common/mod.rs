//! Timer-driven test signals.

use std::time::Duration;

use ripple_core::{Callback, Release, Signal};
use tracing::warn;

/// Fires `0..max`, one value every `period`, then goes quiet.
pub fn interval(max: usize, period: Duration) -> Signal<usize> {
    Signal::new(move |callback: Callback<usize>| {
        let task = tokio::spawn(async move {
            for i in 0..max {
                tokio::time::sleep(period).await;
                callback(Ok(i));
            }
        });
        Release::new(move || {
            if !task.is_finished() {
                warn!("interval released before reaching {max}");
            }
            task.abort();
        })
    })
}

/// Fires `value` once, `ms` milliseconds after subscribe.
pub fn timeout<T>(value: T, ms: u64) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    Signal::new(move |callback: Callback<T>| {
        let value = value.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            callback(Ok(value));
        });
        Release::new(move || task.abort())
    })
}
