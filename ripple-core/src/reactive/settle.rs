//! Debounce.
//!
//! `settle` introduces timing-based nondeterminism on purpose. Use it only
//! as the last stage before handing values to a presentation layer that
//! renders on its own schedule, never in the middle of a pipeline.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::warn;

use super::signal::{Callback, Release, Signal};
use crate::config::SettleConfig;
use crate::error::Fire;

struct Debounce<T> {
    latest: Option<Fire<T>>,
    timer: Option<AbortHandle>,
    generation: u64,
    first: bool,
    released: bool,
}

/// Coalesce bursts: deliver the latest fire once upstream has been quiet
/// for `config.quiet`.
///
/// Every arrival restarts the quiet period. With `config.leading` the very
/// first arrival is also delivered immediately, in addition to being
/// buffered. Releasing cancels any pending delivery.
///
/// Outside a tokio runtime there is no timer to wait on and every fire is
/// passed straight through.
pub fn settle<T>(upstream: &Signal<T>, config: SettleConfig) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    let upstream = upstream.clone();
    Signal::new(move |callback: Callback<T>| {
        let state = Arc::new(Mutex::new(Debounce {
            latest: None,
            timer: None,
            generation: 0,
            first: true,
            released: false,
        }));

        let shared = state.clone();
        let inner = upstream.subscribe(move |fire: Fire<T>| {
            let handle = match Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    warn!("settle() fired outside a tokio runtime, passing through");
                    return callback(fire);
                }
            };

            let leading = {
                let mut debounce = shared.lock();
                if debounce.released {
                    return;
                }
                debounce.latest = Some(fire.clone());
                let leading = config.leading && debounce.first;
                debounce.first = false;
                debounce.generation += 1;
                if let Some(timer) = debounce.timer.take() {
                    timer.abort();
                }

                let generation = debounce.generation;
                let (state, callback) = (shared.clone(), callback.clone());
                let quiet = config.quiet;
                let task = handle.spawn(async move {
                    tokio::time::sleep(quiet).await;
                    let fire = {
                        let mut debounce = state.lock();
                        if debounce.released || debounce.generation != generation {
                            return;
                        }
                        debounce.timer = None;
                        debounce.latest.take()
                    };
                    if let Some(fire) = fire {
                        callback(fire);
                    }
                });
                debounce.timer = Some(task.abort_handle());
                leading
            };

            if leading {
                callback(fire);
            }
        });

        Release::new(move || {
            inner.release();
            let mut debounce = state.lock();
            debounce.released = true;
            debounce.latest = None;
            if let Some(timer) = debounce.timer.take() {
                timer.abort();
            }
        })
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
