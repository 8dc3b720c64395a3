//! Inspection
//!
//! A debugging decorator that logs every fire crossing a signal, along with
//! connects and disconnects. It never changes what is delivered.
//!
//! # Numbering
//!
//! Inspected signals and their subscriptions are numbered so interleaved
//! log lines can be told apart. The counters live in an explicit
//! [`InspectContext`] rather than in process-wide state, so independent
//! pipelines (or tests) get independent numbering.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use super::signal::{Callback, Release, Signal};
use crate::error::Fire;

/// Numbering scope for inspected signals.
#[derive(Debug, Default)]
pub struct InspectContext {
    signals: AtomicU64,
}

impl InspectContext {
    /// Create a context whose numbering starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `signal` so every subscription to it is logged.
    ///
    /// Without a `name` the wrapper is called `INSPECT<nn>` after its number
    /// in this context.
    pub fn inspect<T>(&self, signal: &Signal<T>, name: Option<&str>) -> Signal<T>
    where
        T: Clone + Debug + Send + Sync + 'static,
    {
        let number = self.signals.fetch_add(1, Ordering::Relaxed);
        let name: Arc<str> = match name {
            Some(name) => name.into(),
            None => format!("INSPECT{number:02}").into(),
        };
        let subscriptions = Arc::new(AtomicU64::new(0));
        let upstream = signal.clone();

        Signal::new(move |callback: Callback<T>| {
            let sub = subscriptions.fetch_add(1, Ordering::Relaxed);
            let fires = Arc::new(AtomicU64::new(0));
            info!(signal = %name, upstream = upstream.id(), sub, "connected");

            let (log_name, log_fires) = (name.clone(), fires.clone());
            let inner = upstream.subscribe(move |fire: Fire<T>| {
                let index = log_fires.fetch_add(1, Ordering::Relaxed);
                info!(signal = %log_name, sub, index, ?fire, "fire");
                callback(fire);
            });

            let name = name.clone();
            Release::new(move || {
                inner.release();
                info!(signal = %name, sub, fires = fires.load(Ordering::Relaxed), "disconnected");
            })
        })
    }

    /// Number of signals wrapped through this context so far.
    pub fn inspected(&self) -> u64 {
        self.signals.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::writable;
    use parking_lot::Mutex;

    #[test]
    fn inspect_passes_fires_through() {
        let context = InspectContext::new();
        let (source, set) = writable(1);
        let inspected = context.inspect(&source, Some("source"));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let release = inspected.subscribe(move |fire| sink.lock().push(fire));
        set.set(2);
        release.release();
        set.set(3);

        assert_eq!(*seen.lock(), vec![Ok(1), Ok(2)]);
    }

    #[test]
    fn contexts_number_independently() {
        let (source, _set) = writable(0);

        let first = InspectContext::new();
        first.inspect(&source, None);
        first.inspect(&source, None);

        let second = InspectContext::new();
        second.inspect(&source, None);

        assert_eq!(first.inspected(), 2);
        assert_eq!(second.inspected(), 1);
    }
}
