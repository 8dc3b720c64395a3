//! N-to-1 joins.
//!
//! A combined signal subscribes to every input and keeps one slot per
//! input. Nothing is fired until every slot has loaded once; from then on
//! every individual input fire re-emits the full aggregate.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::signal::{Callback, Release, Signal};
use crate::error::{Fire, SignalError};

/// Slot array for one combine subscription.
struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T: Clone> Slots<T> {
    fn new(len: usize) -> Self {
        Self {
            values: vec![None; len],
            remaining: len,
        }
    }

    /// Store a value; returns the aggregate once every slot is loaded.
    fn load(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.values[index].replace(value).is_none() {
            self.remaining -= 1;
            if self.remaining == 0 {
                trace!(slots = self.values.len(), "combine fully loaded");
            }
        }
        if self.remaining > 0 {
            return None;
        }
        Some(self.values.iter().flatten().cloned().collect())
    }
}

/// Join a list of signals into a signal of their latest values, in order.
///
/// Fails with [`SignalError::EmptyCombine`] when `signals` is empty. An
/// `Err` fire from any input is forwarded immediately and does not touch
/// the slots.
pub fn combine_list<T>(signals: Vec<Signal<T>>) -> Result<Signal<Vec<T>>, SignalError>
where
    T: Clone + Send + Sync + 'static,
{
    if signals.is_empty() {
        return Err(SignalError::EmptyCombine);
    }
    Ok(combine_slots(signals, |values| values))
}

/// Join named signals into a signal of their latest values, keyed like the
/// input map.
///
/// Fails with [`SignalError::EmptyCombine`] when `signals` is empty.
pub fn combine_map<K, T>(signals: IndexMap<K, Signal<T>>) -> Result<Signal<IndexMap<K, T>>, SignalError>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    if signals.is_empty() {
        return Err(SignalError::EmptyCombine);
    }
    let (keys, signals): (Vec<K>, Vec<Signal<T>>) = signals.into_iter().unzip();
    Ok(combine_slots(signals, move |values| {
        keys.iter().cloned().zip(values).collect()
    }))
}

fn combine_slots<T, Out, F>(signals: Vec<Signal<T>>, assemble: F) -> Signal<Out>
where
    T: Clone + Send + Sync + 'static,
    Out: Clone + Send + Sync + 'static,
    F: Fn(Vec<T>) -> Out + Send + Sync + 'static,
{
    let assemble = Arc::new(assemble);
    Signal::new(move |callback: Callback<Out>| {
        let slots = Arc::new(Mutex::new(Slots::new(signals.len())));
        let released = Arc::new(AtomicBool::new(false));

        let releases: Vec<Release> = signals
            .iter()
            .enumerate()
            .map(|(index, signal)| {
                let (slots, released) = (slots.clone(), released.clone());
                let (assemble, callback) = (assemble.clone(), callback.clone());
                signal.subscribe(move |fire: Fire<T>| {
                    if released.load(Ordering::SeqCst) {
                        return;
                    }
                    let value = match fire {
                        Ok(value) => value,
                        Err(err) => return callback(Err(err)),
                    };
                    let aggregate = slots.lock().load(index, value);
                    if let Some(values) = aggregate {
                        callback(Ok(assemble(values)));
                    }
                })
            })
            .collect();

        let teardown = Release::all(releases);
        Release::new(move || {
            released.store(true, Ordering::SeqCst);
            teardown.release();
        })
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
