//! Change filtering.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use super::signal::{Callback, Release, Signal};
use crate::equality::Structural;
use crate::error::Fire;

/// The comparison a [`gate_with`] uses to decide whether a value changed.
///
/// The function returns `true` when its two arguments differ.
pub struct Differ<T> {
    differs: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T: 'static> Differ<T> {
    /// Deep structural comparison.
    pub fn deep() -> Self
    where
        T: Structural,
    {
        Self::custom(|a: &T, b: &T| a.deep_differs(b))
    }

    /// Shallow structural comparison.
    pub fn shallow() -> Self
    where
        T: Structural,
    {
        Self::custom(|a: &T, b: &T| a.shallow_differs(b))
    }

    /// Caller-supplied comparison.
    pub fn custom<F>(differs: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            differs: Arc::new(differs),
        }
    }

    /// Whether `next` differs from `prev`.
    pub fn differs(&self, next: &T, prev: &T) -> bool {
        (self.differs)(next, prev)
    }
}

impl<T> Clone for Differ<T> {
    fn clone(&self) -> Self {
        Self {
            differs: Arc::clone(&self.differs),
        }
    }
}

impl<T> Debug for Differ<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Differ").finish_non_exhaustive()
    }
}

/// Drop values that are deeply equal to the last delivered one.
pub fn gate<T>(upstream: &Signal<T>) -> Signal<T>
where
    T: Structural + Clone + Send + Sync + 'static,
{
    gate_with(upstream, Differ::deep())
}

/// Drop values that `differ` considers unchanged.
///
/// The first value always passes. Each later value passes iff it differs
/// from the last value that passed, which becomes the new baseline. `Err`
/// fires always pass and leave the baseline untouched.
pub fn gate_with<T>(upstream: &Signal<T>, differ: Differ<T>) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    let upstream = upstream.clone();
    Signal::new(move |callback: Callback<T>| {
        let baseline: Mutex<Option<T>> = Mutex::new(None);
        let differ = differ.clone();
        upstream.subscribe(move |fire: Fire<T>| {
            let value = match fire {
                Ok(value) => value,
                Err(err) => return callback(Err(err)),
            };
            {
                let mut last = baseline.lock();
                if let Some(prev) = last.as_ref() {
                    if !differ.differs(&value, prev) {
                        return;
                    }
                }
                *last = Some(value.clone());
            }
            callback(Ok(value));
        })
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
