//! Memo Implementation
//!
//! A memo multiplexes one upstream signal across any number of downstream
//! subscribers while holding exactly one upstream subscription.
//!
//! # How Memos Work
//!
//! 1. The first downstream subscriber connects upstream. Every upstream fire
//!    is cached and forwarded to all current subscribers.
//!
//! 2. A subscriber that joins while connected immediately receives the
//!    cached fire. If upstream has not fired yet there is nothing cached and
//!    the newcomer simply waits for the first upstream fire.
//!
//! 3. When the last subscriber releases, upstream is disconnected and the
//!    cache cleared. The next subscriber opens a fresh connection.
//!
//! # Connections
//!
//! Each connection carries an epoch number. Fires tagged with an older
//! epoch are dropped, so a disconnected upstream can never leak stale values
//! into a newer connection.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::signal::{Callback, Release, Signal};
use super::subscriber::SubscriberSet;
use crate::error::Fire;

/// Connection state of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// No subscribers, no upstream subscription.
    Idle,

    /// Upstream `subscribe` is running for the first subscriber.
    Connecting,

    /// Upstream subscription is live.
    Connected,
}

struct MemoInner<T> {
    state: MemoState,
    epoch: u64,
    cached: Option<Fire<T>>,
    subscribers: SubscriberSet<T>,
    upstream: Option<Release>,
}

/// Share one upstream subscription between many subscribers.
pub fn memo<T>(upstream: &Signal<T>) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    let upstream = upstream.clone();
    let inner = Arc::new(Mutex::new(MemoInner {
        state: MemoState::Idle,
        epoch: 0,
        cached: None,
        subscribers: SubscriberSet::new(),
        upstream: None,
    }));

    Signal::new(move |callback: Callback<T>| {
        let (id, action) = {
            let mut guard = inner.lock();
            let id = guard.subscribers.insert(callback.clone());
            let action = match guard.state {
                MemoState::Idle => {
                    guard.state = MemoState::Connecting;
                    guard.epoch += 1;
                    Join::Connect(guard.epoch)
                }
                _ => Join::Replay(guard.cached.clone()),
            };
            (id, action)
        };

        match action {
            Join::Replay(Some(fire)) => callback(fire),
            Join::Replay(None) => {}
            Join::Connect(epoch) => connect(&inner, &upstream, epoch),
        }

        let inner = inner.clone();
        Release::new(move || {
            // Dropped outside the lock: releasing upstream may fire re-entrantly.
            let upstream = {
                let mut guard = inner.lock();
                guard.subscribers.remove(id);
                if !guard.subscribers.is_empty() {
                    return;
                }
                guard.state = MemoState::Idle;
                guard.cached = None;
                guard.upstream.take()
            };
            if upstream.is_some() {
                debug!("memo disconnecting upstream");
            }
            drop(upstream);
        })
    })
}

enum Join<T> {
    Connect(u64),
    Replay(Option<Fire<T>>),
}

fn connect<T>(inner: &Arc<Mutex<MemoInner<T>>>, upstream: &Signal<T>, epoch: u64)
where
    T: Clone + Send + Sync + 'static,
{
    debug!(epoch, "memo connecting upstream");
    let shared = inner.clone();
    let release = upstream.subscribe(move |fire: Fire<T>| {
        let snapshot = {
            let mut guard = shared.lock();
            if guard.epoch != epoch || guard.state == MemoState::Idle {
                return;
            }
            guard.cached = Some(fire.clone());
            guard.subscribers.snapshot()
        };
        for entry in snapshot {
            entry.notify(fire.clone());
        }
    });

    let mut guard = inner.lock();
    if guard.epoch == epoch && guard.state == MemoState::Connecting {
        guard.state = MemoState::Connected;
        guard.upstream = Some(release);
    } else {
        // Every subscriber left while upstream was still connecting.
        drop(guard);
        release.release();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
