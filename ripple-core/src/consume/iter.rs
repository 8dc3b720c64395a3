//! Push-to-pull adapter.
//!
//! A signal pushes whenever it likes; an [`Iter`] turns that into a
//! `Stream` a consumer pulls from at its own pace.
//!
//! # Buffering
//!
//! The stream accepts at most `limit` fires in total. Fires are parked in a
//! queue until polled; once the last accepted fire has been yielded, the
//! upstream subscription is released. Fires beyond the limit are dropped
//! and never queued.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_util::Stream;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::Fire;
use crate::reactive::{Release, Signal};

struct Buffer<T> {
    queue: VecDeque<Fire<T>>,
    accepted: usize,
    waker: Option<Waker>,
}

/// Lazy, single-pass stream over the fires of a signal.
///
/// Created by [`iter`]. The subscription starts on the first poll and ends
/// when the limit is reached or the stream is dropped. It cannot be
/// restarted; call [`iter`] again for a fresh subscription.
#[must_use = "streams do nothing unless polled"]
pub struct Iter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Present until the first poll subscribes.
    signal: Option<Signal<T>>,
    limit: Option<usize>,
    yielded: usize,
    buffer: Arc<Mutex<Buffer<T>>>,
    release: Option<Release>,
}

/// Iterate over the next `limit` fires of `signal`, or over all of them
/// when `limit` is `None`.
pub fn iter<T>(signal: &Signal<T>, limit: Option<usize>) -> Iter<T>
where
    T: Clone + Send + Sync + 'static,
{
    Iter {
        signal: Some(signal.clone()),
        limit,
        yielded: 0,
        buffer: Arc::new(Mutex::new(Buffer {
            queue: VecDeque::new(),
            accepted: 0,
            waker: None,
        })),
        release: None,
    }
}

impl<T> Iter<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }

    fn connect(&mut self, signal: Signal<T>) {
        let buffer = self.buffer.clone();
        let limit = self.limit;
        self.release = Some(signal.subscribe(move |fire| {
            let waker = {
                let mut buffer = buffer.lock();
                if limit.is_some_and(|limit| buffer.accepted >= limit) {
                    return;
                }
                buffer.accepted += 1;
                buffer.queue.push_back(fire);
                buffer.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }));
    }
}

impl<T> Stream for Iter<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = Fire<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.exhausted() {
            return Poll::Ready(None);
        }
        if let Some(signal) = this.signal.take() {
            this.connect(signal);
        }

        let next = {
            let mut buffer = this.buffer.lock();
            let next = buffer.queue.pop_front();
            if next.is_none() {
                buffer.waker = Some(cx.waker().clone());
            }
            next
        };

        match next {
            Some(fire) => {
                this.yielded += 1;
                if this.exhausted() {
                    trace!(yielded = this.yielded, "iter() reached its limit");
                    this.release.take();
                }
                Poll::Ready(Some(fire))
            }
            None => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let queued = self.buffer.lock().queue.len();
        (queued, self.limit.map(|limit| limit - self.yielded))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{writable, Callback};
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[tokio::test]
    async fn yields_synchronous_fires_in_order() {
        let burst = Signal::new(|callback: Callback<i32>| {
            for i in 0..10 {
                callback(Ok(i));
            }
            Release::noop()
        });

        let values: Vec<i32> = iter(&burst, Some(6)).map(|f| f.unwrap()).collect().await;
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn releases_after_last_value() {
        let (source, set) = writable(0);
        let mut stream = iter(&source, Some(2));

        assert_eq!(stream.next().await, Some(Ok(0)));
        assert_eq!(set.subscriber_count(), 1);

        set.set(1);
        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(set.subscriber_count(), 0);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn subscribes_lazily_and_releases_on_drop() {
        let connects = Arc::new(AtomicI32::new(0));
        let (source, set) = writable(0);
        let connects_clone = connects.clone();
        let counted = Signal::new(move |callback: Callback<i32>| {
            connects_clone.fetch_add(1, Ordering::SeqCst);
            source.subscribe_with(callback)
        });

        let mut stream = iter(&counted, None);
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        assert_eq!(stream.next().await, Some(Ok(0)));
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        drop(stream);
        assert_eq!(set.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn zero_limit_is_empty() {
        let (source, set) = writable(0);
        let mut stream = iter(&source, Some(0));
        assert_eq!(stream.next().await, None);
        assert_eq!(set.subscriber_count(), 0);
    }
}
