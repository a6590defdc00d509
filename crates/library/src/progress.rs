//! Scan progress fan-out.
//!
//! One producer (the scanner) publishes fractions in `[0, 1]`; any number of
//! subscribers receive the latest fraction the moment they subscribe, then
//! every later one in publish order. Each subscriber has its own unbounded
//! queue, so a slow (or forgotten) subscriber never holds up the producer.

use async_stream::stream;
use futures::Stream;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

/// A progress fraction, or `None` while the number of files is not yet known.
pub type Progress = Option<f64>;

#[derive(Default)]
struct Inner {
    latest: Progress,
    subscribers: Vec<UnboundedSender<f64>>,
}

#[derive(Default)]
pub struct ProgressHub {
    inner: Mutex<Inner>,
}
impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded state is always consistent between statements.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The most recently published value.
    pub fn latest(&self) -> Progress {
        self.lock().latest
    }

    /// Publish a new value to every current subscriber. Never blocks beyond
    /// the hub's own bookkeeping.
    pub fn publish(&self, value: f64) {
        let mut inner = self.lock();
        inner.latest = Some(value);
        // Subscribers whose stream was dropped are forgotten here.
        inner.subscribers.retain(|tx| tx.send(value).is_ok());
    }

    /// Number of subscribers that are still listening (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Subscribe to progress updates.
    ///
    /// The stream first yields the latest value (which is `None` if nothing
    /// has been published yet), then every value published afterwards. It
    /// never ends on its own; drop it to unsubscribe.
    pub fn subscribe(&self) -> impl Stream<Item = Progress> + Send + 'static {
        let (tx, mut rx) = unbounded_channel();
        // Snapshot and registration happen under the same lock, so no value
        // can fall between the two.
        let first = {
            let mut inner = self.lock();
            inner.subscribers.push(tx);
            inner.latest
        };
        stream! {
            yield first;
            while let Some(value) = rx.recv().await {
                yield Some(value);
            }
        }
    }
}
