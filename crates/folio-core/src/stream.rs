// ── Reactive field streams ──
//
// Subscription types for consuming field state changes from the DataStore.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::RequestState;

/// A subscription to one store field.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct FieldStream<T: Clone + Default + Send + Sync + 'static> {
    current: RequestState<T>,
    receiver: watch::Receiver<RequestState<T>>,
}

impl<T: Clone + Default + Send + Sync + 'static> FieldStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<RequestState<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time.
    pub fn current(&self) -> &RequestState<T> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> RequestState<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the sender (DataStore) has been dropped.
    pub async fn changed(&mut self) -> Option<RequestState<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> FieldWatchStream<T> {
        FieldWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields a new `RequestState<T>` snapshot on each field transition.
pub struct FieldWatchStream<T: Clone + Default + Send + Sync + 'static> {
    inner: WatchStream<RequestState<T>>,
}

impl<T: Clone + Default + Send + Sync + 'static> Stream for FieldWatchStream<T> {
    type Item = RequestState<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin when the inner type is Unpin, which
        // RequestState<T> always is.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
