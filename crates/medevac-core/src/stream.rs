// ── Snapshot subscriptions ──
//
// Presentation layers subscribe to one emergency and re-render whenever
// a transition commits.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::engine::EmergencySnapshot;

/// Subscription to one emergency's committed state.
///
/// Provides point-in-time access plus change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct EmergencyStream {
    current: Arc<EmergencySnapshot>,
    receiver: watch::Receiver<Arc<EmergencySnapshot>>,
}

impl EmergencyStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<EmergencySnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<EmergencySnapshot> {
        &self.current
    }

    /// Whether a commit happened since the last `changed()`.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next commit. Returns `None` once the emergency is
    /// disposed or the engine dropped.
    pub async fn changed(&mut self) -> Option<Arc<EmergencySnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// Yields each commit after [`current()`](Self::current); ends when the
    /// emergency is disposed.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<EmergencySnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<EmergencySnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_stream::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::engine::EmergencyStateEngine;
    use crate::model::{EmergencyId, EmergencyStatus};
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn into_stream_yields_commits_after_current() {
        let engine = EmergencyStateEngine::new(MemoryStore::new());
        let id = EmergencyId::new("E1").unwrap();
        engine.load(&id, None).await.unwrap();
        let updates = engine.subscribe(&id).unwrap();
        assert_eq!(updates.current().status, EmergencyStatus::Pending);
        let mut stream = updates.into_stream();

        {
            let mut next = task::spawn(stream.next());
            assert_pending!(next.poll());
        }

        engine
            .attempt_transition(&id, EmergencyStatus::Active, None, None)
            .await
            .unwrap();
        let snap = stream.next().await.unwrap();
        assert_eq!(snap.status, EmergencyStatus::Active);
        assert_eq!(snap.history.len(), 2);

        engine.dispose(&id);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn changed_wakes_on_commit_and_ends_on_dispose() {
        let engine = EmergencyStateEngine::new(MemoryStore::new());
        let id = EmergencyId::new("E1").unwrap();
        engine.load(&id, None).await.unwrap();

        let mut stream = engine.subscribe(&id).unwrap();
        assert!(!stream.has_changed());

        {
            let mut next = task::spawn(stream.changed());
            assert_pending!(next.poll());

            engine
                .attempt_transition(&id, EmergencyStatus::Accepted, None, None)
                .await
                .unwrap();
            assert!(next.is_woken());
            let snap = assert_ready!(next.poll()).unwrap();
            assert_eq!(snap.status, EmergencyStatus::Accepted);
        }
        assert_eq!(stream.current().status, EmergencyStatus::Accepted);

        assert!(engine.dispose(&id));
        let mut next = task::spawn(stream.changed());
        assert!(assert_ready!(next.poll()).is_none());
    }
}
