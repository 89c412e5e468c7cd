//! Per-request capture state.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use metrics::counter;
use tracing::{debug, warn};

use super::keys::CacheKey;
use super::store::CacheStore;

const METRIC_CACHE_COMMIT_TOTAL: &str = "docs_cache_commit_total";
const METRIC_CACHE_DISCARD_TOTAL: &str = "docs_cache_discard_total";
const METRIC_CACHE_COMMIT_ERROR_TOTAL: &str = "docs_cache_commit_error_total";

/// Lifecycle of a [`CaptureSession`].
///
/// Only `Capturing` accepts transitions; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Capturing,
    ShortCircuited,
    Committed,
    Discarded,
}

/// Why a session gave up on its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Origin answered with a response that must not be cached.
    NotCacheable,
    /// Origin answered with an empty body.
    EmptyBody,
    /// Buffered bytes would exceed the configured limit.
    TooLarge,
    /// The body stream yielded an error.
    TransferError,
    /// The body was dropped before its end, usually a client disconnect.
    Interrupted,
}

impl DiscardReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotCacheable => "not_cacheable",
            Self::EmptyBody => "empty_body",
            Self::TooLarge => "too_large",
            Self::TransferError => "transfer_error",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Buffer of the bytes sent for one cacheable request.
///
/// Created as soon as a request is classified cacheable. Chunks are kept in
/// the order they were recorded and concatenated only at commit. Dropping a
/// session that is still capturing discards it.
pub struct CaptureSession {
    key: CacheKey,
    store: Arc<dyn CacheStore>,
    chunks: Vec<Bytes>,
    buffered: usize,
    limit: usize,
    state: CaptureState,
}

impl CaptureSession {
    pub fn new(key: CacheKey, store: Arc<dyn CacheStore>, limit: usize) -> Self {
        Self {
            key,
            store,
            chunks: Vec::new(),
            buffered: 0,
            limit,
            state: CaptureState::Capturing,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Append a chunk. Ignored unless capturing.
    pub fn record(&mut self, chunk: &Bytes) {
        if self.state != CaptureState::Capturing {
            return;
        }
        if self.buffered.saturating_add(chunk.len()) > self.limit {
            self.discard(DiscardReason::TooLarge);
            return;
        }
        self.buffered += chunk.len();
        self.chunks.push(chunk.clone());
    }

    /// The request was answered from cache; nothing will ever be committed.
    pub fn short_circuit(&mut self) {
        if self.state == CaptureState::Capturing {
            self.state = CaptureState::ShortCircuited;
            self.release();
        }
    }

    pub fn discard(&mut self, reason: DiscardReason) {
        if self.state != CaptureState::Capturing {
            return;
        }
        self.state = CaptureState::Discarded;
        self.release();
        counter!(METRIC_CACHE_DISCARD_TOTAL, "reason" => reason.as_str()).increment(1);
        debug!(
            cache = "docs",
            key = %self.key,
            outcome = "discard",
            reason = reason.as_str(),
            "capture discarded"
        );
    }

    /// The response went out completely; hand the payload to the store.
    ///
    /// The write runs on a spawned task so the response never waits on it.
    pub fn commit(&mut self) {
        if self.state != CaptureState::Capturing {
            return;
        }
        self.state = CaptureState::Committed;

        let payload = concat(std::mem::take(&mut self.chunks), self.buffered);
        self.buffered = 0;
        let store = Arc::clone(&self.store);
        let key = self.key.clone();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(key = %key, "no runtime available, dropping cache commit");
            return;
        };

        debug!(
            cache = "docs",
            key = %key,
            outcome = "commit",
            bytes = payload.len(),
            "committing captured response"
        );
        counter!(METRIC_CACHE_COMMIT_TOTAL).increment(1);

        runtime.spawn(async move {
            if let Err(err) = store.set(&key, payload).await {
                counter!(METRIC_CACHE_COMMIT_ERROR_TOTAL).increment(1);
                warn!(key = %key, error = %err, "failed to store captured response");
            }
        });
    }

    fn release(&mut self) {
        self.chunks = Vec::new();
        self.buffered = 0;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.discard(DiscardReason::Interrupted);
    }
}

fn concat(chunks: Vec<Bytes>, len: usize) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.into_iter().next().unwrap_or_default(),
        _ => {
            let mut payload = BytesMut::with_capacity(len);
            for chunk in chunks {
                payload.put(chunk);
            }
            payload.freeze()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::store::CacheStoreError;

    #[derive(Default)]
    struct RecordingStore {
        sets: Mutex<Vec<(CacheKey, Bytes)>>,
    }

    impl RecordingStore {
        fn sets(&self) -> Vec<(CacheKey, Bytes)> {
            self.sets.lock().expect("sets lock").clone()
        }
    }

    #[async_trait]
    impl CacheStore for RecordingStore {
        async fn get(&self, _key: &CacheKey) -> Result<Option<Bytes>, CacheStoreError> {
            Ok(None)
        }

        async fn set(&self, key: &CacheKey, payload: Bytes) -> Result<(), CacheStoreError> {
            self.sets
                .lock()
                .expect("sets lock")
                .push((key.clone(), payload));
            Ok(())
        }

        async fn invalidate_many(
            &self,
            _keys: &[CacheKey],
        ) -> Result<Vec<CacheKey>, CacheStoreError> {
            Ok(Vec::new())
        }
    }

    fn session(store: &Arc<RecordingStore>, limit: usize) -> CaptureSession {
        let store: Arc<dyn CacheStore> = store.clone();
        CaptureSession::new(CacheKey::new("guide/index.html"), store, limit)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn commit_stores_chunks_in_order() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 1024);

        session.record(&Bytes::from_static(b"head|"));
        session.record(&Bytes::from_static(b"one|"));
        session.record(&Bytes::from_static(b"two"));
        session.commit();
        assert_eq!(session.state(), CaptureState::Committed);

        settle().await;
        let sets = store.sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].0, CacheKey::new("guide/index.html"));
        assert_eq!(sets[0].1, Bytes::from_static(b"head|one|two"));
    }

    #[tokio::test]
    async fn commits_at_most_once() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 1024);

        session.record(&Bytes::from_static(b"body"));
        session.commit();
        session.commit();
        session.record(&Bytes::from_static(b"late"));
        drop(session);

        settle().await;
        assert_eq!(store.sets().len(), 1);
    }

    #[tokio::test]
    async fn short_circuit_blocks_commit() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 1024);

        session.short_circuit();
        session.record(&Bytes::from_static(b"body"));
        session.commit();
        assert_eq!(session.state(), CaptureState::ShortCircuited);

        settle().await;
        assert!(store.sets().is_empty());
    }

    #[tokio::test]
    async fn discard_is_terminal() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 1024);

        session.record(&Bytes::from_static(b"partial"));
        session.discard(DiscardReason::TransferError);
        session.commit();
        assert_eq!(session.state(), CaptureState::Discarded);
        assert_eq!(session.buffered(), 0);

        settle().await;
        assert!(store.sets().is_empty());
    }

    #[tokio::test]
    async fn exceeding_limit_discards() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 8);

        session.record(&Bytes::from_static(b"12345"));
        assert_eq!(session.state(), CaptureState::Capturing);
        session.record(&Bytes::from_static(b"6789"));
        assert_eq!(session.state(), CaptureState::Discarded);
        session.commit();

        settle().await;
        assert!(store.sets().is_empty());
    }

    #[tokio::test]
    async fn dropping_while_capturing_discards() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session(&store, 1024);
        session.record(&Bytes::from_static(b"partial"));
        drop(session);

        settle().await;
        assert!(store.sets().is_empty());
    }
}
