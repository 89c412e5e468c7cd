#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, Response, header},
    middleware,
    routing::get,
};
use bytes::Bytes;
use docs_cache::cache::{
    CacheConfig, CacheInvalidationError, CacheKey, CacheState, CacheStore, CacheStoreError,
    MemoryStore, Rejection, docs_cache_layer,
};
use http_body_util::BodyExt;
use tracing_subscriber::fmt::MakeWriter;

/// Store wrapper that counts calls and can refuse chosen keys.
pub struct CountingStore {
    inner: MemoryStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub invalidations: AtomicUsize,
    rejections: HashMap<String, String>,
    failing_gets: bool,
    offline_invalidation: bool,
}

impl CountingStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: MemoryStore::new(config),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
            rejections: HashMap::new(),
            failing_gets: false,
            offline_invalidation: false,
        }
    }

    pub fn rejecting(mut self, key: &str, reason: &str) -> Self {
        self.rejections.insert(key.to_string(), reason.to_string());
        self
    }

    /// Every `get` fails with [`CacheStoreError::Unavailable`].
    pub fn failing_gets(mut self) -> Self {
        self.failing_gets = true;
        self
    }

    /// Every `invalidate_many` fails with [`CacheStoreError::Unavailable`].
    pub fn offline_invalidation(mut self) -> Self {
        self.offline_invalidation = true;
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, key: &str) -> Option<Bytes> {
        self.inner
            .get(&CacheKey::new(key))
            .await
            .expect("memory store get")
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheStoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets {
            return Err(CacheStoreError::unavailable("read replica unreachable"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, payload: Bytes) -> Result<(), CacheStoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, payload).await
    }

    async fn invalidate_many(&self, keys: &[CacheKey]) -> Result<Vec<CacheKey>, CacheStoreError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        if self.offline_invalidation {
            return Err(CacheStoreError::unavailable("store offline"));
        }

        let (rejected, accepted): (Vec<CacheKey>, Vec<CacheKey>) = keys
            .iter()
            .cloned()
            .partition(|key| self.rejections.contains_key(key.as_str()));
        let invalidated = self.inner.invalidate_many(&accepted).await?;

        if rejected.is_empty() {
            return Ok(invalidated);
        }

        let rejections = rejected
            .into_iter()
            .map(|key| Rejection {
                reason: self.rejections[key.as_str()].clone(),
                key,
            })
            .collect();
        Err(CacheInvalidationError::new(invalidated, rejections).into())
    }
}

/// Origin handler call counter.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Router with a counting origin at `/static/docs/{*path}` behind the cache layer.
///
/// `missing.html` answers 404, `big.html` returns `big_len` bytes,
/// `stream.html` returns three chunks and `broken.html` fails mid-stream.
/// Any request carrying `Range` gets a 206 with the first three bytes.
pub fn docs_app(config: CacheConfig, store: Arc<CountingStore>, calls: Calls, big_len: usize) -> Router {
    let store: Arc<dyn CacheStore> = store;
    let state = CacheState::new(config, store);

    Router::new()
        .route(
            "/static/docs/{*path}",
            get(
                move |axum::extract::Path(path): axum::extract::Path<String>, headers: HeaderMap| {
                    let calls = calls.clone();
                    async move {
                        calls.hit();
                        if headers.contains_key(header::RANGE) {
                            return partial_response(&path);
                        }
                        origin_response(&path, big_len)
                    }
                },
            ),
        )
        .route("/other/{*path}", get(|| async { "other" }))
        .layer(middleware::from_fn_with_state(state, docs_cache_layer))
}

fn partial_response(path: &str) -> Response<Body> {
    let full = format!("<html>{path}</html>");
    Response::builder()
        .status(206)
        .header("content-type", "text/html")
        .header("content-range", format!("bytes 0-2/{}", full.len()))
        .body(Body::from(full[..3].to_string()))
        .expect("response")
}

fn origin_response(path: &str, big_len: usize) -> Response<Body> {
    let builder = Response::builder().header("content-type", "text/html");
    match path {
        "missing.html" => builder
            .status(404)
            .body(Body::from("not here"))
            .expect("response"),
        "big.html" => builder
            .body(Body::from(vec![b'x'; big_len]))
            .expect("response"),
        "stream.html" => {
            let chunks = ["<p>one</p>", "<p>two</p>", "<p>three</p>"]
                .into_iter()
                .map(|chunk| Ok::<_, io::Error>(Bytes::from_static(chunk.as_bytes())));
            builder
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .expect("response")
        }
        "broken.html" => {
            let frames = vec![
                Ok(Bytes::from_static(b"<p>partial")),
                Err(io::Error::other("origin went away")),
            ];
            builder
                .body(Body::from_stream(futures::stream::iter(frames)))
                .expect("response")
        }
        other => builder
            .body(Body::from(format!("<html>{other}</html>")))
            .expect("response"),
    }
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

/// Give spawned commit tasks a chance to run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Wait until the store has seen `expected` writes.
pub async fn wait_for_sets(store: &CountingStore, expected: usize) {
    for _ in 0..100 {
        if store.sets() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {expected} store writes, saw {}", store.sets());
}

/// In-memory log sink for asserting on emitted lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
