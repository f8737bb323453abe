//! Network and store doubles shared by the proxy tests.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cachefront_client::{FetchResponse, Fetcher};
use cachefront_core::{CacheDb, CacheKey, CacheStore, Error, Generation, RequestDescriptor, ResponseSnapshot};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

pub(crate) use cachefront_core::cache::testing::BrokenStore;

pub(crate) async fn memory_store() -> Arc<CacheDb> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

pub(crate) fn snapshot(status: u16, body: &'static str) -> ResponseSnapshot {
    ResponseSnapshot::new(status, Vec::new(), Bytes::from_static(body.as_bytes()))
}

/// Poll `done` for up to a second.
pub(crate) async fn wait_until(done: impl Fn() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Answers with a fixed status and body, or fails for selected paths.
pub(crate) struct StubFetcher {
    status: StatusCode,
    body: &'static str,
    headers: HeaderMap,
    down: bool,
    failing_paths: HashSet<&'static str>,
    pub(crate) calls: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
        Self::with_headers(status, body, &[])
    }

    /// Answers with extra response headers.
    pub(crate) fn with_headers(
        status: StatusCode, body: &'static str, headers: &[(&'static str, &'static str)],
    ) -> Arc<Self> {
        let headers = headers
            .iter()
            .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
            .collect();
        Arc::new(Self {
            status,
            body,
            headers,
            down: false,
            failing_paths: HashSet::new(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Every fetch fails with `network down`.
    pub(crate) fn down() -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            body: "",
            headers: HeaderMap::new(),
            down: true,
            failing_paths: HashSet::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing_on(paths: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            body: "ok",
            headers: HeaderMap::new(),
            down: false,
            failing_paths: paths.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down || self.failing_paths.contains(request.url().path()) {
            return Err(Error::Network("network down".into()));
        }

        Ok(FetchResponse {
            url: request.url().clone(),
            status: self.status,
            content_type: None,
            bytes: Bytes::from_static(self.body.as_bytes()),
            headers: self.headers.clone(),
            fetch_ms: 0,
        })
    }
}

/// Never completes a fetch.
pub(crate) struct PendingFetcher {
    pub(crate) calls: AtomicUsize,
}

impl PendingFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Fetcher for PendingFetcher {
    async fn fetch(&self, _request: &RequestDescriptor) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// SQLite store that refuses to delete one generation.
pub(crate) struct StickyStore {
    pub(crate) inner: Arc<CacheDb>,
    pub(crate) sticky: Generation,
}

#[async_trait]
impl CacheStore for StickyStore {
    async fn open_generation(&self, generation: &Generation) -> Result<(), Error> {
        self.inner.open_generation(generation).await
    }

    async fn get(&self, generation: &Generation, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.inner.get_snapshot(generation, key).await
    }

    async fn put(&self, generation: &Generation, key: &CacheKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.inner.put_snapshot(generation, key, snapshot).await
    }

    async fn list_generations(&self) -> Result<BTreeSet<Generation>, Error> {
        self.inner.list_generations().await
    }

    async fn delete_generation(&self, generation: &Generation) -> Result<u64, Error> {
        if *generation == self.sticky {
            return Err(Error::Serialization("database is locked".into()));
        }
        self.inner.delete_generation(generation).await
    }
}
