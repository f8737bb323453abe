//! Cache-first interception of origin requests.
//!
//! The proxy has three entry points, called by the host:
//!
//! - [`InterceptProxy::on_install`] seeds the current generation.
//! - [`InterceptProxy::on_activate`] removes every other generation.
//! - [`InterceptProxy::intercept`] answers a single request.
//!
//! Cacheable requests are served from the current generation when a snapshot
//! exists, with a background refresh; otherwise they wait for the network.

pub mod bootstrap;
pub mod gc;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use cachefront_client::{Fetcher, RevalidationEngine, classify};
use cachefront_core::{CacheHandle, CacheStore, Error, Generation, RequestDescriptor, ResponseSnapshot};
use http::Method;
use url::Url;

pub use bootstrap::{Bootstrapper, InstallReport};
pub use gc::{GcReport, GenerationGc};

use crate::error::CannotLoad;

/// Outcome of intercepting a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Not handled by the cache; the host sends the request as-is.
    Passthrough,
    /// Served from the current generation.
    Hit(ResponseSnapshot),
    /// Fetched from the network (and cached if it was a shareable 200).
    Miss(ResponseSnapshot),
    /// Cache miss with a failed fetch.
    Failed(CannotLoad),
}

#[derive(Clone)]
pub struct InterceptProxy {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    engine: RevalidationEngine,
    origin: Url,
    seed_paths: Vec<String>,
}

impl InterceptProxy {
    pub fn new(
        store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, generation: Generation, origin: Url,
        seed_paths: Vec<String>,
    ) -> Self {
        let engine = RevalidationEngine::new(fetcher.clone(), store.clone(), generation);
        Self { store, fetcher, engine, origin, seed_paths }
    }

    pub fn generation(&self) -> &Generation {
        self.engine.generation()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Pre-populate the current generation with the seed paths.
    pub async fn on_install(&self) -> InstallReport {
        Bootstrapper::new(self.engine.clone())
            .run(&self.origin, &self.seed_paths)
            .await
    }

    /// Delete every generation other than the current one.
    pub async fn on_activate(&self) -> GcReport {
        GenerationGc::new(self.store.clone()).run(self.generation()).await
    }

    /// Decide how `request` is answered.
    ///
    /// Only `GET` requests in a cacheable category go through the cache. A
    /// store that cannot be opened or read counts as a miss.
    pub async fn intercept(&self, request: &RequestDescriptor) -> Interception {
        if *request.method() != Method::GET {
            return Interception::Passthrough;
        }

        let category = classify(request);
        if !category.is_cacheable() {
            tracing::trace!(url = %request.url(), category = category.as_str(), "passthrough");
            return Interception::Passthrough;
        }

        if let Some(snapshot) = self.lookup(request).await {
            tracing::debug!(url = %request.url(), generation = %self.generation(), "cache hit");
            self.refresh_in_background(request.clone());
            return Interception::Hit(snapshot);
        }

        tracing::debug!(url = %request.url(), generation = %self.generation(), "cache miss");
        match self.engine.revalidate(request).await {
            Ok(snapshot) => Interception::Miss(snapshot),
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "cannot load");
                Interception::Failed(CannotLoad::from(e))
            }
        }
    }

    /// Send a request the cache does not handle straight to the origin.
    pub async fn passthrough(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let response = self.fetcher.fetch(request).await?;
        Ok(response.into_snapshot())
    }

    async fn lookup(&self, request: &RequestDescriptor) -> Option<ResponseSnapshot> {
        let found = match CacheHandle::open(self.store.clone(), self.generation().clone()).await {
            Ok(cache) => cache.get(request).await,
            Err(e) => Err(e),
        };

        found.unwrap_or_else(|e| {
            tracing::warn!(url = %request.url(), error = %e, "cache lookup failed, using network");
            None
        })
    }

    /// Revalidate without holding up the response. The outcome is dropped.
    fn refresh_in_background(&self, request: RequestDescriptor) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.revalidate(&request).await {
                tracing::debug!(url = %request.url(), error = %e, "background refresh failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BrokenStore, PendingFetcher, StubFetcher, memory_store, snapshot, wait_until};
    use super::*;
    use bytes::Bytes;
    use cachefront_core::{CacheDb, CacheKey};
    use http::StatusCode;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn origin() -> Url {
        Url::parse("https://files.example.com/").unwrap()
    }

    fn proxy(store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> InterceptProxy {
        InterceptProxy::new(
            store,
            fetcher,
            Generation::from("v0.4"),
            origin(),
            vec!["/".to_string(), "/api/config".to_string()],
        )
    }

    async fn cached(db: &CacheDb, request: &RequestDescriptor) -> Option<ResponseSnapshot> {
        db.get_snapshot(&Generation::from("v0.4"), &CacheKey::for_request(request))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_hit_does_not_wait_for_network() {
        let db = memory_store().await;
        let request = RequestDescriptor::get("https://files.example.com/assets/app.js").unwrap();
        db.put_snapshot(&Generation::from("v0.4"), &CacheKey::for_request(&request), &snapshot(200, "A"))
            .await
            .unwrap();

        let fetcher = PendingFetcher::new();
        let proxy = proxy(db, fetcher.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(500), proxy.intercept(&request))
            .await
            .expect("hit must not block on the network");
        match outcome {
            Interception::Hit(snap) => assert_eq!(snap.body().as_ref(), b"A"),
            other => panic!("expected hit, got {other:?}"),
        }

        wait_until(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_hit_refreshes_in_background() {
        let db = memory_store().await;
        let request = RequestDescriptor::get("https://files.example.com/manifest.json").unwrap();
        db.put_snapshot(&Generation::from("v0.4"), &CacheKey::for_request(&request), &snapshot(200, "old"))
            .await
            .unwrap();

        let proxy = proxy(db.clone(), StubFetcher::new(StatusCode::OK, "new"));

        match proxy.intercept(&request).await {
            Interception::Hit(snap) => assert_eq!(snap.body().as_ref(), b"old"),
            other => panic!("expected hit, got {other:?}"),
        }

        for _ in 0..100 {
            if cached(&db, &request).await.map(|s| s.body().clone()) == Some(Bytes::from_static(b"new")) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("background refresh never replaced the snapshot");
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let db = memory_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, "{\"a\":1}");
        let proxy = proxy(db.clone(), fetcher.clone());
        let request = RequestDescriptor::get("https://files.example.com/api/config").unwrap();

        match proxy.intercept(&request).await {
            Interception::Miss(snap) => assert_eq!(snap.body().as_ref(), b"{\"a\":1}"),
            other => panic!("expected miss, got {other:?}"),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let stored = cached(&db, &request).await.unwrap();
        assert_eq!(stored.body().as_ref(), b"{\"a\":1}");

        assert!(matches!(proxy.intercept(&request).await, Interception::Hit(_)));
    }

    #[tokio::test]
    async fn test_miss_not_found_is_not_cached() {
        let db = memory_store().await;
        let proxy = proxy(db.clone(), StubFetcher::new(StatusCode::NOT_FOUND, "missing"));
        let request = RequestDescriptor::get("https://files.example.com/files/missing.txt").unwrap();

        match proxy.intercept(&request).await {
            Interception::Miss(snap) => assert_eq!(snap.status(), 404),
            other => panic!("expected miss, got {other:?}"),
        }
        assert!(cached(&db, &request).await.is_none());
    }

    #[tokio::test]
    async fn test_miss_with_network_down_cannot_load() {
        let db = memory_store().await;
        let proxy = proxy(db.clone(), StubFetcher::down());

        for url in [
            "https://files.example.com/api/config",
            "https://files.example.com/assets/js/app.js",
            "https://files.example.com/",
        ] {
            let request = RequestDescriptor::get(url).unwrap();
            match proxy.intercept(&request).await {
                Interception::Failed(body) => {
                    assert_eq!(body, CannotLoad::new("network down"));
                    assert_eq!(body.code, "CANNOT_LOAD");
                }
                other => panic!("expected failure for {url}, got {other:?}"),
            }
            assert!(cached(&db, &request).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_session_cookie_is_not_replayed_to_other_clients() {
        let db = memory_store().await;
        let fetcher = StubFetcher::with_headers(
            StatusCode::OK,
            "<html>welcome alice</html>",
            &[("set-cookie", "session=alice-secret; HttpOnly")],
        );
        let proxy = proxy(db.clone(), fetcher.clone());

        let mut alice_headers = http::HeaderMap::new();
        alice_headers.insert(http::header::COOKIE, "session=alice-secret".parse().unwrap());
        let alice = RequestDescriptor::get("https://files.example.com/login")
            .unwrap()
            .with_headers(alice_headers);
        match proxy.intercept(&alice).await {
            Interception::Miss(snap) => assert_eq!(snap.header("set-cookie"), Some("session=alice-secret; HttpOnly")),
            other => panic!("expected miss, got {other:?}"),
        }
        assert!(cached(&db, &alice).await.is_none());

        let bob = RequestDescriptor::get("https://files.example.com/login").unwrap();
        assert!(!matches!(proxy.intercept(&bob).await, Interception::Hit(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_private_response_is_not_cached() {
        let db = memory_store().await;
        let proxy = proxy(
            db.clone(),
            StubFetcher::with_headers(StatusCode::OK, "mine", &[("cache-control", "private, max-age=60")]),
        );
        let request = RequestDescriptor::get("https://files.example.com/files/notes.md").unwrap();

        assert!(matches!(proxy.intercept(&request).await, Interception::Miss(_)));
        assert!(cached(&db, &request).await.is_none());
    }

    #[tokio::test]
    async fn test_redirect_reaches_caller_uncached() {
        let db = memory_store().await;
        let proxy = proxy(db.clone(), StubFetcher::with_headers(StatusCode::FOUND, "", &[("location", "/login")]));
        let request = RequestDescriptor::get("https://files.example.com/logout").unwrap();

        match proxy.intercept(&request).await {
            Interception::Miss(snap) => {
                assert_eq!(snap.status(), 302);
                assert_eq!(snap.header("location"), Some("/login"));
            }
            other => panic!("expected miss, got {other:?}"),
        }
        assert!(cached(&db, &request).await.is_none());
    }

    #[tokio::test]
    async fn test_config_with_query_passes_through() {
        let db = memory_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, "{}");
        let proxy = proxy(db.clone(), fetcher.clone());
        let request = RequestDescriptor::get("https://files.example.com/api/config?v=2").unwrap();

        assert_eq!(proxy.intercept(&request).await, Interception::Passthrough);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_api_calls_pass_through() {
        let db = memory_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, "[]");
        let proxy = proxy(db.clone(), fetcher.clone());
        let request = RequestDescriptor::get("https://files.example.com/api/files/ls").unwrap();

        assert_eq!(proxy.intercept(&request).await, Interception::Passthrough);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(cached(&db, &request).await.is_none());
    }

    #[tokio::test]
    async fn test_unmatched_and_non_get_pass_through() {
        let db = memory_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, "x");
        let proxy = proxy(db.clone(), fetcher.clone());

        let robots = RequestDescriptor::get("https://files.example.com/robots.txt").unwrap();
        assert_eq!(proxy.intercept(&robots).await, Interception::Passthrough);

        let upload = RequestDescriptor::new(Method::POST, Url::parse("https://files.example.com/files").unwrap())
            .with_body(Bytes::from_static(b"data"));
        assert_eq!(proxy.intercept(&upload).await, Interception::Passthrough);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_network() {
        let fetcher = StubFetcher::new(StatusCode::OK, "<html></html>");
        let proxy = proxy(Arc::new(BrokenStore), fetcher.clone());
        let request = RequestDescriptor::get("https://files.example.com/login").unwrap();

        match proxy.intercept(&request).await {
            Interception::Miss(snap) => assert_eq!(snap.body().as_ref(), b"<html></html>"),
            other => panic!("expected miss, got {other:?}"),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_passthrough_forwards_to_fetcher() {
        let db = memory_store().await;
        let fetcher = StubFetcher::new(StatusCode::CREATED, "ok");
        let proxy = proxy(db, fetcher.clone());
        let request = RequestDescriptor::new(Method::POST, Url::parse("https://files.example.com/api/share").unwrap());

        let snap = proxy.passthrough(&request).await.unwrap();
        assert_eq!(snap.status(), 201);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let db = memory_store().await;
        db.put_snapshot(
            &Generation::from("v0.3"),
            &CacheKey::for_request(&RequestDescriptor::get("https://files.example.com/").unwrap()),
            &snapshot(200, "stale"),
        )
        .await
        .unwrap();

        let proxy = proxy(db.clone(), StubFetcher::new(StatusCode::OK, "fresh"));

        let install = proxy.on_install().await;
        assert_eq!(install.seeded.len(), 2);
        assert!(install.skip_waiting);

        let activation = proxy.on_activate().await;
        assert_eq!(activation.removed, vec![Generation::from("v0.3")]);

        let generations = db.list_generations().await.unwrap();
        assert_eq!(generations.into_iter().collect::<Vec<_>>(), vec![Generation::from("v0.4")]);
        assert_eq!(db.count_snapshots(&Generation::from("v0.4")).await.unwrap(), 2);
    }
}
