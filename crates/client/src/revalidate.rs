//! Network revalidation of cached responses.
//!
//! A revalidation fetches the request from the origin and, when the origin
//! answers `200 OK`, writes a snapshot of the response into the current
//! generation. The caller always receives its own copy of the response,
//! whether or not it was cached.

use std::sync::Arc;

use cachefront_core::{CacheHandle, CacheStore, Error, Generation, RequestDescriptor, ResponseSnapshot};

use crate::fetch::Fetcher;

/// Fetches requests and refreshes the cache with successful responses.
#[derive(Clone)]
pub struct RevalidationEngine {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
    generation: Generation,
}

impl RevalidationEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>, generation: Generation) -> Self {
        Self { fetcher, store, generation }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Create the current generation in the store if it does not exist yet.
    pub async fn open_generation(&self) -> Result<(), Error> {
        CacheHandle::open(self.store.clone(), self.generation.clone()).await?;
        Ok(())
    }

    /// Fetch `request` and cache the response if it is a shareable `200 OK`.
    ///
    /// Non-200 responses, and responses carrying per-client state such as
    /// `Set-Cookie`, are returned but never stored. A transport failure
    /// is returned as an error and nothing is written. Failing to store the
    /// snapshot is logged and does not affect the returned response.
    pub async fn revalidate(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let response = self.fetcher.fetch(request).await?;
        let snapshot = response.into_snapshot();

        if !snapshot.is_cacheable() {
            tracing::debug!(
                url = %request.url(),
                status = snapshot.status(),
                "not caching uncacheable response"
            );
            return Ok(snapshot);
        }

        if let Err(e) = self.store_snapshot(request, &snapshot).await {
            tracing::warn!(url = %request.url(), generation = %self.generation, error = %e, "failed to cache response");
        }

        Ok(snapshot)
    }

    async fn store_snapshot(&self, request: &RequestDescriptor, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let cache = CacheHandle::open(self.store.clone(), self.generation.clone()).await?;
        cache.put(request, snapshot).await?;
        tracing::debug!(url = %request.url(), generation = %self.generation, "cached response");
        Ok(())
    }
}
