//! Generation-partitioned cache store abstraction.
//!
//! The proxy only talks to the cache through [`CacheStore`], which keeps the
//! SQLite backend swappable and lets failure paths be exercised in tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::connection::CacheDb;
use super::generations::Generation;
use super::hash::CacheKey;
use super::snapshots::ResponseSnapshot;
use crate::Error;
use crate::request::RequestDescriptor;

/// A persistent key to snapshot store partitioned by generation.
///
/// Implementations must serialize conflicting writes so that no partially
/// written snapshot is ever observable.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation's namespace if absent. Idempotent.
    async fn open_generation(&self, generation: &Generation) -> Result<(), Error>;

    /// Look up a snapshot; a miss is `Ok(None)`.
    async fn get(&self, generation: &Generation, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Upsert a snapshot. Last writer wins.
    async fn put(&self, generation: &Generation, key: &CacheKey, snapshot: &ResponseSnapshot) -> Result<(), Error>;

    async fn list_generations(&self) -> Result<BTreeSet<Generation>, Error>;

    /// Remove a generation and all of its entries. Unknown generations are a no-op.
    async fn delete_generation(&self, generation: &Generation) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open_generation(&self, generation: &Generation) -> Result<(), Error> {
        CacheDb::open_generation(self, generation).await
    }

    async fn get(&self, generation: &Generation, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.get_snapshot(generation, key).await
    }

    async fn put(&self, generation: &Generation, key: &CacheKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.put_snapshot(generation, key, snapshot).await
    }

    async fn list_generations(&self) -> Result<BTreeSet<Generation>, Error> {
        CacheDb::list_generations(self).await
    }

    async fn delete_generation(&self, generation: &Generation) -> Result<u64, Error> {
        CacheDb::delete_generation(self, generation).await
    }
}

/// A store bound to one generation.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
    generation: Generation,
}

impl CacheHandle {
    /// Open `generation` in `store`, creating its namespace if needed.
    pub async fn open(store: Arc<dyn CacheStore>, generation: Generation) -> Result<Self, Error> {
        store.open_generation(&generation).await?;
        Ok(Self { store, generation })
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub async fn get(&self, request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error> {
        self.store.get(&self.generation, &CacheKey::for_request(request)).await
    }

    pub async fn put(&self, request: &RequestDescriptor, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.store
            .put(&self.generation, &CacheKey::for_request(request), snapshot)
            .await
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle").field("generation", &self.generation).finish()
    }
}
