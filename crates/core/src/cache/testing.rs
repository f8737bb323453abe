//! Store doubles for tests.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::generations::Generation;
use super::hash::CacheKey;
use super::snapshots::ResponseSnapshot;
use super::store::CacheStore;
use crate::Error;

/// A store whose every operation fails with a store error.
pub struct BrokenStore;

impl BrokenStore {
    fn fail<T>() -> Result<T, Error> {
        Err(Error::Serialization("disk full".into()))
    }
}

#[async_trait]
impl CacheStore for BrokenStore {
    async fn open_generation(&self, _generation: &Generation) -> Result<(), Error> {
        Self::fail()
    }

    async fn get(&self, _generation: &Generation, _key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        Self::fail()
    }

    async fn put(&self, _generation: &Generation, _key: &CacheKey, _snapshot: &ResponseSnapshot) -> Result<(), Error> {
        Self::fail()
    }

    async fn list_generations(&self) -> Result<BTreeSet<Generation>, Error> {
        Self::fail()
    }

    async fn delete_generation(&self, _generation: &Generation) -> Result<u64, Error> {
        Self::fail()
    }
}
