//! SQLite-backed response cache partitioned by generation.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Request identity keys using SHA-256 hashing
//! - Generation partitions that are created on open and dropped as a whole
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod snapshots;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::Generation;
pub use hash::CacheKey;
pub use snapshots::ResponseSnapshot;
pub use store::{CacheHandle, CacheStore};
