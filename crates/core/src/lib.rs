//! Core types and shared functionality for cachefront.
//!
//! This crate provides:
//! - Generation-partitioned response cache with SQLite backend
//! - Request descriptors shared by the fetch client and the proxy
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, CacheHandle, CacheKey, CacheStore, Generation, ResponseSnapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::RequestDescriptor;
