//! Client code for cachefront.
//!
//! This crate provides the origin fetch pipeline, request classification and
//! the revalidation engine that keeps the cache fresh.

pub mod classify;
pub mod fetch;
pub mod revalidate;

pub use classify::{PathCategory, classify, classify_path};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
pub use revalidate::RevalidationEngine;
