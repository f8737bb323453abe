//! Cache key generation.

use sha2::{Digest, Sha256};

use crate::request::RequestDescriptor;

/// Compute the cache key for a request method and absolute URL.
///
/// The query string is part of the URL and therefore part of the key.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a request inside a generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: String,
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn for_request(request: &RequestDescriptor) -> Self {
        let method = request.method().as_str().to_string();
        let url = request.url().to_string();
        Self { hash: compute_cache_key(&method, &url), method, url }
    }
}
